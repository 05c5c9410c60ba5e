//! Services behind the HTTP handlers.
//!
//! `ArtService` and `ImageService` hold the catalogue logic and share one
//! injected [`document_store::DocumentStore`].

pub mod art_service;
pub mod document_store;
pub mod image_service;
pub mod sqlite_store;
