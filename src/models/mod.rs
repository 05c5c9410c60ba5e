//! Core data models for the art catalogue.
//!
//! Art records are schema-less JSON documents; image metadata is a fixed
//! record pointing back at its owning art record. Both serialize with the
//! field names the frontend already consumes (`_id`, `imageId`, `artId`, ...).

pub mod art;
pub mod id;
pub mod image;
