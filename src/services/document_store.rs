//! The document database seam.
//!
//! Every method is one round trip to the database. Callers sequence them;
//! nothing here spans more than one operation, so a failure between two
//! calls leaves the first one applied.

use crate::models::{
    art::{ArtRecord, Attributes},
    id::DocumentId,
    image::ImageMetadata,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored document `{id}` is corrupt: {reason}")]
    Corrupt { id: String, reason: String },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// An art record together with the image metadata its `imageId` resolves to.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinedRecord {
    pub record: ArtRecord,
    pub images: Vec<ImageMetadata>,
}

/// Image metadata before the database has assigned it an id.
#[derive(Clone, Debug)]
pub struct NewImage {
    pub filename: String,
    pub size: i64,
    pub path: String,
    pub upload_date: DateTime<Utc>,
    pub art_id: DocumentId,
}

impl NewImage {
    pub fn with_id(self, id: DocumentId) -> ImageMetadata {
        ImageMetadata {
            id,
            filename: self.filename,
            size: self.size,
            path: self.path,
            upload_date: self.upload_date,
            art_id: self.art_id,
        }
    }
}

/// Counts reported by a top-level merge into an art record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// Persistence for the `art` and `images` collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new art record and return its assigned id.
    async fn insert_art(&self, attributes: &Attributes) -> StoreResult<DocumentId>;

    /// Read art records left-outer-joined with their image metadata, in
    /// insertion order. `None` reads the whole collection.
    async fn find_art(&self, id: Option<DocumentId>) -> StoreResult<Vec<JoinedRecord>>;

    /// Set each top-level key of `partial` on the record, leaving other
    /// keys untouched. Applied atomically.
    async fn update_art(&self, id: DocumentId, partial: &Attributes) -> StoreResult<UpdateOutcome>;

    /// Remove an art record. Returns the number of records deleted.
    async fn delete_art(&self, id: DocumentId) -> StoreResult<u64>;

    /// Insert image metadata and return its assigned id.
    async fn insert_image(&self, image: &NewImage) -> StoreResult<DocumentId>;

    /// Remove every image owned by `art_id`. Returns the number removed.
    async fn delete_images_for_art(&self, art_id: DocumentId) -> StoreResult<u64>;

    /// Cheap connectivity check.
    async fn ping(&self) -> StoreResult<()>;
}
