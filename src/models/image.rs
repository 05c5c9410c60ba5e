//! Metadata describing one uploaded image file.

use super::id::DocumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored upload and the art record it belongs to.
///
/// Created only by an upload; the file bytes live on disk at `path`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageMetadata {
    #[serde(rename = "_id")]
    pub id: DocumentId,

    /// Generated name of the stored file (no extension).
    pub filename: String,

    /// Size in bytes.
    pub size: i64,

    /// Location of the file on disk, relative to the working directory when
    /// the upload directory is relative.
    pub path: String,

    #[serde(rename = "uploadDate")]
    pub upload_date: DateTime<Utc>,

    /// Owning art record. Set once at upload, never re-validated.
    #[serde(rename = "artId")]
    pub art_id: DocumentId,
}
