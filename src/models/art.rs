//! Art records and the shapes returned when they are read back.

use super::{id::DocumentId, image::ImageMetadata};
use serde::Serialize;
use serde_json::{Map, Value};

/// Open, insertion-ordered attribute set of an art record.
pub type Attributes = Map<String, Value>;

/// Identity field in every rendered document. Never stored inside `doc`.
pub const ID_FIELD: &str = "_id";

/// Attribute holding the id of the record's image metadata, once linked.
pub const IMAGE_REF_FIELD: &str = "imageId";

/// Field the joined image list is rendered under. Shadows any stored
/// attribute of the same name.
pub const JOINED_IMAGE_FIELD: &str = "image";

/// An art record as stored: identity plus whatever the client sent.
#[derive(Clone, Debug, PartialEq)]
pub struct ArtRecord {
    pub id: DocumentId,
    pub attributes: Attributes,
}

/// An art record left-outer-joined with its image metadata.
///
/// `image` holds zero or one element; it stays a list so clients see the
/// same shape whether or not an image is linked.
#[derive(Serialize, Clone, Debug)]
pub struct JoinedArt {
    #[serde(rename = "_id")]
    pub id: DocumentId,

    #[serde(flatten)]
    pub attributes: Attributes,

    pub image: Vec<JoinedImage>,
}

/// Image metadata decorated with its public URL.
#[derive(Serialize, Clone, Debug)]
pub struct JoinedImage {
    #[serde(flatten)]
    pub metadata: ImageMetadata,

    pub url: String,
}

/// Acknowledgement returned by `POST /art`.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResult {
    pub acknowledged: bool,
    pub inserted_id: DocumentId,
}

/// Acknowledgement returned by `PATCH /art/{id}`.
///
/// Upserts are never performed; the upsert fields are kept for clients that
/// read them.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<DocumentId>,
    pub upserted_count: u64,
}

impl UpdateResult {
    pub fn new(matched_count: u64, modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_id: None,
            upserted_count: 0,
        }
    }
}

/// Drop keys the server owns. Clients cannot choose a record's identity.
pub fn strip_reserved(mut attributes: Attributes) -> Attributes {
    attributes.shift_remove(ID_FIELD);
    attributes
}
