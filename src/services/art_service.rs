//! ArtService — create, read, update and delete art records.
//!
//! Reads join each record with its image metadata and attach a public URL
//! built from the configured base URL. Deletes cascade to the record's
//! images on a best-effort basis.

use super::document_store::{DocumentStore, JoinedRecord, StoreError};
use crate::models::{
    art::{
        Attributes, ID_FIELD, InsertOneResult, JOINED_IMAGE_FIELD, JoinedArt, JoinedImage,
        UpdateResult, strip_reserved,
    },
    id::{DocumentId, InvalidIdentifier},
    image::ImageMetadata,
};
use std::{io, sync::Arc};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ArtError {
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),
    #[error("no file was uploaded")]
    MissingFile,
    #[error("document `{0}` not found")]
    NotFound(DocumentId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ArtResult<T> = Result<T, ArtError>;

#[derive(Clone)]
pub struct ArtService {
    store: Arc<dyn DocumentStore>,
    base_url: Arc<str>,
}

/// Public URL of the first joined image: `base_url + "/" + filename`.
///
/// With no image the filename segment is empty, leaving a trailing `/`.
pub fn image_url(base_url: &str, first: Option<&ImageMetadata>) -> String {
    let filename = first.map(|image| image.filename.as_str()).unwrap_or_default();
    format!("{base_url}/{filename}")
}

impl ArtService {
    pub fn new(store: Arc<dyn DocumentStore>, base_url: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Insert `attributes` as a new record. Any client `_id` is discarded.
    pub async fn create(&self, attributes: Attributes) -> ArtResult<InsertOneResult> {
        let attributes = strip_reserved(attributes);
        let inserted_id = self.store.insert_art(&attributes).await?;
        debug!(%inserted_id, fields = attributes.len(), "created art record");
        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id,
        })
    }

    /// Every record with its joined image, in collection order.
    pub async fn get_all(&self) -> ArtResult<Vec<JoinedArt>> {
        let records = self.store.find_art(None).await?;
        Ok(records
            .into_iter()
            .map(|joined| self.render(joined))
            .collect())
    }

    pub async fn get_by_id(&self, id: DocumentId) -> ArtResult<JoinedArt> {
        self.store
            .find_art(Some(id))
            .await?
            .into_iter()
            .next()
            .map(|joined| self.render(joined))
            .ok_or(ArtError::NotFound(id))
    }

    /// Shallow-merge `partial` into the record.
    ///
    /// `imageId` may be overwritten like any other key; it is not checked
    /// against the images collection.
    pub async fn update(&self, id: DocumentId, partial: Attributes) -> ArtResult<UpdateResult> {
        let partial = strip_reserved(partial);
        let outcome = self.store.update_art(id, &partial).await?;
        if outcome.matched == 0 {
            return Err(ArtError::NotFound(id));
        }
        Ok(UpdateResult::new(outcome.matched, outcome.modified))
    }

    /// Delete the record, then its images.
    ///
    /// The image cleanup is not transactional with the record delete and its
    /// failure is only logged: the record is gone either way.
    pub async fn delete(&self, id: DocumentId) -> ArtResult<()> {
        if self.store.delete_art(id).await? == 0 {
            return Err(ArtError::NotFound(id));
        }

        match self.store.delete_images_for_art(id).await {
            Ok(removed) => debug!(art_id = %id, removed, "removed image metadata"),
            Err(err) => warn!(art_id = %id, error = %err, "failed to remove image metadata"),
        }
        Ok(())
    }

    fn render(&self, joined: JoinedRecord) -> JoinedArt {
        let JoinedRecord { record, images } = joined;
        let url = image_url(&self.base_url, images.first());

        let mut attributes = record.attributes;
        attributes.shift_remove(ID_FIELD);
        attributes.shift_remove(JOINED_IMAGE_FIELD);

        JoinedArt {
            id: record.id,
            attributes,
            image: images
                .into_iter()
                .map(|metadata| JoinedImage {
                    metadata,
                    url: url.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        document_store::NewImage, sqlite_store::SqliteDocumentStore,
    };
    use chrono::Utc;
    use serde_json::{Value, json};

    const BASE: &str = "http://localhost:3000/uploads";

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    async fn setup() -> (ArtService, Arc<SqliteDocumentStore>) {
        let store = Arc::new(SqliteDocumentStore::in_memory().await.unwrap());
        (ArtService::new(store.clone(), BASE), store)
    }

    async fn attach_image(store: &SqliteDocumentStore, art: DocumentId, filename: &str) -> DocumentId {
        let image_id = store
            .insert_image(&NewImage {
                filename: filename.into(),
                size: 3,
                path: format!("uploads/{filename}"),
                upload_date: Utc::now(),
                art_id: art,
            })
            .await
            .unwrap();
        store
            .update_art(art, &attrs(json!({"imageId": image_id.to_string()})))
            .await
            .unwrap();
        image_id
    }

    #[test]
    fn image_url_concatenates_with_separator() {
        let image = ImageMetadata {
            id: DocumentId::generate(),
            filename: "f00d".into(),
            size: 1,
            path: "uploads/f00d".into(),
            upload_date: Utc::now(),
            art_id: DocumentId::generate(),
        };
        assert_eq!(image_url(BASE, Some(&image)), format!("{BASE}/f00d"));
        assert_eq!(image_url(BASE, None), format!("{BASE}/"));
    }

    #[tokio::test]
    async fn created_record_reads_back_without_image() {
        let (service, _) = setup().await;
        let created = service
            .create(attrs(json!({"title": "Sunset", "_id": "client-chosen"})))
            .await
            .unwrap();
        assert!(created.acknowledged);

        let joined = service.get_by_id(created.inserted_id).await.unwrap();
        assert_eq!(joined.id, created.inserted_id);
        assert_eq!(joined.attributes, attrs(json!({"title": "Sunset"})));
        assert!(joined.image.is_empty());

        let listed = service.get_all().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].image.is_empty());
        assert_eq!(
            serde_json::to_value(&listed[0]).unwrap(),
            serde_json::to_value(&joined).unwrap()
        );
    }

    #[tokio::test]
    async fn joined_image_carries_synthesized_url() {
        let (service, store) = setup().await;
        let art = service.create(attrs(json!({"title": "Dusk"}))).await.unwrap().inserted_id;
        let image_id = attach_image(&store, art, "deadbeef").await;

        let joined = service.get_by_id(art).await.unwrap();
        assert_eq!(joined.image.len(), 1);
        assert_eq!(joined.image[0].metadata.id, image_id);
        assert_eq!(joined.image[0].url, format!("{BASE}/deadbeef"));

        let body = serde_json::to_value(&joined).unwrap();
        assert_eq!(body["_id"], json!(art.to_string()));
        assert_eq!(body["imageId"], json!(image_id.to_string()));
        assert_eq!(body["image"][0]["artId"], json!(art.to_string()));
        assert_eq!(body["image"][0]["url"], json!(format!("{BASE}/deadbeef")));
    }

    #[tokio::test]
    async fn stored_image_attribute_is_shadowed_by_join() {
        let (service, _) = setup().await;
        let art = service
            .create(attrs(json!({"image": "not-a-list"})))
            .await
            .unwrap()
            .inserted_id;

        let body = serde_json::to_value(service.get_by_id(art).await.unwrap()).unwrap();
        assert_eq!(body["image"], json!([]));
    }

    #[tokio::test]
    async fn get_missing_record_is_not_found() {
        let (service, _) = setup().await;
        let err = service.get_by_id(DocumentId::generate()).await.unwrap_err();
        assert!(matches!(err, ArtError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_semantics() {
        let (service, _) = setup().await;
        let art = service.create(attrs(json!({"title": "A"}))).await.unwrap().inserted_id;

        let changed = service.update(art, attrs(json!({"year": 2001}))).await.unwrap();
        assert_eq!(changed, UpdateResult::new(1, 1));

        let unchanged = service.update(art, Attributes::new()).await.unwrap();
        assert_eq!(unchanged, UpdateResult::new(1, 0));

        let joined = service.get_by_id(art).await.unwrap();
        assert_eq!(joined.attributes, attrs(json!({"title": "A", "year": 2001})));

        let err = service
            .update(DocumentId::generate(), attrs(json!({"title": "B"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ArtError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_cascades_to_images() {
        let (service, store) = setup().await;
        let art = service.create(attrs(json!({"title": "A"}))).await.unwrap().inserted_id;
        attach_image(&store, art, "cafe").await;

        service.delete(art).await.unwrap();

        assert!(matches!(
            service.get_by_id(art).await.unwrap_err(),
            ArtError::NotFound(_)
        ));
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        assert!(matches!(
            service.delete(art).await.unwrap_err(),
            ArtError::NotFound(_)
        ));
    }
}
