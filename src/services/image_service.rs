//! ImageService — stores uploaded image files and links them to art records.
//!
//! Uploads are streamed into a temporary file under the staging directory,
//! then renamed into the served upload directory once the owning record id
//! is known. Only complete, linked files ever appear under `/uploads`.
//! Linking is two sequential writes (insert metadata, set `imageId` on the
//! record) with no transaction around them: if the second fails the
//! metadata row stays behind without a record pointing at it.

use super::{
    art_service::{ArtError, ArtResult},
    document_store::{DocumentStore, NewImage},
};
use crate::models::{
    art::{Attributes, IMAGE_REF_FIELD},
    id::DocumentId,
    image::ImageMetadata,
};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use serde_json::Value;
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ImageService {
    store: Arc<dyn DocumentStore>,

    /// Directory stored files are renamed into and served from.
    upload_dir: PathBuf,

    /// Directory partial uploads are streamed into. Same filesystem as
    /// `upload_dir` so the final rename is atomic.
    staging_dir: PathBuf,
}

/// A fully received upload waiting to be linked to a record.
#[derive(Debug)]
pub struct StagedUpload {
    tmp_path: PathBuf,
    size: i64,
    original_name: Option<String>,
}

impl StagedUpload {
    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    /// Remove the temporary file. Best-effort.
    pub async fn discard(self) {
        if let Err(err) = fs::remove_file(&self.tmp_path).await {
            debug!("failed to remove staged upload {}: {}", self.tmp_path.display(), err);
        }
    }
}

impl ImageService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        upload_dir: impl Into<PathBuf>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            upload_dir: upload_dir.into(),
            staging_dir: staging_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Stream an upload body into a temporary file.
    ///
    /// The file is flushed and synced before returning; on any error the
    /// partial file is removed.
    pub async fn stage<S>(&self, original_name: Option<String>, stream: S) -> ArtResult<StagedUpload>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        fs::create_dir_all(&self.staging_dir).await?;
        let tmp_path = self.staging_dir.join(format!(".tmp-{}", Uuid::new_v4().simple()));
        let mut file = File::create(&tmp_path).await?;

        let mut size: i64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(ArtError::Io(err));
                }
            };
            size += chunk.len() as i64;
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ArtError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ArtError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ArtError::Io(err));
        }

        Ok(StagedUpload {
            tmp_path,
            size,
            original_name,
        })
    }

    /// Move a staged upload into place and link it to `owner`.
    ///
    /// Returns the metadata as constructed here, not re-read from the store.
    /// The owner is not checked for existence; linking to a missing record
    /// is a no-op on the record side.
    pub async fn store(&self, staged: StagedUpload, owner: DocumentId) -> ArtResult<ImageMetadata> {
        let filename = Uuid::new_v4().simple().to_string();
        let file_path = self.upload_dir.join(&filename);

        if let Err(err) = fs::create_dir_all(&self.upload_dir).await {
            staged.discard().await;
            return Err(ArtError::Io(err));
        }
        if let Err(err) = fs::rename(&staged.tmp_path, &file_path).await {
            staged.discard().await;
            return Err(ArtError::Io(err));
        }

        let new_image = NewImage {
            filename,
            size: staged.size,
            path: file_path.display().to_string(),
            upload_date: Utc::now(),
            art_id: owner,
        };

        let image_id = match self.store.insert_image(&new_image).await {
            Ok(id) => id,
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                return Err(ArtError::Store(err));
            }
        };

        let mut link = Attributes::new();
        link.insert(IMAGE_REF_FIELD.into(), Value::String(image_id.to_string()));
        let outcome = self.store.update_art(owner, &link).await?;
        if outcome.matched == 0 {
            warn!(art_id = %owner, %image_id, "image stored for an art record that does not exist");
        }

        info!(
            art_id = %owner,
            %image_id,
            size = new_image.size,
            original = staged.original_name.as_deref().unwrap_or(""),
            "stored image"
        );
        Ok(new_image.with_id(image_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{art_service::ArtService, sqlite_store::SqliteDocumentStore};
    use futures::stream;
    use serde_json::json;
    use tempfile::TempDir;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = io::Result<Bytes>> {
        stream::iter(
            parts
                .iter()
                .map(|part| Ok::<_, io::Error>(Bytes::from_static(*part)))
                .collect::<Vec<_>>(),
        )
    }

    async fn setup() -> (TempDir, ImageService, ArtService) {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::in_memory().await.unwrap());
        let images = ImageService::new(
            store.clone(),
            dir.path().join("uploads"),
            dir.path().join("staging"),
        );
        let art = ArtService::new(store, "http://img.test/uploads");
        (dir, images, art)
    }

    #[tokio::test]
    async fn stage_counts_bytes_across_chunks() {
        let (_dir, images, _) = setup().await;
        let staged = images
            .stage(Some("sunset.png".into()), chunks(&[b"abc", b"defg"]))
            .await
            .unwrap();
        assert_eq!(staged.size(), 7);
        assert_eq!(staged.original_name(), Some("sunset.png"));
        assert_eq!(fs::read(&staged.tmp_path).await.unwrap(), b"abcdefg");
    }

    #[tokio::test]
    async fn failed_stream_leaves_no_file_behind() {
        let (_dir, images, _) = setup().await;
        let failing = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(io::Error::other("client went away")),
        ]);
        let err = images.stage(None, failing).await.unwrap_err();
        assert!(matches!(err, ArtError::Io(_)));

        let mut entries = fs::read_dir(images.staging_dir()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn staged_uploads_stay_out_of_the_served_directory() {
        let (_dir, images, _) = setup().await;
        let staged = images.stage(None, chunks(&[b"partial"])).await.unwrap();

        assert!(staged.tmp_path.starts_with(images.staging_dir()));
        assert!(!images.upload_dir().exists());
        staged.discard().await;
    }

    #[tokio::test]
    async fn discard_removes_staged_file() {
        let (_dir, images, _) = setup().await;
        let staged = images.stage(None, chunks(&[b"x"])).await.unwrap();
        let tmp = staged.tmp_path.clone();
        staged.discard().await;
        assert!(!tmp.exists());
    }

    #[tokio::test]
    async fn store_writes_file_and_links_record() {
        let (_dir, images, art) = setup().await;
        let mut attrs = Attributes::new();
        attrs.insert("title".into(), json!("Sunset"));
        let owner = art.create(attrs).await.unwrap().inserted_id;

        let staged = images.stage(Some("sunset.png".into()), chunks(&[b"png!"])).await.unwrap();
        let metadata = images.store(staged, owner).await.unwrap();

        assert_eq!(metadata.art_id, owner);
        assert_eq!(metadata.size, 4);
        assert_eq!(metadata.filename.len(), 32);
        let on_disk = images.upload_dir().join(&metadata.filename);
        assert_eq!(metadata.path, on_disk.display().to_string());
        assert_eq!(fs::read(&on_disk).await.unwrap(), b"png!");
        let mut staging = fs::read_dir(images.staging_dir()).await.unwrap();
        assert!(staging.next_entry().await.unwrap().is_none());

        let joined = art.get_by_id(owner).await.unwrap();
        assert_eq!(
            joined.attributes.get(IMAGE_REF_FIELD),
            Some(&json!(metadata.id.to_string()))
        );
        assert_eq!(joined.image.len(), 1);
        let joined_meta = &joined.image[0].metadata;
        assert_eq!(joined_meta.id, metadata.id);
        assert_eq!(joined_meta.filename, metadata.filename);
        assert_eq!(joined_meta.path, metadata.path);
        assert_eq!(
            joined_meta.upload_date.timestamp_millis(),
            metadata.upload_date.timestamp_millis()
        );
        assert_eq!(
            joined.image[0].url,
            format!("http://img.test/uploads/{}", metadata.filename)
        );
    }

    #[tokio::test]
    async fn store_for_missing_record_still_succeeds() {
        let (_dir, images, art) = setup().await;
        let owner = DocumentId::generate();
        let staged = images.stage(None, chunks(&[b"data"])).await.unwrap();

        let metadata = images.store(staged, owner).await.unwrap();
        assert_eq!(metadata.art_id, owner);
        assert!(matches!(
            art.get_by_id(owner).await.unwrap_err(),
            ArtError::NotFound(_)
        ));
    }
}
