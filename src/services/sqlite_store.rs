//! SQLite-backed [`DocumentStore`].
//!
//! Art records are kept as JSON text in `art.doc`; the join against `images`
//! follows `json_extract(doc, '$.imageId')`. Image metadata is a plain row.

use super::document_store::{
    DocumentStore, JoinedRecord, NewImage, StoreError, StoreResult, UpdateOutcome,
};
use crate::models::{
    art::{ArtRecord, Attributes},
    id::DocumentId,
    image::ImageMetadata,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    FromRow, QueryBuilder, SqlitePool,
    sqlite::{Sqlite, SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, time::Duration};
use tracing::debug;

const INIT_MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

/// One row of the art/images left join.
#[derive(FromRow)]
struct JoinedRow {
    id: String,
    doc: String,
    image_id: Option<String>,
    filename: Option<String>,
    size: Option<i64>,
    path: Option<String>,
    upload_date: Option<DateTime<Utc>>,
    art_id: Option<String>,
}

impl SqliteDocumentStore {
    /// Open (creating if missing) the database at `database_url`.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// A private in-memory database with the schema already applied.
    ///
    /// Limited to one connection: every new SQLite memory connection is a
    /// separate, empty database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply the embedded schema. Safe to run repeatedly.
    pub async fn migrate(&self) -> StoreResult<()> {
        let statements = INIT_MIGRATION
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        debug!("running {} migration statements", statements.len());
        for stmt in statements {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn parse_doc(id: &str, doc: &str) -> StoreResult<Attributes> {
    serde_json::from_str(doc).map_err(|err| StoreError::Corrupt {
        id: id.to_string(),
        reason: err.to_string(),
    })
}

fn parse_id(raw: String) -> StoreResult<DocumentId> {
    DocumentId::parse(&raw).map_err(|err| StoreError::Corrupt {
        id: raw.clone(),
        reason: err.to_string(),
    })
}

impl JoinedRow {
    fn image(&mut self) -> StoreResult<Option<ImageMetadata>> {
        let Some(image_id) = self.image_id.take() else {
            return Ok(None);
        };
        let (Some(filename), Some(size), Some(path), Some(upload_date), Some(art_id)) = (
            self.filename.take(),
            self.size,
            self.path.take(),
            self.upload_date,
            self.art_id.take(),
        ) else {
            return Err(StoreError::Corrupt {
                id: image_id,
                reason: "image row has missing columns".into(),
            });
        };

        Ok(Some(ImageMetadata {
            id: parse_id(image_id)?,
            filename,
            size,
            path,
            upload_date,
            art_id: parse_id(art_id)?,
        }))
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert_art(&self, attributes: &Attributes) -> StoreResult<DocumentId> {
        let id = DocumentId::generate();
        sqlx::query("INSERT INTO art (id, doc) VALUES (?, ?)")
            .bind(id.to_string())
            .bind(serde_json::to_string(attributes)?)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn find_art(&self, id: Option<DocumentId>) -> StoreResult<Vec<JoinedRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT a.id, a.doc, i.id AS image_id, i.filename, i.size, i.path, \
             i.upload_date, i.art_id \
             FROM art a \
             LEFT JOIN images i ON i.id = json_extract(a.doc, '$.imageId')",
        );
        if let Some(id) = id {
            builder.push(" WHERE a.id = ");
            builder.push_bind(id.to_string());
        }
        builder.push(" ORDER BY a.rowid ASC, i.rowid ASC");

        let rows: Vec<JoinedRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        let mut records: Vec<JoinedRecord> = Vec::new();
        for mut row in rows {
            let image = row.image()?;
            let same_record = records
                .last()
                .is_some_and(|last| last.record.id.to_string() == row.id);
            if !same_record {
                let attributes = parse_doc(&row.id, &row.doc)?;
                records.push(JoinedRecord {
                    record: ArtRecord {
                        id: parse_id(row.id)?,
                        attributes,
                    },
                    images: Vec::new(),
                });
            }
            if let (Some(image), Some(current)) = (image, records.last_mut()) {
                current.images.push(image);
            }
        }
        Ok(records)
    }

    async fn update_art(&self, id: DocumentId, partial: &Attributes) -> StoreResult<UpdateOutcome> {
        let key = id.to_string();
        // Take the write lock up front. A deferred transaction that reads
        // first cannot wait out a concurrent writer when it upgrades.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let doc: Option<String> = sqlx::query_scalar("SELECT doc FROM art WHERE id = ?")
            .bind(&key)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(doc) = doc else {
            return Ok(UpdateOutcome::default());
        };

        let mut current = parse_doc(&key, &doc)?;
        let mut modified = false;
        for (field, value) in partial {
            if current.get(field) != Some(value) {
                current.insert(field.clone(), value.clone());
                modified = true;
            }
        }

        if modified {
            sqlx::query("UPDATE art SET doc = ? WHERE id = ?")
                .bind(serde_json::to_string(&current)?)
                .bind(&key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(modified),
        })
    }

    async fn delete_art(&self, id: DocumentId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM art WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_image(&self, image: &NewImage) -> StoreResult<DocumentId> {
        let id = DocumentId::generate();
        sqlx::query(
            "INSERT INTO images (id, filename, size, path, upload_date, art_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&image.filename)
        .bind(image.size)
        .bind(&image.path)
        .bind(image.upload_date)
        .bind(image.art_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn delete_images_for_art(&self, art_id: DocumentId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM images WHERE art_id = ?")
            .bind(art_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
