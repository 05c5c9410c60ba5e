//! HTTP handlers for art records and their images.
//!
//! Path ids are validated here, before any service call. Every failure is
//! turned into a fixed status and a `{"error": ...}` body.

use crate::{
    errors::{AppError, INVALID_ID, INVALID_MULTIPART},
    models::{
        art::{Attributes, InsertOneResult, JoinedArt, UpdateResult},
        id::DocumentId,
        image::ImageMetadata,
    },
    services::{
        art_service::ArtError,
        image_service::{ImageService, StagedUpload},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::StatusCode,
};
use futures::StreamExt;
use serde::Serialize;
use std::io;

const UPLOAD_FAILED: &str = "Could not upload the image metadata to the database";
const LIST_FAILED: &str = "Could not fetch the documents";
const GET_FAILED: &str = "Could not fetch the document";
const CREATE_FAILED: &str = "Could not create a new document";
const UPDATE_FAILED: &str = "Could not update the document";
const DELETE_FAILED: &str = "Could not delete the document";

/// Body of a successful `POST /art/upload`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: &'static str,
    pub image_metadata: ImageMetadata,
}

/// Body of a successful `DELETE /art/{id}`.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Fields collected from the upload form.
#[derive(Default)]
struct UploadForm {
    file: Option<StagedUpload>,
    art_id: Option<String>,
}

impl UploadForm {
    async fn discard(self) {
        if let Some(staged) = self.file {
            staged.discard().await;
        }
    }
}

fn parse_path_id(raw: &str) -> Result<DocumentId, AppError> {
    DocumentId::parse(raw).map_err(|_| AppError::bad_request(INVALID_ID))
}

/// Read the multipart body, streaming the first `file` part to disk.
///
/// A `file` part without a filename is not a file upload and is ignored.
async fn read_upload_form(
    images: &ImageService,
    multipart: &mut Multipart,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                tracing::debug!("rejecting malformed multipart body: {}", err);
                form.discard().await;
                return Err(AppError::bad_request(INVALID_MULTIPART));
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") if form.file.is_none() && field.file_name().is_some() => {
                let original = field.file_name().map(str::to_string);
                let stream = field.map(|chunk| chunk.map_err(io::Error::other));
                match images.stage(original, stream).await {
                    Ok(staged) => form.file = Some(staged),
                    Err(err) => {
                        form.discard().await;
                        return Err(AppError::from_service(err, UPLOAD_FAILED));
                    }
                }
            }
            Some("artId") if form.art_id.is_none() => match field.text().await {
                Ok(text) => form.art_id = Some(text),
                Err(err) => {
                    tracing::debug!("could not read artId field: {}", err);
                    form.discard().await;
                    return Err(AppError::bad_request(INVALID_MULTIPART));
                }
            },
            _ => {}
        }
    }

    Ok(form)
}

/// `POST /art/upload` — store an image and link it to an art record.
///
/// Form fields: `file` (binary) and `artId`.
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut multipart = multipart?;
    let form = read_upload_form(&state.images, &mut multipart).await?;

    let Some(staged) = form.file else {
        return Err(AppError::from_service(ArtError::MissingFile, UPLOAD_FAILED));
    };

    let art_id = match form.art_id.as_deref().map(DocumentId::parse) {
        Some(Ok(id)) => id,
        _ => {
            staged.discard().await;
            return Err(AppError::bad_request("Invalid art ID format"));
        }
    };

    let image_metadata = state
        .images
        .store(staged, art_id)
        .await
        .map_err(|err| AppError::from_service(err, UPLOAD_FAILED))?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Uploaded and linked successfully",
            image_metadata,
        }),
    ))
}

/// `GET /art` — every record with its joined image.
pub async fn list_art(State(state): State<AppState>) -> Result<Json<Vec<JoinedArt>>, AppError> {
    let records = state
        .art
        .get_all()
        .await
        .map_err(|err| AppError::from_service(err, LIST_FAILED))?;
    Ok(Json(records))
}

/// `GET /art/{id}`
pub async fn get_art(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JoinedArt>, AppError> {
    let id = parse_path_id(&id)?;
    let record = state
        .art
        .get_by_id(id)
        .await
        .map_err(|err| AppError::from_service(err, GET_FAILED))?;
    Ok(Json(record))
}

/// `POST /art` — insert the body verbatim as a new record.
pub async fn create_art(
    State(state): State<AppState>,
    body: Result<Json<Attributes>, JsonRejection>,
) -> Result<(StatusCode, Json<InsertOneResult>), AppError> {
    let Json(attributes) = body?;
    let result = state
        .art
        .create(attributes)
        .await
        .map_err(|err| AppError::from_service(err, CREATE_FAILED))?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// `PATCH /art/{id}` — set the body's top-level keys on the record.
pub async fn update_art(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Attributes>, JsonRejection>,
) -> Result<Json<UpdateResult>, AppError> {
    let id = parse_path_id(&id)?;
    let Json(partial) = body?;
    let result = state
        .art
        .update(id, partial)
        .await
        .map_err(|err| AppError::from_service(err, UPDATE_FAILED))?;
    Ok(Json(result))
}

/// `DELETE /art/{id}` — remove the record and, best-effort, its images.
pub async fn delete_art(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_path_id(&id)?;
    state
        .art
        .delete(id)
        .await
        .map_err(|err| AppError::from_service(err, DELETE_FAILED))?;
    Ok(Json(MessageResponse {
        message: "Document deleted",
    }))
}
