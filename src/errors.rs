use crate::services::art_service::ArtError;
use axum::{
    Json,
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Message for a malformed id in a URL path.
pub const INVALID_ID: &str = "Invalid ID format";

/// Message when a path id matches no record.
pub const NOT_FOUND: &str = "Document not found";

/// Message for a create/update body that is not a JSON object.
pub const INVALID_BODY: &str = "Request body must be a JSON object";

/// Message for an upload body that cannot be read as a multipart form.
pub const INVALID_MULTIPART: &str = "Invalid multipart data";

/// An HTTP error carrying a status and a single human-readable message.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Map a service failure onto the endpoint's fixed responses.
    ///
    /// Server-side failures are logged and reported to the client only as
    /// `failure`.
    pub fn from_service(err: ArtError, failure: &str) -> Self {
        match err {
            ArtError::InvalidIdentifier(_) => Self::bad_request(INVALID_ID),
            ArtError::MissingFile => Self::bad_request("No file uploaded"),
            ArtError::NotFound(_) => Self::not_found(NOT_FOUND),
            ArtError::Store(_) | ArtError::Io(_) => {
                tracing::error!(error = %err, "{failure}");
                Self::internal(failure)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejecting request body: {}", rejection.body_text());
        Self::bad_request(INVALID_BODY)
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::debug!("rejecting upload body: {}", rejection.body_text());
        Self::bad_request(INVALID_MULTIPART)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));

        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::id::DocumentId;
    use std::io;

    #[test]
    fn service_errors_map_to_fixed_statuses() {
        let bad = AppError::from_service(DocumentId::parse("x").unwrap_err().into(), "boom");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, INVALID_ID);

        let missing = AppError::from_service(ArtError::NotFound(DocumentId::generate()), "boom");
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.message, NOT_FOUND);

        let no_file = AppError::from_service(ArtError::MissingFile, "boom");
        assert_eq!(no_file.status, StatusCode::BAD_REQUEST);

        let io = AppError::from_service(ArtError::Io(io::Error::other("disk full")), "boom");
        assert_eq!(io.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(io.message, "boom");
    }
}
