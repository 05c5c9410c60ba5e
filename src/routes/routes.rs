//! Defines routes for the art catalogue.
//!
//! ## Structure
//! - **Art records**
//!   - `GET    /art`        — list records with joined images
//!   - `POST   /art`        — create a record
//!   - `GET    /art/{id}`   — one record with its joined image
//!   - `PATCH  /art/{id}`   — merge top-level fields into a record
//!   - `DELETE /art/{id}`   — delete a record and its image metadata
//!
//! - **Images**
//!   - `POST   /art/upload` — multipart upload linked to a record
//!   - `GET    /uploads/*`  — uploaded files, served as-is
//!
//! - **Probes**: `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        art_handlers::{create_art, delete_art, get_art, list_art, update_art, upload_image},
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// URL prefix uploaded files are served under.
pub const UPLOADS_PREFIX: &str = "/uploads";

/// HTTP-level knobs applied around the routes.
#[derive(Clone, Debug)]
pub struct HttpOptions {
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,

    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Build the API routes. The router carries `AppState` to every handler.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/art", get(list_art).post(create_art))
        .route("/art/upload", post(upload_image))
        .route(
            "/art/{id}",
            get(get_art).patch(update_art).delete(delete_art),
        )
}

/// The complete application: API routes, static uploads and middleware.
pub fn app(state: AppState, options: &HttpOptions) -> Router {
    let uploads = ServeDir::new(state.images.upload_dir());

    routes()
        .nest_service(UPLOADS_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .layer(cors_layer(&options.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("ignoring invalid CORS origin `{}`: {}", origin, err);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}
