//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the database and the staging directory

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Liveness probe. Always 200, never touches I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Pings the document store.
/// 2. Writes, reads back and removes a probe file in the staging directory,
///    which is never served.
///
/// HTTP 200 when both checks pass, HTTP 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let database_check = match state.store.ping().await {
        Ok(()) => CheckStatus::ok(),
        Err(e) => CheckStatus::failed(format!("error: {}", e)),
    };

    let tmp_path = state
        .images
        .staging_dir()
        .join(format!(".readyz-{}", Uuid::new_v4().simple()));
    let disk_check = match fs::write(&tmp_path, b"readyz").await {
        Ok(_) => match fs::read(&tmp_path).await {
            Ok(bytes) => {
                let _ = fs::remove_file(&tmp_path).await;
                if bytes == b"readyz" {
                    CheckStatus::ok()
                } else {
                    CheckStatus::failed("file content mismatch".into())
                }
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp_path).await;
                CheckStatus::failed(format!("could not read tmp file: {}", e))
            }
        },
        Err(e) => CheckStatus::failed(format!("could not write tmp file: {}", e)),
    };

    let overall_ok = database_check.ok && disk_check.ok;

    let mut checks = BTreeMap::new();
    checks.insert("database", database_check);
    checks.insert("disk", disk_check);

    let body = ReadyResponse {
        status: (if overall_ok { "ok" } else { "error" }).into(),
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            ok: false,
            error: Some(error),
        }
    }
}
