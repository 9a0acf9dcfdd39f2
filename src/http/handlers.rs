//! HTTP error type and operational endpoints

use axum::{
    extract::multipart::MultipartError,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::state::AppState;

/// HTTP error type. Bodies are plain text.
#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    InternalError(String),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            HttpError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            HttpError::BadRequest(msg)
            | HttpError::NotFound(msg)
            | HttpError::PayloadTooLarge(msg)
            | HttpError::InternalError(msg) => msg,
        };

        (status, body).into_response()
    }
}

impl From<MultipartError> for HttpError {
    fn from(err: MultipartError) -> Self {
        let text = err.body_text();
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            HttpError::PayloadTooLarge(text)
        } else {
            HttpError::BadRequest(text)
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("audio-extract-server v", env!("CARGO_PKG_VERSION"))
}

/// Debug endpoint - artifact store statistics
pub async fn artifact_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let stats = state.store.stats().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read artifact directories");
        HttpError::InternalError("Failed to read artifact directories.".to_string())
    })?;

    Ok(Json(serde_json::json!({
        "uptime_secs": state.uptime_secs(),
        "pending_uploads": stats.pending_uploads,
        "stored_outputs": stats.stored_outputs,
        "active_downloads": stats.active_downloads,
        "oldest_output_age_secs": stats.oldest_output_age_secs,
        "artifact_ttl_secs": state.config.storage.artifact_ttl_secs,
    })))
}
