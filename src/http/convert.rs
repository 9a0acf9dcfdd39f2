//! Upload-and-convert handler
//!
//! POST /convert with multipart fields `video` (file) and `format` (text).

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use super::handlers::HttpError;
use crate::state::AppState;
use crate::store::ScratchFile;
use crate::transcode::AudioFormat;

/// Multipart field carrying the video file
pub const VIDEO_FIELD: &str = "video";

/// Multipart field carrying the requested output format
pub const FORMAT_FIELD: &str = "format";

/// Upload a video and convert its audio track.
///
/// Responds with the file name to pass to `/download/{filename}`.
#[tracing::instrument(skip(state, multipart))]
pub async fn convert(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<String, HttpError> {
    let mut upload: Option<ScratchFile> = None;
    let mut requested: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = %e, "Malformed multipart body");
        HttpError::from(e)
    })? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(VIDEO_FIELD) => {
                if upload.is_some() {
                    return Err(HttpError::BadRequest(
                        "Only one video file may be uploaded.".to_string(),
                    ));
                }
                let original = field.file_name().unwrap_or("unknown").to_string();
                let scratch = state.store.new_upload();
                let size = save_field(field, scratch.path()).await?;
                tracing::info!(
                    original = %original,
                    upload = %scratch.file_name(),
                    bytes = size,
                    "Video uploaded"
                );
                upload = Some(scratch);
            }
            Some(FORMAT_FIELD) => {
                requested = Some(field.text().await?);
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unexpected multipart field");
            }
        }
    }

    let Some(upload) = upload else {
        tracing::warn!("Convert request without a video file");
        return Err(HttpError::BadRequest("No video file provided.".to_string()));
    };

    let format = resolve_format(requested.as_deref(), state.default_format)?;

    match state.pipeline.convert(&state.store, upload, format).await {
        Ok(file_name) => {
            tracing::info!(file = %file_name, format = %format, "Conversion finished");
            Ok(file_name)
        }
        Err(e) => {
            tracing::error!(error = %e, format = %format, "Conversion error");
            Err(HttpError::InternalError("Conversion failed.".to_string()))
        }
    }
}

/// Pick the output format; an absent or blank field means the default.
fn resolve_format(
    requested: Option<&str>,
    default: AudioFormat,
) -> Result<AudioFormat, HttpError> {
    match requested.map(str::trim).filter(|f| !f.is_empty()) {
        None => Ok(default),
        Some(name) => AudioFormat::parse(name).ok_or_else(|| {
            tracing::warn!(format = %name, "Unsupported output format requested");
            HttpError::BadRequest(format!("Unsupported format: {}", name))
        }),
    }
}

/// Stream a multipart field to disk chunk by chunk
async fn save_field(mut field: Field<'_>, path: &Path) -> Result<u64, HttpError> {
    let write_failed = |e: std::io::Error| {
        tracing::error!(path = %path.display(), error = %e, "Failed to store upload");
        HttpError::InternalError("Failed to store upload.".to_string())
    };

    let mut file = tokio::fs::File::create(path).await.map_err(write_failed)?;
    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await.map_err(write_failed)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(write_failed)?;

    Ok(written)
}
