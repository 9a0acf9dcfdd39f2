//! Download-and-cleanup handler
//!
//! GET /download/{filename} streams a produced artifact once. The file is
//! deleted as soon as its last byte has been read; if reading fails or the
//! client goes away first, the file stays for another attempt.
//!
//! The response carries `Content-Length`, so hyper stops polling the body
//! once that many bytes went out and never sees end of stream.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::Stream;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use super::handlers::HttpError;
use crate::state::AppState;
use crate::store::{remove_file_logged, DownloadClaim};

fn not_found() -> HttpError {
    HttpError::NotFound("File not found.".to_string())
}

fn download_failed() -> HttpError {
    HttpError::InternalError("Download failed.".to_string())
}

/// Stream an artifact as an attachment, then delete it.
#[tracing::instrument(skip(state))]
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> Result<Response, HttpError> {
    let artifact = state
        .store
        .resolve(&file_name)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Download error");
            download_failed()
        })?
        .ok_or_else(not_found)?;

    // A concurrent download holds the artifact; it is gone once that finishes.
    let claim = state.store.claim(&artifact.file_name).ok_or_else(not_found)?;

    let file = match File::open(&artifact.path).await {
        Ok(file) => file,
        // Deleted by a download that finished after `resolve`
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            tracing::error!(error = %e, "Download error");
            return Err(download_failed());
        }
    };

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        artifact.file_name
    ))
    .map_err(|_| download_failed())?;

    tracing::info!(bytes = artifact.len, "Download started");
    let body = Body::from_stream(DownloadStream::new(file, artifact.path, artifact.len, claim));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(artifact.format.mime_type()),
            ),
            (header::CONTENT_LENGTH, HeaderValue::from(artifact.len)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// File body that deletes its file after the last chunk was read
pub struct DownloadStream {
    inner: ReaderStream<File>,
    path: PathBuf,
    len: u64,
    claim: Option<DownloadClaim>,
    sent: u64,
}

impl DownloadStream {
    pub fn new(file: File, path: PathBuf, len: u64, claim: DownloadClaim) -> Self {
        let mut stream = Self {
            inner: ReaderStream::new(file),
            path,
            len,
            claim: Some(claim),
            sent: 0,
        };
        // An empty body may never be polled
        if len == 0 {
            stream.complete();
        }
        stream
    }

    /// Delete the file and release the claim. Runs once.
    fn complete(&mut self) {
        if let Some(claim) = self.claim.take() {
            remove_file_logged(&self.path);
            tracing::info!(
                file = %claim.file_name(),
                bytes = self.sent,
                "Download complete"
            );
        }
    }
}

impl Stream for DownloadStream {
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let poll = Pin::new(&mut self.inner).poll_next(cx);
        match &poll {
            Poll::Ready(Some(Ok(chunk))) => {
                self.sent += chunk.len() as u64;
                if self.sent >= self.len {
                    self.complete();
                }
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::error!(path = %self.path.display(), error = %e, "Download error");
                // File stays on disk for a retry
                self.claim = None;
            }
            Poll::Ready(None) => self.complete(),
            Poll::Pending => {}
        }
        poll
    }
}

impl Drop for DownloadStream {
    fn drop(&mut self) {
        if let Some(claim) = &self.claim {
            tracing::warn!(
                file = %claim.file_name(),
                bytes = self.sent,
                "Download interrupted, keeping file"
            );
        }
    }
}
