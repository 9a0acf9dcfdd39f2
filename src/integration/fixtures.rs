//! Test fixtures for integration tests
//!
//! Provides a scripted transcoder, temporary server state and a multipart
//! body builder so the HTTP surface can be exercised without ffmpeg.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use crate::config::{ServerConfig, StorageConfig};
use crate::error::TranscodeError;
use crate::state::AppState;
use crate::store::ArtifactStore;
use crate::transcode::{TranscodeJob, Transcoder};

/// Transcoder double. Writes `<codec>:<input bytes>` to the output, so the
/// final artifact of a conversion reads `<pass 2 codec>:<pass 1 codec>:<video>`.
pub struct ScriptedTranscoder {
    /// 1 = extraction pass (strip_video), 2 = encoding pass
    fail_pass: Option<u8>,
    hang: bool,
    delay: Option<Duration>,
    jobs: Mutex<Vec<TranscodeJob>>,
}

impl ScriptedTranscoder {
    pub fn succeeding() -> Self {
        Self {
            fail_pass: None,
            hang: false,
            delay: None,
            jobs: Mutex::new(Vec::new()),
        }
    }

    /// Fail the given pass after leaving a partial output behind
    pub fn failing_pass(pass: u8) -> Self {
        Self {
            fail_pass: Some(pass),
            ..Self::succeeding()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::succeeding()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::succeeding()
        }
    }

    pub fn jobs(&self) -> Vec<TranscodeJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for ScriptedTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> Result<(), TranscodeError> {
        self.jobs.lock().unwrap().push(job.clone());

        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let input = tokio::fs::read(&job.input)
            .await
            .map_err(|e| TranscodeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: format!("{}: {}", job.input.display(), e),
            })?;

        let pass = if job.strip_video { 1 } else { 2 };
        if self.fail_pass == Some(pass) {
            let _ = tokio::fs::write(&job.output, b"partial").await;
            return Err(TranscodeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: format!("scripted failure in pass {}", pass),
            });
        }

        let mut output = format!("{}:", job.audio_codec).into_bytes();
        output.extend_from_slice(&input);
        tokio::fs::write(&job.output, output)
            .await
            .map_err(|e| TranscodeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: e.to_string(),
            })
    }
}

/// Server configuration rooted in a temporary directory
pub fn test_config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        static_dir: dir.path().join("public"),
        storage: StorageConfig {
            uploads_dir: dir.path().join("uploads"),
            outputs_dir: dir.path().join("output"),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub async fn test_store(dir: &TempDir) -> ArtifactStore {
    ArtifactStore::open(&test_config(dir).storage).await.unwrap()
}

pub async fn test_state_with(
    config: ServerConfig,
    transcoder: impl Transcoder + 'static,
) -> Arc<AppState> {
    Arc::new(AppState::open(config, Arc::new(transcoder)).await.unwrap())
}

pub async fn test_state(dir: &TempDir, transcoder: impl Transcoder + 'static) -> Arc<AppState> {
    test_state_with(test_config(dir), transcoder).await
}

/// Sorted file names in a directory
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Minimal multipart/form-data encoder
pub struct MultipartBuilder {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self {
            boundary: format!("----test-boundary-{}", uuid::Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn file(mut self, name: &str, file_name: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: video/mp4\r\n\r\n",
                self.boundary, name, file_name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    /// POST /convert request carrying the encoded form
    pub fn into_request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::post("/convert")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}
