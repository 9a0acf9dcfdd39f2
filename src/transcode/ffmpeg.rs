//! ffmpeg process transcoder
//!
//! Runs the `ffmpeg` command-line tool once per pass. The child is killed if
//! the awaiting future is dropped (client disconnect or pass timeout).

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{TranscodeJob, Transcoder};
use crate::error::TranscodeError;

/// Number of trailing stderr lines kept in a failure report
const STDERR_TAIL_LINES: usize = 12;

/// Transcoder backed by an ffmpeg executable
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check that the executable runs and return its version banner.
    pub async fn probe(&self) -> Result<String, TranscodeError> {
        let output = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| self.spawn_error(source))?;

        if !output.status.success() {
            return Err(TranscodeError::Failed {
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    fn spawn_error(&self, source: std::io::Error) -> TranscodeError {
        TranscodeError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }
}

/// Build the ffmpeg argument list for a job
pub fn build_args(job: &TranscodeJob) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(job.input.clone().into_os_string());

    if job.strip_video {
        args.push("-vn".into());
    }
    args.push("-c:a".into());
    args.push(job.audio_codec.clone().into());
    if let Some(muxer) = &job.muxer {
        args.push("-f".into());
        args.push(muxer.clone().into());
    }

    args.push(job.output.clone().into_os_string());
    args
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> Result<(), TranscodeError> {
        let args = build_args(job);
        tracing::debug!(
            program = %self.program.display(),
            input = %job.input.display(),
            output = %job.output.display(),
            codec = %job.audio_codec,
            "Running transcoder"
        );

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| self.spawn_error(source))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(TranscodeError::Failed {
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            })
        }
    }
}
