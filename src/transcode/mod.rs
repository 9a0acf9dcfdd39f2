//! Audio transcoding module
//!
//! This module wraps the external transcoding engine:
//! - The fixed table of output formats and their ffmpeg codec names
//! - The `Transcoder` port and its ffmpeg process implementation
//! - The two-pass conversion pipeline (strip video, then re-encode)

pub mod ffmpeg;
pub mod format;
pub mod pipeline;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::TranscodeError;

pub use ffmpeg::FfmpegTranscoder;
pub use format::AudioFormat;
pub use pipeline::ConversionPipeline;

/// One invocation of the transcoding engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Encoder name passed as `-c:a`
    pub audio_codec: String,
    /// Muxer name passed as `-f`
    pub muxer: Option<String>,
    /// Drop every video stream (`-vn`)
    pub strip_video: bool,
}

impl TranscodeJob {
    /// Job that encodes `input` into `format` at `output`
    pub fn new(input: PathBuf, output: PathBuf, format: AudioFormat) -> Self {
        Self {
            input,
            output,
            audio_codec: format.encoder().to_string(),
            muxer: Some(format.muxer().to_string()),
            strip_video: false,
        }
    }

    pub fn strip_video(mut self) -> Self {
        self.strip_video = true;
        self
    }
}

/// External engine that turns one media file into another.
///
/// Completion means the output file is fully written; any error means the
/// output must be treated as garbage.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, job: &TranscodeJob) -> Result<(), TranscodeError>;
}
