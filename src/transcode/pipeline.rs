//! Two-pass conversion pipeline
//!
//! Pass 1 strips the video stream and encodes the audio to the fixed
//! intermediate format. Pass 2 re-encodes the intermediate into the
//! requested format. Pass 2 never starts unless pass 1 succeeded.
//!
//! Every file except the published result is held in a `ScratchFile`, so
//! the upload, the intermediate and any partial output of a failed pass are
//! deleted exactly once however `convert` exits, including when the future
//! is dropped mid-pass.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{AudioFormat, TranscodeJob, Transcoder};
use crate::error::{ConvertError, TranscodeError};
use crate::store::{ArtifactStore, ScratchFile};

/// Runs both transcoding passes for one upload
#[derive(Clone)]
pub struct ConversionPipeline {
    transcoder: Arc<dyn Transcoder>,
    timeout: Option<Duration>,
}

impl ConversionPipeline {
    pub fn new(transcoder: Arc<dyn Transcoder>, timeout: Option<Duration>) -> Self {
        Self {
            transcoder,
            timeout,
        }
    }

    /// Convert an uploaded video into `format` and return the published
    /// artifact's file name.
    pub async fn convert(
        &self,
        store: &ArtifactStore,
        upload: ScratchFile,
        format: AudioFormat,
    ) -> Result<String, ConvertError> {
        let intermediate = store.new_artifact(AudioFormat::INTERMEDIATE);
        let extract = TranscodeJob::new(
            upload.path().to_path_buf(),
            intermediate.path().to_path_buf(),
            AudioFormat::INTERMEDIATE,
        )
        .strip_video();

        self.run(&extract).await.map_err(ConvertError::Extract)?;
        tracing::debug!(intermediate = %intermediate.file_name(), "Audio extracted");

        let output = store.new_artifact(format);
        let encode = TranscodeJob::new(
            intermediate.path().to_path_buf(),
            output.path().to_path_buf(),
            format,
        );

        self.run(&encode).await.map_err(ConvertError::Encode)?;

        Ok(store.publish(output))
    }

    async fn run(&self, job: &TranscodeJob) -> Result<(), TranscodeError> {
        with_timeout(self.timeout, self.transcoder.transcode(job)).await
    }
}

async fn with_timeout<F>(limit: Option<Duration>, pass: F) -> Result<(), TranscodeError>
where
    F: Future<Output = Result<(), TranscodeError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, pass)
            .await
            .map_err(|_| TranscodeError::Timeout(limit))?,
        None => pass.await,
    }
}
