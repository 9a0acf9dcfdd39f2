use std::time::Duration;
use thiserror::Error;

/// Main error type for the conversion server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Transcoder error: {0}")]
    Transcoder(#[from] TranscodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors reported by the external transcoding engine
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Transcoder did not finish within {0:?}")]
    Timeout(Duration),
}

/// Stage of the two-pass conversion that failed
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Audio extraction failed: {0}")]
    Extract(#[source] TranscodeError),

    #[error("Format conversion failed: {0}")]
    Encode(#[source] TranscodeError),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ServerError>;
