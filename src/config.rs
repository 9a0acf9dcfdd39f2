//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Port used when neither the config file nor `PORT` sets one
pub const DEFAULT_PORT: u16 = 3030;

/// Environment variable that overrides the listen port
pub const PORT_ENV: &str = "PORT";

/// Artifact storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving raw uploads
    pub uploads_dir: PathBuf,

    /// Directory receiving intermediate and final audio files
    pub outputs_dir: PathBuf,

    /// Age after which an undownloaded artifact is swept, in seconds
    pub artifact_ttl_secs: u64,

    /// Interval between background sweeps, in seconds (0 disables)
    pub sweep_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            outputs_dir: PathBuf::from("output"),
            artifact_ttl_secs: 3600,
            sweep_interval_secs: 300,
        }
    }
}

impl StorageConfig {
    pub fn artifact_ttl(&self) -> Duration {
        Duration::from_secs(self.artifact_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

/// Transcoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Path or name of the ffmpeg executable
    pub ffmpeg_path: PathBuf,

    /// Upper bound for a single transcoding pass, in seconds (0 disables)
    pub timeout_secs: u64,

    /// Output format used when the request carries none
    pub default_format: String,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            timeout_secs: 600,
            default_format: "mp3".to_string(),
        }
    }
}

impl TranscodeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directory of static client files served at the site root
    pub static_dir: PathBuf,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Maximum accepted request body in megabytes
    pub max_upload_mb: usize,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Transcoder configuration
    pub transcode: TranscodeConfig,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from("public"),
            cors_enabled: true,
            max_upload_mb: 1024,
            storage: StorageConfig::default(),
            transcode: TranscodeConfig::default(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the request body limit in bytes
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    /// Apply a `PORT` value taken from the environment.
    ///
    /// Unparsable values are ignored and reported back to the caller.
    pub fn apply_port_override(&mut self, value: Option<&str>) -> Option<String> {
        let raw = value?.trim();
        match raw.parse::<u16>() {
            Ok(port) => {
                self.port = port;
                None
            }
            Err(_) => Some(raw.to_string()),
        }
    }
}
