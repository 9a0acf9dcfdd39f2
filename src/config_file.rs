//! Configuration file support
//!
//! Loads server configuration from TOML files. Every section is optional;
//! missing values fall back to [`ServerConfig::default`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{ServerConfig, StorageConfig, TranscodeConfig};
use crate::error::ServerError;

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: Option<ServerSettings>,
    /// Storage settings
    pub storage: Option<StorageSettings>,
    /// Transcoder settings
    pub transcode: Option<TranscodeSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
    /// Limits settings
    pub limits: Option<LimitsSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: Option<String>,
    /// Port to listen on
    pub port: Option<u16>,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
    /// Static client directory
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub uploads_dir: Option<PathBuf>,
    pub outputs_dir: Option<PathBuf>,
    /// Age in seconds after which undownloaded artifacts are swept
    pub artifact_ttl_secs: Option<u64>,
    /// Seconds between background sweeps
    pub sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeSettings {
    /// ffmpeg executable
    pub ffmpeg_path: Option<PathBuf>,
    /// Per-pass timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Format used when the request names none
    pub default_format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSettings {
    /// Maximum request body size in MB
    pub max_upload_mb: Option<usize>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ServerError> {
        toml::from_str(content).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let mut config = defaults.clone();

        if let Some(server) = self.server {
            config.host = server.host.unwrap_or(defaults.host);
            config.port = server.port.unwrap_or(defaults.port);
            config.cors_enabled = server.cors_enabled.unwrap_or(defaults.cors_enabled);
            config.static_dir = server.static_dir.unwrap_or(defaults.static_dir);
        }

        if let Some(storage) = self.storage {
            let fallback = StorageConfig::default();
            config.storage = StorageConfig {
                uploads_dir: storage.uploads_dir.unwrap_or(fallback.uploads_dir),
                outputs_dir: storage.outputs_dir.unwrap_or(fallback.outputs_dir),
                artifact_ttl_secs: storage
                    .artifact_ttl_secs
                    .unwrap_or(fallback.artifact_ttl_secs),
                sweep_interval_secs: storage
                    .sweep_interval_secs
                    .unwrap_or(fallback.sweep_interval_secs),
            };
        }

        if let Some(transcode) = self.transcode {
            let fallback = TranscodeConfig::default();
            config.transcode = TranscodeConfig {
                ffmpeg_path: transcode.ffmpeg_path.unwrap_or(fallback.ffmpeg_path),
                timeout_secs: transcode.timeout_secs.unwrap_or(fallback.timeout_secs),
                default_format: transcode
                    .default_format
                    .unwrap_or(fallback.default_format),
            };
        }

        if let Some(logging) = self.logging {
            config.log_level = logging.level.unwrap_or(defaults.log_level);
            config.log_format = logging.format.unwrap_or(defaults.log_format);
        }

        if let Some(max) = self.limits.and_then(|l| l.max_upload_mb) {
            config.max_upload_mb = max;
        }

        config
    }
}
