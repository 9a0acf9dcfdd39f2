//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Server configuration
//! - The artifact store (uploads and outputs directories)
//! - The conversion pipeline and its transcoder
//! - The background sweeper for abandoned files

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::store::ArtifactStore;
use crate::transcode::{AudioFormat, ConversionPipeline, Transcoder};

/// Application state shared across all handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,

    /// Uploads and outputs directories
    pub store: ArtifactStore,

    /// Two-pass transcoding
    pub pipeline: ConversionPipeline,

    /// Format used when a request names none
    pub default_format: AudioFormat,

    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Open the store and build the pipeline around `transcoder`
    pub async fn open(config: ServerConfig, transcoder: Arc<dyn Transcoder>) -> Result<Self> {
        let default_format = AudioFormat::parse(&config.transcode.default_format).ok_or_else(
            || {
                ServerError::Config(format!(
                    "unsupported default format: {}",
                    config.transcode.default_format
                ))
            },
        )?;

        let store = ArtifactStore::open(&config.storage).await?;
        let pipeline = ConversionPipeline::new(transcoder, config.transcode.timeout());

        Ok(Self {
            config,
            store,
            pipeline,
            default_format,
            started_at: Utc::now(),
        })
    }

    /// Startup cleanup: drop leftover uploads and expired outputs
    pub async fn prepare_storage(&self) -> Result<()> {
        let purged = self.store.purge_uploads().await?;
        if purged > 0 {
            tracing::info!("Removed {} leftover upload(s)", purged);
        }
        self.sweep().await;
        Ok(())
    }

    /// Remove expired files, logging the outcome. Returns the count removed.
    pub async fn sweep(&self) -> usize {
        match self
            .store
            .sweep_expired(self.config.storage.artifact_ttl())
            .await
        {
            Ok(removed) => {
                if removed > 0 {
                    tracing::info!("Swept {} expired file(s)", removed);
                }
                removed
            }
            Err(e) => {
                tracing::error!(error = %e, "Artifact sweep failed");
                0
            }
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

/// Sweep expired artifacts every `interval` for the life of the process.
pub fn spawn_sweeper(state: Arc<AppState>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; startup already swept.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.sweep().await;
        }
    })
}
