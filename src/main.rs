//! Audio Extraction Server
//!
//! Accepts video uploads over HTTP, extracts the audio track with FFmpeg,
//! re-encodes it into the requested format and serves the result once
//! before deleting it.

mod config;
mod config_file;
mod error;
mod http;
mod state;
mod store;
mod transcode;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{ServerConfig, PORT_ENV};
use crate::error::{Result, ServerError};
use crate::http::create_router;
use crate::state::{spawn_sweeper, AppState};
use crate::transcode::FfmpegTranscoder;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "audio-extract-server";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let (mut config, load_error) = if std::path::Path::new(&config_path).exists() {
        match crate::config_file::ConfigFile::from_file(&config_path) {
            Ok(cf) => (cf.into_server_config(), None),
            Err(e) => (ServerConfig::default(), Some(e)),
        }
    } else {
        (ServerConfig::default(), None)
    };
    let bad_port = config.apply_port_override(std::env::var(PORT_ENV).ok().as_deref());

    // Initialize logging
    init_logging(&config);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(e) = load_error {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            config_path,
            e
        );
    }
    if let Some(value) = bad_port {
        tracing::warn!("Ignoring invalid {}={:?}, using port {}", PORT_ENV, value, config.port);
    }
    tracing::info!("Configuration loaded: {:?}", config);

    // Make sure the transcoder can actually run before accepting uploads
    let transcoder = FfmpegTranscoder::new(&config.transcode.ffmpeg_path);
    let ffmpeg_version = transcoder.probe().await?;
    tracing::info!(
        "FFmpeg version ({}): {}",
        transcoder.program().display(),
        ffmpeg_version
    );

    match config.transcode.timeout() {
        Some(timeout) if config.storage.artifact_ttl() < timeout * 2 => tracing::warn!(
            ttl_secs = config.storage.artifact_ttl_secs,
            timeout_secs = config.transcode.timeout_secs,
            "Artifact TTL is shorter than two transcode timeouts; finished files may expire before download"
        ),
        None => tracing::warn!("Transcode timeout disabled; a stuck ffmpeg holds its request forever"),
        _ => {}
    }

    // Create application state
    let state = Arc::new(AppState::open(config.clone(), Arc::new(transcoder)).await?);
    state.prepare_storage().await?;

    if let Some(interval) = config.storage.sweep_interval() {
        tracing::info!("Sweeping expired artifacts every {:?}", interval);
        spawn_sweeper(state.clone(), interval);
    }

    // Build router
    let app = create_router(state.clone());

    // Start server
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| ServerError::Config(format!("invalid listen address: {}", e)))?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("{} stopped", APP_NAME);
    Ok(())
}

/// Initialize logging with tracing
fn init_logging(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "audio_extract_server={level},tower_http={level}",
            level = config.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => tracing::warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received, draining connections");
}
