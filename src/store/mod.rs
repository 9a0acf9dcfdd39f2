//! Artifact store
//!
//! Owns the uploads and outputs directories. Every file the server writes is
//! named `<uuid>.<ext>` by this module, which is also the only place that
//! turns a client-supplied name back into a path:
//! - Scratch files for uploads and conversion passes
//! - Download name validation (no path can escape the outputs directory)
//! - Single-download claims
//! - Startup purge and age-based sweeping of abandoned files

pub mod scratch;

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::transcode::AudioFormat;

pub use scratch::{remove_file_logged, ScratchFile};

/// Extension given to raw uploads
const UPLOAD_EXTENSION: &str = "upload";

/// A produced artifact that is ready to be downloaded
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub path: PathBuf,
    pub format: AudioFormat,
    pub len: u64,
}

/// Exclusive right to stream one artifact. Released on drop.
#[derive(Debug)]
pub struct DownloadClaim {
    file_name: String,
    claims: Arc<DashSet<String>>,
}

impl DownloadClaim {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Drop for DownloadClaim {
    fn drop(&mut self) {
        self.claims.remove(&self.file_name);
    }
}

/// Directory snapshot for the debug endpoint
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub pending_uploads: usize,
    pub stored_outputs: usize,
    pub active_downloads: usize,
    pub oldest_output_age_secs: Option<i64>,
}

/// Directory-scoped store for uploads and produced audio files
#[derive(Debug)]
pub struct ArtifactStore {
    uploads_dir: PathBuf,
    outputs_dir: PathBuf,
    claims: Arc<DashSet<String>>,
    /// Scratch files a conversion is still writing or reading
    in_flight: Arc<DashSet<String>>,
}

impl ArtifactStore {
    /// Open the store, creating both directories if needed
    pub async fn open(config: &StorageConfig) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&config.uploads_dir).await?;
        tokio::fs::create_dir_all(&config.outputs_dir).await?;

        Ok(Self {
            uploads_dir: config.uploads_dir.clone(),
            outputs_dir: config.outputs_dir.clone(),
            claims: Arc::new(DashSet::new()),
            in_flight: Arc::new(DashSet::new()),
        })
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    /// Allocate a scratch path for an incoming upload
    pub fn new_upload(&self) -> ScratchFile {
        ScratchFile::tracked(
            self.uploads_dir
                .join(format!("{}.{}", Uuid::new_v4(), UPLOAD_EXTENSION)),
            Arc::clone(&self.in_flight),
        )
    }

    /// Allocate a freshly named output path for `format`
    pub fn new_artifact(&self, format: AudioFormat) -> ScratchFile {
        ScratchFile::tracked(
            self.outputs_dir
                .join(format!("{}.{}", Uuid::new_v4(), format.extension())),
            Arc::clone(&self.in_flight),
        )
    }

    /// Keep a finished output on disk and return the name clients use for it
    pub fn publish(&self, scratch: ScratchFile) -> String {
        let file_name = scratch.file_name();
        let path = scratch.persist();
        tracing::info!(path = %path.display(), "Artifact ready for download");
        file_name
    }

    /// Look up a downloadable artifact by client-supplied name.
    ///
    /// Returns `Ok(None)` for names this store could never have produced and
    /// for files that no longer exist.
    pub async fn resolve(&self, file_name: &str) -> std::io::Result<Option<Artifact>> {
        let Some(format) = parse_artifact_name(file_name) else {
            return Ok(None);
        };

        let path = self.outputs_dir.join(file_name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(Artifact {
                file_name: file_name.to_string(),
                path,
                format,
                len: meta.len(),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Claim an artifact for download. `None` while someone else holds it.
    pub fn claim(&self, file_name: &str) -> Option<DownloadClaim> {
        self.claims
            .insert(file_name.to_string())
            .then(|| DownloadClaim {
                file_name: file_name.to_string(),
                claims: Arc::clone(&self.claims),
            })
    }

    pub fn active_downloads(&self) -> usize {
        self.claims.len()
    }

    /// Remove every file in the uploads directory. Run at startup, before
    /// any request can be writing there.
    pub async fn purge_uploads(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        for (path, _) in list_files(&self.uploads_dir).await? {
            if remove_file_logged(&path) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Remove uploads and outputs whose last modification is older than
    /// `ttl`. Files that a conversion still holds or that are being
    /// downloaded are skipped.
    pub async fn sweep_expired(&self, ttl: Duration) -> std::io::Result<usize> {
        let ttl =
            chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::weeks(5200));
        let now = Utc::now();
        let mut removed = 0;

        for dir in [&self.uploads_dir, &self.outputs_dir] {
            for (path, modified) in list_files(dir).await? {
                let busy = path
                    .file_name()
                    .map(|n| {
                        let name = n.to_string_lossy();
                        self.claims.contains(&*name) || self.in_flight.contains(&*name)
                    })
                    .unwrap_or(false);
                if busy || now - modified <= ttl {
                    continue;
                }
                if remove_file_logged(&path) {
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }

    pub async fn stats(&self) -> std::io::Result<StoreStats> {
        let uploads = list_files(&self.uploads_dir).await?;
        let outputs = list_files(&self.outputs_dir).await?;
        let now = Utc::now();

        Ok(StoreStats {
            pending_uploads: uploads.len(),
            stored_outputs: outputs.len(),
            active_downloads: self.active_downloads(),
            oldest_output_age_secs: outputs
                .iter()
                .map(|(_, modified)| (now - *modified).num_seconds())
                .max(),
        })
    }
}

/// Validate a download name: canonical lowercase UUID v4 stem plus a known
/// extension. Anything else, including separators and `..`, is rejected.
pub fn parse_artifact_name(file_name: &str) -> Option<AudioFormat> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    let id = Uuid::try_parse(stem).ok()?;
    if id.get_version_num() != 4 || id.hyphenated().to_string() != stem {
        return None;
    }
    AudioFormat::ALL
        .into_iter()
        .find(|f| f.extension() == ext)
}

async fn list_files(dir: &Path) -> std::io::Result<Vec<(PathBuf, DateTime<Utc>)>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let meta = match entry.metadata().await {
            Ok(meta) => meta,
            // Removed by a concurrent request between read_dir and stat
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        if !meta.is_file() {
            continue;
        }
        let modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        files.push((entry.path(), modified));
    }
    Ok(files)
}
