//! Scratch file guards
//!
//! A `ScratchFile` owns a path that must disappear when the request that
//! created it is finished with it. Dropping the guard removes the file;
//! `persist` hands the path over to the caller instead.
//!
//! Guards handed out by the store are also listed in its in-flight set for
//! as long as they live, so the sweeper leaves them alone.

use dashmap::DashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File removed on drop unless persisted
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    armed: bool,
    in_flight: Option<Arc<DashSet<String>>>,
}

impl ScratchFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            armed: true,
            in_flight: None,
        }
    }

    /// Guard whose name stays in `in_flight` until it is dropped or persisted
    pub(crate) fn tracked(path: PathBuf, in_flight: Arc<DashSet<String>>) -> Self {
        let mut scratch = Self::new(path);
        in_flight.insert(scratch.file_name());
        scratch.in_flight = Some(in_flight);
        scratch
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base file name of the scratch path
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Keep the file on disk and return its path
    pub fn persist(mut self) -> PathBuf {
        self.armed = false;
        self.untrack();
        std::mem::take(&mut self.path)
    }

    fn untrack(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.remove(&self.file_name());
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.armed {
            remove_file_logged(&self.path);
        }
        self.untrack();
    }
}

/// Remove a file, logging failures. A file that never got created is not a
/// failure. Never retried.
pub fn remove_file_logged(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Deleted file");
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to delete file");
            false
        }
    }
}
