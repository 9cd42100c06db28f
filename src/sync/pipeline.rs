// src/sync/pipeline.rs

//! Per-package update pipeline: download → remove stale expansion → extract

use super::diff::{PackageTask, TaskKind};
use crate::archive::Extractor;
use crate::cache::CacheStore;
use crate::config::SyncConfig;
use crate::error::{PackageError, TransportError};
use crate::registry::Transport;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Brings a single package's archive and expansion up to date
pub struct PackagePipeline<'a> {
    config: &'a SyncConfig,
    store: &'a CacheStore,
    transport: &'a dyn Transport,
    extractor: &'a dyn Extractor,
}

impl<'a> PackagePipeline<'a> {
    pub fn new(
        config: &'a SyncConfig,
        store: &'a CacheStore,
        transport: &'a dyn Transport,
        extractor: &'a dyn Extractor,
    ) -> Self {
        Self {
            config,
            store,
            transport,
            extractor,
        }
    }

    /// Run the steps for `task` in order, stopping at the first failure
    pub fn run(&self, task: &PackageTask) -> Result<(), PackageError> {
        let archive = self.store.archive_path(&task.name, &task.version);

        if task.kind == TaskKind::NeedsDownload {
            self.download(task, &archive)?;
        } else {
            debug!("Using cached archive {}", archive.display());
        }

        let dest = self.store.expansion_path(&task.name);
        let installed = self
            .remove_stale(task, &dest)
            .and_then(|()| self.expand(task, &archive, &dest));
        if installed.is_err() {
            self.evict(&archive);
        }
        installed?;

        info!("Updated {} to {}", task.name, task.version);
        Ok(())
    }

    /// Fetch the archive into a `.part` file and move it into the cache only
    /// once complete, so a failed transfer never looks like a cached archive.
    fn download(&self, task: &PackageTask, archive: &Path) -> Result<(), PackageError> {
        let url = self.config.archive_url(&task.name, &task.version);
        let partial = partial_path(archive);
        info!("Downloading {}", url);

        let fail = |source: TransportError| {
            let _ = fs::remove_file(&partial);
            PackageError::DownloadFailed {
                name: task.name.clone(),
                url: url.clone(),
                source,
            }
        };

        self.transport.download(&url, &partial).map_err(fail)?;
        fs::rename(&partial, archive).map_err(|source| {
            fail(TransportError::Io {
                path: archive.to_path_buf(),
                source,
            })
        })?;

        Ok(())
    }

    /// Remove any previous expansion. On failure the old content is left in
    /// place and extraction is skipped.
    fn remove_stale(&self, task: &PackageTask, dest: &Path) -> Result<(), PackageError> {
        // symlink_metadata so a dangling entry still counts as present
        if fs::symlink_metadata(dest).is_err() {
            return Ok(());
        }

        info!("Erasing old {}", dest.display());
        fs::remove_dir_all(dest).map_err(|source| PackageError::CleanupFailed {
            name: task.name.clone(),
            path: dest.to_path_buf(),
            source,
        })
    }

    fn expand(&self, task: &PackageTask, archive: &Path, dest: &Path) -> Result<(), PackageError> {
        info!("Unpacking {}", archive.display());
        self.extractor
            .extract(archive, dest)
            .map_err(|source| PackageError::ExtractFailed {
                name: task.name.clone(),
                archive: archive.to_path_buf(),
                source,
            })
    }

    /// Drop the cached archive after a failed install. The snapshot will
    /// record this version, so a missing archive is what makes the next run
    /// download and install it again.
    fn evict(&self, archive: &Path) {
        match fs::remove_file(archive) {
            Ok(()) => debug!("Evicted cached archive {}", archive.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to evict cached archive {}: {}", archive.display(), e),
        }
    }
}

fn partial_path(archive: &Path) -> PathBuf {
    let mut name = archive
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    archive.with_file_name(name)
}
