// src/cache/mod.rs

//! Local cache layout
//!
//! ```text
//! <downloads>/
//!   registry.json          snapshot of the registry from the last run
//!   zips/<name>-<ver>.zip  archive cache, reused across runs
//!   <name>/                current expansion of each package
//! ```

use crate::config::{SNAPSHOT_FILE, SNAPSHOT_TEMP_FILE, SyncConfig};
use crate::error::{Result, WriteError};
use crate::registry::RegistryDocument;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// On-disk store for archives, expansions and the registry snapshot
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    archives: PathBuf,
    snapshot: PathBuf,
    snapshot_temp: PathBuf,
    archive_ext: String,
}

impl CacheStore {
    pub fn new(config: &SyncConfig) -> Self {
        let root = config.downloads_root.clone();
        Self {
            archives: root.join(&config.archive_dir_name),
            snapshot: root.join(SNAPSHOT_FILE),
            snapshot_temp: root.join(SNAPSHOT_TEMP_FILE),
            archive_ext: config.archive_ext.clone(),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archives
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot
    }

    /// Create the downloads root and archive cache if missing. Idempotent.
    pub fn ensure_layout(&self) -> Result<()> {
        if !self.archives.is_dir() {
            info!("Creating downloads directory {}", self.archives.display());
        }
        fs::create_dir_all(&self.archives)?;
        Ok(())
    }

    /// Load the previous run's snapshot.
    ///
    /// A missing file yields an empty document. So does an unreadable one,
    /// after a warning: every package then counts as new, and cached
    /// archives turn those tasks into re-expansions.
    pub fn load_snapshot(&self) -> Result<RegistryDocument> {
        let bytes = match fs::read(&self.snapshot) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No snapshot at {}", self.snapshot.display());
                return Ok(RegistryDocument::new());
            }
            Err(e) => return Err(e.into()),
        };

        info!("Reading previously downloaded registry");
        match RegistryDocument::from_slice(&bytes) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(
                    "Ignoring unreadable snapshot {}: {}",
                    self.snapshot.display(),
                    e
                );
                Ok(RegistryDocument::new())
            }
        }
    }

    /// Persist `doc` as the new snapshot.
    ///
    /// Written to a sibling temp file and renamed into place, so the previous
    /// snapshot stays intact if the write is interrupted.
    pub fn save_snapshot(&self, doc: &RegistryDocument) -> std::result::Result<(), WriteError> {
        info!("Saving registry snapshot to {}", self.snapshot.display());

        let json = serde_json::to_vec_pretty(doc)?;
        let temp_path = self.snapshot_temp.as_path();
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| WriteError::Io { path, source }
        };

        let mut file = fs::File::create(temp_path).map_err(io_err(temp_path))?;
        file.write_all(&json).map_err(io_err(temp_path))?;
        file.sync_all().map_err(io_err(temp_path))?;
        drop(file);

        fs::rename(temp_path, &self.snapshot).map_err(io_err(self.snapshot.as_path()))?;
        Ok(())
    }

    /// `<archives>/<name>-<version>.<ext>`
    pub fn archive_path(&self, name: &str, version: &str) -> PathBuf {
        self.archives
            .join(format!("{}-{}.{}", name, version, self.archive_ext))
    }

    /// `<root>/<name>`
    pub fn expansion_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn archive_exists(&self, name: &str, version: &str) -> bool {
        self.archive_path(name, version).is_file()
    }

    /// Whether `name` can be used as a directory under the downloads root
    /// without escaping it or colliding with the cache's own entries.
    pub fn is_valid_package_name(&self, name: &str) -> bool {
        is_plain_component(name)
            && Some(std::ffi::OsStr::new(name)) != self.archives.file_name()
            && Some(std::ffi::OsStr::new(name)) != self.snapshot.file_name()
            && Some(std::ffi::OsStr::new(name)) != self.snapshot_temp.file_name()
    }

    /// Whether `version` can be embedded in an archive file name
    pub fn is_valid_version(version: &str) -> bool {
        is_plain_component(version)
    }
}

fn is_plain_component(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\', '\0'])
}
