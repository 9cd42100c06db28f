// src/config.rs

//! Run configuration
//!
//! Everything a run needs to know about where the registry lives and where the
//! local cache goes is carried in a [`SyncConfig`] value handed to each
//! component at construction. There are no config files; the CLI fills the
//! struct from its arguments.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Registry document location
pub const DEFAULT_REGISTRY_URL: &str = "https://s3.amazonaws.com/extend.brackets/registry.json";

/// Base URL that per-package archives are served under
pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://s3.amazonaws.com/extend.brackets";

/// Downloads root, relative to the working directory
pub const DEFAULT_DOWNLOADS_DIR: &str = "downloads";

/// Archive cache subdirectory of the downloads root
pub const DEFAULT_ARCHIVE_DIR: &str = "zips";

/// Snapshot file name inside the downloads root
pub const SNAPSHOT_FILE: &str = "registry.json";

/// Scratch file the snapshot is written to before being renamed into place
pub const SNAPSHOT_TEMP_FILE: &str = "registry.json.tmp";

pub const DEFAULT_ARCHIVE_EXT: &str = "zip";

/// Pipelines in flight at once in parallel mode
pub const DEFAULT_JOBS: usize = 5;

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// How package pipelines are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    /// At most `limit` pipelines in flight, the rest queued in order
    Parallel { limit: usize },
    /// One pipeline at a time, in task order
    Sequential,
}

impl Default for ConcurrencyPolicy {
    fn default() -> Self {
        Self::Parallel {
            limit: DEFAULT_JOBS,
        }
    }
}

/// Configuration for a synchronization run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub registry_url: String,
    pub archive_base_url: String,
    pub downloads_root: PathBuf,
    pub archive_dir_name: String,
    pub archive_ext: String,
    pub concurrency: ConcurrencyPolicy,
    pub http_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            archive_base_url: DEFAULT_ARCHIVE_BASE_URL.to_string(),
            downloads_root: PathBuf::from(DEFAULT_DOWNLOADS_DIR),
            archive_dir_name: DEFAULT_ARCHIVE_DIR.to_string(),
            archive_ext: DEFAULT_ARCHIVE_EXT.to_string(),
            concurrency: ConcurrencyPolicy::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl SyncConfig {
    /// Default configuration rooted at `downloads_root`
    pub fn new(downloads_root: impl AsRef<Path>) -> Self {
        Self {
            downloads_root: downloads_root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// URL of the archive for one package version:
    /// `<base>/<name>/<name>-<version>.<ext>`
    pub fn archive_url(&self, name: &str, version: &str) -> String {
        format!(
            "{}/{}/{}-{}.{}",
            self.archive_base_url.trim_end_matches('/'),
            name,
            name,
            version,
            self.archive_ext
        )
    }

    /// Reject values that would make the layout or the scheduler ill-defined
    pub fn validate(&self) -> Result<()> {
        if self.registry_url.trim().is_empty() {
            return Err(Error::ConfigError("registry URL is empty".to_string()));
        }
        if self.archive_base_url.trim().is_empty() {
            return Err(Error::ConfigError("archive base URL is empty".to_string()));
        }
        if self.archive_ext.is_empty()
            || self.archive_ext.starts_with('.')
            || self.archive_ext.contains(['/', '\\', '\0'])
            || self.archive_ext.contains("..")
        {
            return Err(Error::ConfigError(format!(
                "archive extension '{}' must be non-empty, have no leading dot and no path separators",
                self.archive_ext
            )));
        }
        if self.archive_dir_name.is_empty()
            || self.archive_dir_name.contains(['/', '\\'])
            || self.archive_dir_name == "."
            || self.archive_dir_name == ".."
            || self.archive_dir_name == SNAPSHOT_FILE
            || self.archive_dir_name == SNAPSHOT_TEMP_FILE
        {
            return Err(Error::ConfigError(format!(
                "invalid archive directory name '{}'",
                self.archive_dir_name
            )));
        }
        if let ConcurrencyPolicy::Parallel { limit: 0 } = self.concurrency {
            return Err(Error::ConfigError(
                "parallel job limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
