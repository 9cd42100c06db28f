// src/sync/diff.rs

//! Reconciliation of the fetched registry against the previous snapshot

use crate::cache::CacheStore;
use crate::registry::RegistryDocument;
use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, warn};

/// What a task has to do before it can expand the package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// No cached archive: fetch it first
    NeedsDownload,
    /// Archive already cached by an earlier run: only remove and re-expand
    NeedsReExpandOnly,
}

/// How the registry version relates to the snapshot's.
///
/// Informational only; it never decides whether a task exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChange {
    /// Not present in the snapshot
    New,
    Upgrade,
    Downgrade,
    /// Versions differ but are not comparable as semver
    Changed,
    /// Same version, cached archive missing
    Recache,
}

impl VersionChange {
    pub fn classify(previous: Option<&str>, current: &str) -> Self {
        let Some(previous) = previous else {
            return Self::New;
        };
        if previous == current {
            return Self::Recache;
        }

        match (Version::parse(previous), Version::parse(current)) {
            (Ok(old), Ok(new)) => match new.cmp(&old) {
                Ordering::Greater => Self::Upgrade,
                Ordering::Less => Self::Downgrade,
                // Equal precedence, differing build metadata
                Ordering::Equal => Self::Changed,
            },
            _ => Self::Changed,
        }
    }
}

impl fmt::Display for VersionChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::New => "new",
            Self::Upgrade => "upgrade",
            Self::Downgrade => "downgrade",
            Self::Changed => "changed",
            Self::Recache => "recache",
        };
        f.write_str(label)
    }
}

/// One package that must be brought up to date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageTask {
    pub name: String,
    pub version: String,
    pub kind: TaskKind,
    pub change: VersionChange,
}

/// Compute the tasks needed to bring the cache in line with `registry`.
///
/// A package gets a task when it is missing from the snapshot, when its
/// version differs from the snapshot's, or when the snapshot agrees but the
/// archive for that version is gone from the cache. Tasks come out in
/// registry (name) order.
pub fn compute_tasks(
    registry: &RegistryDocument,
    snapshot: &RegistryDocument,
    store: &CacheStore,
) -> Vec<PackageTask> {
    let mut tasks = Vec::new();

    for (name, entry) in registry.iter() {
        let version = entry.version();

        if !store.is_valid_package_name(name) || !CacheStore::is_valid_version(version) {
            warn!("Skipping package with unusable name or version: {:?} {:?}", name, version);
            continue;
        }

        let previous = snapshot.version_of(name);
        let cached = store.archive_exists(name, version);

        if previous == Some(version) && cached {
            continue;
        }

        let kind = if cached {
            TaskKind::NeedsReExpandOnly
        } else {
            TaskKind::NeedsDownload
        };
        let change = VersionChange::classify(previous, version);

        debug!("{} {} ({}, {:?})", name, version, change, kind);
        tasks.push(PackageTask {
            name: name.to_string(),
            version: version.to_string(),
            kind,
            change,
        });
    }

    tasks
}
