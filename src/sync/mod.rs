// src/sync/mod.rs

//! Registry synchronization
//!
//! This module provides:
//! - Diffing the fetched registry against the last snapshot
//! - The per-package download/cleanup/extract pipeline
//! - Bounded execution of those pipelines
//! - The run driver tying them together and persisting the snapshot

pub mod controller;
pub mod diff;
pub mod pipeline;

pub use controller::{BatchReport, run_all};
pub use diff::{PackageTask, TaskKind, VersionChange, compute_tasks};
pub use pipeline::PackagePipeline;

use crate::archive::{ArchiveExtractor, Extractor};
use crate::cache::CacheStore;
use crate::config::SyncConfig;
use crate::error::{Result, WriteError};
use crate::registry::{HttpTransport, RegistryClient, RegistryDocument, Transport};
use tracing::{info, warn};

/// Tasks a run would execute, computed without touching the cache
#[derive(Debug)]
pub struct Plan {
    pub registry: RegistryDocument,
    pub tasks: Vec<PackageTask>,
}

/// Result of a completed run
#[derive(Debug)]
pub struct SyncReport {
    /// Packages listed by the registry
    pub registry_size: usize,
    pub batch: BatchReport,
    /// Set when the snapshot could not be written
    pub snapshot_error: Option<WriteError>,
}

impl SyncReport {
    pub fn tasks(&self) -> usize {
        self.batch.total()
    }

    /// Every package updated and the snapshot persisted
    pub fn is_clean(&self) -> bool {
        self.batch.is_clean() && self.snapshot_error.is_none()
    }
}

/// Drives one synchronization run
pub struct Synchronizer {
    config: SyncConfig,
    store: CacheStore,
    transport: Box<dyn Transport>,
    extractor: Box<dyn Extractor>,
}

impl Synchronizer {
    /// Synchronizer using the HTTP transport and the archive extractor
    pub fn new(config: SyncConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.http_timeout)?;
        Self::with_components(config, Box::new(transport), Box::new(ArchiveExtractor::new()))
    }

    pub fn with_components(
        config: SyncConfig,
        transport: Box<dyn Transport>,
        extractor: Box<dyn Extractor>,
    ) -> Result<Self> {
        config.validate()?;
        let store = CacheStore::new(&config);
        Ok(Self {
            config,
            store,
            transport,
            extractor,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Fetch the registry and compute tasks without downloading, deleting or
    /// writing anything
    pub fn plan(&self) -> Result<Plan> {
        let snapshot = self.store.load_snapshot()?;
        let registry = self.fetch_registry()?;
        let tasks = compute_tasks(&registry, &snapshot, &self.store);
        Ok(Plan { registry, tasks })
    }

    /// Run a full synchronization.
    ///
    /// Fails only when the layout cannot be created or the registry cannot be
    /// fetched; package failures and a failed snapshot write are reported in
    /// the returned [`SyncReport`].
    pub fn run(&self) -> Result<SyncReport> {
        self.store.ensure_layout()?;
        let snapshot = self.store.load_snapshot()?;
        let registry = self.fetch_registry()?;

        let tasks = compute_tasks(&registry, &snapshot, &self.store);
        info!("{} packages to update", tasks.len());

        let pipeline = PackagePipeline::new(
            &self.config,
            &self.store,
            self.transport.as_ref(),
            self.extractor.as_ref(),
        );
        let batch = run_all(&tasks, self.config.concurrency, |task| pipeline.run(task))?;

        // Persisted whatever the individual outcomes were
        let snapshot_error = match self.store.save_snapshot(&registry) {
            Ok(()) => None,
            Err(e) => {
                warn!("{}", e);
                Some(e)
            }
        };

        info!(
            "Sync complete: {} updated, {} failed",
            batch.succeeded.len(),
            batch.failed.len()
        );

        Ok(SyncReport {
            registry_size: registry.len(),
            batch,
            snapshot_error,
        })
    }

    fn fetch_registry(&self) -> Result<RegistryDocument> {
        let client = RegistryClient::new(self.transport.as_ref(), &self.config.registry_url);
        Ok(client.fetch_registry()?)
    }
}
