// src/sync/controller.rs

//! Bounded execution of package pipelines
//!
//! Runs a job once per task, either one at a time or on a dedicated `rayon`
//! pool sized to the job limit, and returns only after every task has reached
//! a terminal state. Individual failures are collected, never propagated.

use super::diff::PackageTask;
use crate::config::ConcurrencyPolicy;
use crate::error::{Error, PackageError, Result};
use rayon::ThreadPoolBuilder;
use std::sync::OnceLock;
use tracing::{debug, error};

/// Outcome of a batch, in task order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<PackageError>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, task: &PackageTask, outcome: std::result::Result<(), PackageError>) {
        match outcome {
            Ok(()) => self.succeeded.push(task.name.clone()),
            Err(e) => {
                error!("{}", e);
                self.failed.push(e);
            }
        }
    }
}

/// Run `job` for every task under `policy`.
///
/// Each task runs exactly once. Returns after the last one finishes,
/// regardless of individual outcomes. Only failing to start the worker pool
/// is an error.
pub fn run_all<F>(tasks: &[PackageTask], policy: ConcurrencyPolicy, job: F) -> Result<BatchReport>
where
    F: Fn(&PackageTask) -> std::result::Result<(), PackageError> + Sync,
{
    let mut report = BatchReport::default();

    match policy {
        ConcurrencyPolicy::Sequential => {
            debug!("Running {} tasks sequentially", tasks.len());
            for task in tasks {
                let outcome = job(task);
                report.record(task, outcome);
            }
        }
        ConcurrencyPolicy::Parallel { limit } => {
            if limit == 0 {
                return Err(Error::ConfigError(
                    "parallel job limit must be at least 1".to_string(),
                ));
            }
            debug!("Running {} tasks, at most {} at once", tasks.len(), limit);

            let pool = ThreadPoolBuilder::new()
                .num_threads(limit)
                .thread_name(|i| format!("regsync-worker-{}", i))
                .build()
                .map_err(|e| Error::InitError(format!("Failed to start worker pool: {}", e)))?;

            let outcomes: Vec<OnceLock<std::result::Result<(), PackageError>>> =
                tasks.iter().map(|_| OnceLock::new()).collect();

            // FIFO scope: tasks start in order as workers free up; the scope
            // returns only after every spawned job completed.
            pool.scope_fifo(|scope| {
                for (task, slot) in tasks.iter().zip(&outcomes) {
                    let job = &job;
                    scope.spawn_fifo(move |_| {
                        let stored = slot.set(job(task)).is_ok();
                        debug_assert!(stored, "outcome for {} recorded twice", task.name);
                    });
                }
            });

            for (task, slot) in tasks.iter().zip(outcomes) {
                if let Some(outcome) = slot.into_inner() {
                    report.record(task, outcome);
                }
            }
        }
    }

    Ok(report)
}
