// src/main.rs

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use regsync::cache::CacheStore;
use regsync::config::{
    ConcurrencyPolicy, DEFAULT_ARCHIVE_BASE_URL, DEFAULT_ARCHIVE_EXT, DEFAULT_DOWNLOADS_DIR,
    DEFAULT_JOBS, DEFAULT_REGISTRY_URL, SyncConfig,
};
use regsync::sync::{Synchronizer, TaskKind};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "regsync")]
#[command(author, version, about = "Mirror a remote package registry into a local directory", long_about = None)]
struct Cli {
    /// Increase log verbosity (RUST_LOG takes precedence)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where the registry lives and where the mirror goes
#[derive(Args, Debug)]
struct LocationArgs {
    /// Downloads root holding the snapshot, archive cache and expansions
    #[arg(short, long, default_value = DEFAULT_DOWNLOADS_DIR)]
    downloads: PathBuf,
    /// Registry document URL
    #[arg(long, default_value = DEFAULT_REGISTRY_URL)]
    registry_url: String,
    /// Base URL of per-package archives
    #[arg(long, default_value = DEFAULT_ARCHIVE_BASE_URL)]
    archive_base: String,
    /// Archive file extension (zip, tar.gz, tgz, tar.xz, tar.zst)
    #[arg(long, default_value = DEFAULT_ARCHIVE_EXT)]
    archive_ext: String,
    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

impl LocationArgs {
    fn into_config(self) -> SyncConfig {
        SyncConfig {
            registry_url: self.registry_url,
            archive_base_url: self.archive_base,
            archive_ext: self.archive_ext,
            http_timeout: Duration::from_secs(self.timeout),
            ..SyncConfig::new(self.downloads)
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download changed packages and refresh their expansions
    Sync {
        #[command(flatten)]
        location: LocationArgs,
        /// Maximum packages updated at once
        #[arg(short, long, default_value_t = DEFAULT_JOBS)]
        jobs: usize,
        /// Update one package at a time, in registry order
        #[arg(long, conflicts_with = "jobs")]
        sequential: bool,
        /// Exit with an error if any package or the snapshot write failed
        #[arg(long)]
        strict: bool,
    },
    /// Show what a sync would do without changing anything
    Plan {
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Show the packages recorded in the local snapshot
    Status {
        /// Downloads root
        #[arg(short, long, default_value = DEFAULT_DOWNLOADS_DIR)]
        downloads: PathBuf,
    },
}

fn concurrency(jobs: usize, sequential: bool) -> ConcurrencyPolicy {
    if sequential {
        ConcurrencyPolicy::Sequential
    } else {
        ConcurrencyPolicy::Parallel { limit: jobs }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Sync {
            location,
            jobs,
            sequential,
            strict,
        }) => {
            let mut config = location.into_config();
            config.concurrency = concurrency(jobs, sequential);
            info!("Synchronizing into {}", config.downloads_root.display());

            let sync = Synchronizer::new(config)?;
            let report = sync.run()?;

            println!(
                "Registry: {} packages, {} updated, {} failed",
                report.registry_size,
                report.batch.succeeded.len(),
                report.batch.failed.len()
            );
            for failure in &report.batch.failed {
                println!("  FAILED {}", failure);
            }
            if let Some(e) = &report.snapshot_error {
                println!("  Snapshot not saved: {}", e);
            }

            if strict && !report.is_clean() {
                return Err(anyhow::anyhow!(
                    "{} package(s) failed to update{}",
                    report.batch.failed.len(),
                    if report.snapshot_error.is_some() {
                        " and the snapshot was not saved"
                    } else {
                        ""
                    }
                ));
            }
            Ok(())
        }
        Some(Commands::Plan { location }) => {
            let sync = Synchronizer::new(location.into_config())?;
            let plan = sync.plan()?;

            if plan.tasks.is_empty() {
                println!("Up to date ({} packages).", plan.registry.len());
            } else {
                println!("Packages to update:");
                for task in &plan.tasks {
                    let action = match task.kind {
                        TaskKind::NeedsDownload => "download",
                        TaskKind::NeedsReExpandOnly => "re-expand",
                    };
                    println!("  {} {} [{}, {}]", task.name, task.version, task.change, action);
                }
                println!("\nTotal: {} of {} package(s)", plan.tasks.len(), plan.registry.len());
            }
            Ok(())
        }
        Some(Commands::Status { downloads }) => {
            let store = CacheStore::new(&SyncConfig::new(&downloads));
            let snapshot = store.load_snapshot()?;

            if snapshot.is_empty() {
                println!("No snapshot in {}.", downloads.display());
            } else {
                println!("Mirrored packages:");
                for (name, entry) in snapshot.iter() {
                    let cached = if store.archive_exists(name, entry.version()) {
                        "cached"
                    } else {
                        "archive missing"
                    };
                    println!("  {} {} ({})", name, entry.version(), cached);
                }
                println!("\nTotal: {} package(s)", snapshot.len());
            }
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("Regsync v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'regsync --help' for usage information");
            Ok(())
        }
    }
}
