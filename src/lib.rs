// src/lib.rs

//! Regsync Registry Mirror
//!
//! Keeps a local mirror of a remote package registry: every run fetches the
//! registry document, works out which packages changed since the last run,
//! downloads their archives and re-expands them, then saves the registry as
//! the new snapshot.
//!
//! # Architecture
//!
//! - Registry: remote document of package name → metadata, fetched once per run
//! - Cache: archive cache, per-package expansion directories, snapshot file
//! - Diff: new registry vs. snapshot and archive presence → task list
//! - Pipeline: download → remove stale expansion → extract, per package
//! - Controller: bounded parallel or sequential execution of pipelines

pub mod archive;
pub mod cache;
pub mod config;
mod error;
pub mod registry;
pub mod sync;

pub use error::{
    Error, ExtractError, FetchError, PackageError, PackageErrorKind, Result, TransportError,
    WriteError,
};
