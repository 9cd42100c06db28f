// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for regsync
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote registry could not be retrieved
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The snapshot could not be persisted
    #[error(transparent)]
    Write(#[from] WriteError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Component initialization error (HTTP client, worker pool)
    #[error("Failed to initialize: {0}")]
    InitError(String),
}

/// Failure of the underlying HTTP transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or the body could not be read
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The response body could not be written to disk
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Registry retrieval errors. Any of these aborts the run.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to download registry: {0}")]
    Transport(#[from] TransportError),

    /// Non-success HTTP status; the raw body is kept for diagnosis
    #[error("Unexpected response HTTP {status} from {url}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The body was not a valid registry document
    #[error("Failed to parse registry from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

/// Snapshot persistence errors
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write snapshot {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Archive expansion errors
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An entry would be written outside the destination directory
    #[error("Archive entry escapes destination: {0}")]
    UnsafePath(String),

    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),
}

/// Kind of a per-package failure, for matching without inspecting messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageErrorKind {
    DownloadFailed,
    CleanupFailed,
    ExtractFailed,
}

/// Per-package pipeline failure. Contained to the package; the run continues.
#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Failed to download {name} from {url}: {source}")]
    DownloadFailed {
        name: String,
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("Failed to remove stale expansion {} of {name}: {source}", .path.display())]
    CleanupFailed {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to extract {} for {name}: {source}", .archive.display())]
    ExtractFailed {
        name: String,
        archive: PathBuf,
        #[source]
        source: ExtractError,
    },
}

impl PackageError {
    pub fn kind(&self) -> PackageErrorKind {
        match self {
            Self::DownloadFailed { .. } => PackageErrorKind::DownloadFailed,
            Self::CleanupFailed { .. } => PackageErrorKind::CleanupFailed,
            Self::ExtractFailed { .. } => PackageErrorKind::ExtractFailed,
        }
    }

    /// Name of the package whose pipeline failed
    pub fn package(&self) -> &str {
        match self {
            Self::DownloadFailed { name, .. }
            | Self::CleanupFailed { name, .. }
            | Self::ExtractFailed { name, .. } => name,
        }
    }
}

/// Result type alias using regsync's Error type
pub type Result<T> = std::result::Result<T, Error>;
