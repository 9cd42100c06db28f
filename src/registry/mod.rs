// src/registry/mod.rs

//! Registry document and retrieval
//!
//! This module provides:
//! - The registry document model (package name → metadata)
//! - The registry client that fetches and parses the remote document
//! - The transport seam used for every network request

pub mod transport;

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub use transport::{HttpResponse, HttpTransport, Transport};

/// Longest slice of a response body echoed into logs
const BODY_LOG_LIMIT: usize = 2048;

/// Package metadata block; only `version` is interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub version: String,

    /// Remaining metadata fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One package in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub metadata: EntryMetadata,

    /// Remaining top-level fields (owner, versions, download counts, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegistryEntry {
    /// Entry carrying only a version
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            metadata: EntryMetadata {
                version: version.into(),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }
}

/// Mapping from package name to its registry entry.
///
/// Iteration is ordered by package name, which keeps task lists deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryDocument {
    packages: BTreeMap<String, RegistryEntry>,
}

impl RegistryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from raw JSON bytes
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: RegistryEntry) {
        self.packages.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.packages.get(name)
    }

    /// Version recorded for `name`, if the package is listed
    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.packages.get(name).map(RegistryEntry::version)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.packages.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for RegistryDocument {
    /// Build a document of bare `(name, version)` entries
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut doc = Self::new();
        for (name, version) in iter {
            doc.insert(name, RegistryEntry::new(version));
        }
        doc
    }
}

/// Retrieves the registry document from its well-known URL
pub struct RegistryClient<'a> {
    transport: &'a dyn Transport,
    url: &'a str,
}

impl<'a> RegistryClient<'a> {
    pub fn new(transport: &'a dyn Transport, url: &'a str) -> Self {
        Self { transport, url }
    }

    /// Fetch and parse the registry with a single GET. No retries.
    pub fn fetch_registry(&self) -> Result<RegistryDocument, FetchError> {
        info!("Downloading latest registry from {}", self.url);

        let response = self.transport.get(self.url)?;

        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body).into_owned();
            warn!(
                "Unexpected response HTTP {} from {}: {}",
                response.status,
                self.url,
                truncate(&body)
            );
            return Err(FetchError::Status {
                url: self.url.to_string(),
                status: response.status,
                body,
            });
        }

        let registry = RegistryDocument::from_slice(&response.body).map_err(|source| {
            let body = String::from_utf8_lossy(&response.body).into_owned();
            warn!("Error parsing registry: {}: {}", source, truncate(&body));
            FetchError::Parse {
                url: self.url.to_string(),
                source,
                body,
            }
        })?;

        info!("Registry lists {} packages", registry.len());
        Ok(registry)
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(BODY_LOG_LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
