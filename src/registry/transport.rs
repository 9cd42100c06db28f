// src/registry/transport.rs

//! HTTP transport seam
//!
//! Everything that touches the network goes through [`Transport`], so the
//! synchronizer can be driven against an in-process double in tests.

use crate::error::{Error, Result, TransportError};
use reqwest::blocking::Client;
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Status and body of a completed request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetch capability used by the registry client and the package pipeline
pub trait Transport: Send + Sync {
    /// GET `url`, returning whatever status the server answered with
    fn get(&self, url: &str) -> std::result::Result<HttpResponse, TransportError>;

    /// GET `url` and stream the body into `dest`.
    ///
    /// A non-success status is an error and `dest` may be left partially
    /// written; callers point this at a scratch path.
    fn download(&self, url: &str, dest: &Path) -> std::result::Result<(), TransportError>;
}

/// Blocking reqwest transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("regsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> std::result::Result<HttpResponse, TransportError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }

    fn download(&self, url: &str, dest: &Path) -> std::result::Result<(), TransportError> {
        debug!("Downloading {} to {}", url, dest.display());

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let io_err = |source: io::Error| TransportError::Io {
            path: dest.to_path_buf(),
            source,
        };

        let mut file = File::create(dest).map_err(io_err)?;
        io::copy(&mut response, &mut file).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        Ok(())
    }
}
