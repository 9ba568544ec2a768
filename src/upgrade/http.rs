//! HTTP transport used by the updater.
//!
//! The release oracle and the artifact downloader only need two operations,
//! "GET as text" and "GET into a file". [`Transport`] captures exactly that so
//! the update flow can run against an in-memory transport in tests, while
//! [`ReqwestTransport`] talks to the network.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::constants::{TOOL_NAME, VERSION};

/// Why a GET did not produce a usable body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection, DNS, TLS or body-read failure.
    #[error("{0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The body could not be written to disk.
    #[error("write failed: {0}")]
    Write(String),
}

/// Minimal HTTP GET interface.
pub trait Transport: Send + Sync {
    /// Fetch `url` and return its body as text.
    fn get_text(&self, url: &str) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Fetch `url` and stream its body into `dest`, returning the byte count.
    fn download(
        &self,
        url: &str,
        dest: &mut File,
    ) -> impl Future<Output = Result<u64, TransportError>> + Send;
}

/// [`Transport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client; `timeout` bounds each whole request when set.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder =
            reqwest::Client::builder().user_agent(format!("{TOOL_NAME}/{VERSION}"));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            client,
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, TransportError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!("GET {} returned {}", url, status);
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

impl Transport for ReqwestTransport {
    async fn get_text(&self, url: &str) -> Result<String, TransportError> {
        self.get(url).await?.text().await.map_err(|e| TransportError::Network(e.to_string()))
    }

    async fn download(&self, url: &str, dest: &mut File) -> Result<u64, TransportError> {
        let mut response = self.get(url).await?;
        let mut written = 0u64;

        while let Some(chunk) =
            response.chunk().await.map_err(|e| TransportError::Network(e.to_string()))?
        {
            dest.write_all(&chunk).await.map_err(|e| TransportError::Write(e.to_string()))?;
            written += chunk.len() as u64;
        }
        dest.flush().await.map_err(|e| TransportError::Write(e.to_string()))?;

        debug!("Downloaded {} bytes from {}", written, url);
        Ok(written)
    }
}
