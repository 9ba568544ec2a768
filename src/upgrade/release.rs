//! Latest-release lookup.
//!
//! [`ReleaseOracle`] asks the GitHub releases API for the newest published
//! release and returns its tag. One request per call, no retries: callers
//! decide what a failure means.

use serde::Deserialize;
use tracing::debug;

use super::http::{Transport, TransportError};
use crate::core::ReleaseError;

/// The subset of a GitHub release object the updater reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseDescriptor {
    /// Release tag, e.g. `v1.4.0`
    pub tag_name: String,
}

/// Queries a release index for the latest version tag.
pub struct ReleaseOracle<'a, T> {
    transport: &'a T,
    endpoint: String,
}

impl<'a, T: Transport> ReleaseOracle<'a, T> {
    /// Oracle for `{api_url}/repos/{repository}/releases/latest`.
    pub fn new(transport: &'a T, api_url: &str, repository: &str) -> Self {
        Self {
            transport,
            endpoint: latest_release_url(api_url, repository),
        }
    }

    /// Endpoint this oracle queries.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the latest release.
    pub async fn latest_release(&self) -> Result<ReleaseDescriptor, ReleaseError> {
        debug!("Fetching latest release from {}", self.endpoint);

        let body = self.transport.get_text(&self.endpoint).await.map_err(|e| match e {
            TransportError::Status(status) => ReleaseError::Http {
                url: self.endpoint.clone(),
                status,
            },
            TransportError::Network(reason) | TransportError::Write(reason) => {
                ReleaseError::Network {
                    url: self.endpoint.clone(),
                    reason,
                }
            }
        })?;

        let release: ReleaseDescriptor =
            serde_json::from_str(&body).map_err(|e| ReleaseError::Decode {
                url: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        debug!("Latest release tag: {}", release.tag_name);
        Ok(release)
    }

    /// Fetch the latest release tag.
    pub async fn latest_tag(&self) -> Result<String, ReleaseError> {
        Ok(self.latest_release().await?.tag_name)
    }
}

/// URL of the "latest release" endpoint for `repository`.
#[must_use]
pub fn latest_release_url(api_url: &str, repository: &str) -> String {
    format!("{}/repos/{repository}/releases/latest", api_url.trim_end_matches('/'))
}

/// URL of a release asset.
#[must_use]
pub fn asset_url(download_url: &str, repository: &str, tag: &str, asset: &str) -> String {
    format!(
        "{}/{repository}/releases/download/{tag}/{asset}",
        download_url.trim_end_matches('/')
    )
}
