//! Container engine integration.
//!
//! - [`command`]: subprocess builder for `docker`/`podman`
//! - [`probe`]: cached environment detection
//! - [`runtime`]: engine selection and root-mode decisions built on the probe
//!
//! [`ContainerEngine`] is the narrow interface the updater needs to refresh
//! images; [`CliEngine`] implements it by shelling out to the engine binary.

pub mod command;
pub mod probe;
pub mod runtime;

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::core::EngineError;
use crate::image::parse_image_listing;
use command::EngineCommand;

pub use probe::{CommandRunner, EnvironmentProbe, SystemRunner, global_probe};
pub use runtime::{RuntimeKind, RuntimePreference};

/// Image operations used by the update command.
pub trait ContainerEngine: Send + Sync {
    /// Engine binary name, for messages.
    fn name(&self) -> &str;

    /// Whether the engine binary can be found on `PATH`.
    fn is_installed(&self) -> bool;

    /// Locally present images as `repository:tag`, without dangling rows.
    fn list_images(&self) -> impl Future<Output = Result<Vec<String>, EngineError>> + Send;

    /// Pull `image` from its registry.
    fn pull(&self, image: &str) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// [`ContainerEngine`] backed by the engine's command-line interface.
#[derive(Debug, Clone)]
pub struct CliEngine {
    binary: String,
    list_timeout: Option<Duration>,
}

impl CliEngine {
    /// Engine driven through `binary` (e.g. `docker`).
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            list_timeout: None,
        }
    }

    /// Engine for a selected runtime.
    pub fn for_runtime(kind: RuntimeKind) -> Self {
        Self::new(kind.binary())
    }

    /// Bound how long `images` may take. Pulls are never bounded.
    pub const fn with_list_timeout(mut self, duration: Option<Duration>) -> Self {
        self.list_timeout = duration;
        self
    }
}

impl ContainerEngine for CliEngine {
    fn name(&self) -> &str {
        &self.binary
    }

    fn is_installed(&self) -> bool {
        match which::which(&self.binary) {
            Ok(path) => {
                debug!("Found {} at {}", self.binary, path.display());
                true
            }
            Err(_) => false,
        }
    }

    async fn list_images(&self) -> Result<Vec<String>, EngineError> {
        let output = EngineCommand::new(&self.binary)
            .args(["images", "--format", "{{.Repository}}:{{.Tag}}"])
            .with_timeout(self.list_timeout)
            .execute()
            .await?;
        Ok(parse_image_listing(&output.stdout))
    }

    async fn pull(&self, image: &str) -> Result<(), EngineError> {
        EngineCommand::new(&self.binary).args(["pull", image]).inherit_output().execute().await?;
        Ok(())
    }
}
