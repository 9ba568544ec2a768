//! User configuration for cc-sandbox
//!
//! # Location
//!
//! - Unix/macOS: `~/.cc-sandbox/config.toml`
//! - Windows: `%LOCALAPPDATA%\cc-sandbox\config.toml`
//!
//! `CC_SANDBOX_CONFIG` points at another file. A missing file means defaults.
//!
//! # Example
//!
//! ```toml
//! registry = "ghcr.io/luwojtaszek"
//! runtime = "auto"                     # auto | docker | podman
//! docker_socket = "~/.colima/default/docker.sock"
//! root = false
//!
//! [update]
//! repository = "luwojtaszek/cc-sandbox"
//! api_url = "https://api.github.com"
//! download_url = "https://github.com"
//! timeout_secs = 120                   # unset: no timeout
//! skip_images = true
//! ```
//!
//! # Environment overrides
//!
//! Applied after the file is read:
//!
//! | Variable | Field |
//! |---|---|
//! | `CC_SANDBOX_REGISTRY` | `registry` |
//! | `CC_SANDBOX_RUNTIME` | `runtime` |
//! | `CC_SANDBOX_DOCKER_SOCKET` | `docker_socket` |
//! | `CC_SANDBOX_ROOT` | `root` (`true/yes/1`, `false/no/0`, `auto`) |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_DOWNLOAD_URL, DEFAULT_REGISTRY, RELEASE_REPOSITORY, TOOL_NAME,
};
use crate::engine::RuntimePreference;
use crate::engine::runtime::parse_root_flag;
use crate::upgrade::ReleaseSource;
use crate::utils::platform::{expand_path, get_home_dir};

/// Environment variable pointing at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "CC_SANDBOX_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Registry prefix of the sandbox images
    pub registry: String,

    /// Preferred container engine
    pub runtime: RuntimePreference,

    /// Docker socket to mount instead of the detected one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_socket: Option<PathBuf>,

    /// Force root mode on or off; unset means detect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<bool>,

    /// Self-update settings
    pub update: UpdateSettings,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            runtime: RuntimePreference::Auto,
            docker_socket: None,
            root: None,
            update: UpdateSettings::default(),
        }
    }
}

/// The `[update]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateSettings {
    /// `owner/name` of the release repository
    pub repository: String,

    /// Base URL of the releases API
    pub api_url: String,

    /// Base URL release assets are downloaded from
    pub download_url: String,

    /// Per-request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Never update the binary
    pub skip_cli: bool,

    /// Never refresh images
    pub skip_images: bool,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            repository: RELEASE_REPOSITORY.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            timeout_secs: None,
            skip_cli: false,
            skip_images: false,
        }
    }
}

impl UpdateSettings {
    /// Release coordinates for the orchestrator.
    #[must_use]
    pub fn release_source(&self) -> ReleaseSource {
        ReleaseSource {
            repository: self.repository.clone(),
            api_url: self.api_url.clone(),
            download_url: self.download_url.clone(),
        }
    }

    /// HTTP timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl GlobalConfig {
    /// Default config file location.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join(TOOL_NAME)
        } else {
            get_home_dir()?.join(format!(".{TOOL_NAME}"))
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path`, `$CC_SANDBOX_CONFIG`, or the default location, then
    /// apply environment overrides.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(CONFIG_PATH_ENV) {
                Some(path) => PathBuf::from(path),
                None => Self::default_path()?,
            },
        };

        let mut config = if path.exists() {
            Self::load_from(&path).await?
        } else {
            debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load a config file without environment overrides.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        if let Some(socket) = &config.docker_socket {
            config.docker_socket = Some(expand_path(&socket.to_string_lossy()));
        }
        Ok(config)
    }

    /// Apply `CC_SANDBOX_*` overrides read through `lookup`.
    ///
    /// Unparseable runtime values are ignored with a warning.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(registry) = lookup("CC_SANDBOX_REGISTRY").filter(|v| !v.is_empty()) {
            self.registry = registry;
        }

        if let Some(runtime) = lookup("CC_SANDBOX_RUNTIME") {
            match runtime.parse() {
                Ok(preference) => self.runtime = preference,
                Err(e) => warn!("Ignoring CC_SANDBOX_RUNTIME: {}", e),
            }
        }

        if let Some(socket) = lookup("CC_SANDBOX_DOCKER_SOCKET").filter(|v| !v.is_empty()) {
            self.docker_socket = Some(expand_path(&socket));
        }

        if let Some(root) = lookup("CC_SANDBOX_ROOT") {
            self.root = parse_root_flag(&root);
        }
    }
}
