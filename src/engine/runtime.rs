//! Runtime decisions derived from the environment probe.
//!
//! These are the inputs the container launcher consumes: which engine binary
//! to invoke, whether the container should keep running as root, and which
//! docker socket to mount.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use super::probe::{CommandRunner, EnvironmentProbe};
use crate::constants::{RUNTIME_DOCKER, RUNTIME_PODMAN};

/// Container engine used to run the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    /// `docker`
    Docker,
    /// `podman`
    Podman,
}

impl RuntimeKind {
    /// Engine binary name.
    #[must_use]
    pub const fn binary(self) -> &'static str {
        match self {
            Self::Docker => RUNTIME_DOCKER,
            Self::Podman => RUNTIME_PODMAN,
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// User preference for the container engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimePreference {
    /// Pick based on what is installed
    #[default]
    Auto,
    /// Always docker
    Docker,
    /// Always podman
    Podman,
}

impl FromStr for RuntimePreference {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            other => Err(format!("unknown runtime '{other}' (expected auto, docker or podman)")),
        }
    }
}

/// Resolve the engine to use.
///
/// `Auto` selects podman only when podman is available and docker is not. The
/// two availability probes are independent and run concurrently.
pub async fn select_runtime<R: CommandRunner>(
    preference: RuntimePreference,
    probe: &EnvironmentProbe<R>,
) -> RuntimeKind {
    match preference {
        RuntimePreference::Docker => RuntimeKind::Docker,
        RuntimePreference::Podman => RuntimeKind::Podman,
        RuntimePreference::Auto => {
            let (podman, docker) = tokio::join!(probe.podman_available(), probe.docker_available());
            debug!("Runtime auto-detection: podman={}, docker={}", podman, docker);
            if podman && !docker {
                RuntimeKind::Podman
            } else {
                RuntimeKind::Docker
            }
        }
    }
}

/// Parse a root-mode flag: `true|yes|1`, `false|no|0`, anything else means auto.
#[must_use]
pub fn parse_root_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Whether the container should skip dropping privileges.
///
/// An explicit override wins. Podman maps the user with `--userns=keep-id` and
/// OrbStack behaves like rootful docker, so neither needs root mode; otherwise
/// root mode follows rootless-docker detection.
pub async fn should_use_root_mode<R: CommandRunner>(
    root_override: Option<bool>,
    runtime: RuntimeKind,
    probe: &EnvironmentProbe<R>,
) -> bool {
    if let Some(root) = root_override {
        return root;
    }
    if runtime == RuntimeKind::Podman {
        return false;
    }
    if probe.is_orbstack().await {
        return false;
    }
    probe.rootless_mode().await
}

/// Docker socket to mount: the configured path, or the auto-detected one.
#[must_use]
pub fn resolve_docker_socket<R: CommandRunner>(
    configured: Option<&Path>,
    probe: &EnvironmentProbe<R>,
) -> PathBuf {
    configured.map_or_else(|| probe.docker_socket().to_path_buf(), Path::to_path_buf)
}
