//! Memoized detection of the host container environment.
//!
//! Each detector runs its subprocesses and filesystem checks at most once per
//! [`EnvironmentProbe`]. Results live in `tokio::sync::OnceCell`s: the first
//! caller runs the detection while concurrent callers wait on the same cell,
//! so a predicate never spawns duplicate engine processes. Cached values are
//! never invalidated.
//!
//! Detection is advisory. Missing binaries, non-zero exits and I/O errors all
//! collapse to a negative result and are only logged at debug level.
//!
//! Most callers use the process-wide instance from [`global_probe`].

use dashmap::DashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;
use tracing::debug;

use super::command::EngineCommand;
use crate::constants::{RUNTIME_DOCKER, RUNTIME_PODMAN, SYSTEM_DOCKER_SOCKET};
use crate::core::EngineError;

/// Sockets that only exist when docker runs rootless, relative to `$HOME`.
const ROOTLESS_SOCKETS: &[&str] = &[".docker/run/docker.sock", ".local/share/docker/run/docker.sock"];

/// Candidate docker sockets relative to `$HOME`, checked after the system socket.
const USER_DOCKER_SOCKETS: &[&str] = &[".orbstack/run/docker.sock", ".docker/run/docker.sock"];

/// Marker reported in `docker info` security options by rootless daemons.
const ROOTLESS_MARKER: &str = "rootless";

/// Runs external commands for the probe.
///
/// Implemented by [`SystemRunner`] for real processes; tests substitute a
/// scripted runner to count invocations.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, returning stdout when it exits successfully.
    fn run(
        &self,
        program: &str,
        args: &[&str],
    ) -> impl Future<Output = Result<String, EngineError>> + Send;
}

/// [`CommandRunner`] that spawns real processes through [`EngineCommand`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, EngineError> {
        EngineCommand::new(program)
            .args(args.iter().copied())
            .execute()
            .await
            .map(|output| output.stdout)
    }
}

type Cells = DashMap<String, Arc<OnceCell<bool>>>;

/// Cached environment detectors.
pub struct EnvironmentProbe<R = SystemRunner> {
    runner: R,
    home: Option<PathBuf>,
    engines: Cells,
    hosts: Cells,
    rootless: OnceCell<bool>,
    docker_socket: OnceLock<PathBuf>,
}

impl EnvironmentProbe<SystemRunner> {
    /// Probe backed by real processes and the current user's home directory.
    pub fn system() -> Self {
        Self::new(SystemRunner, dirs::home_dir())
    }
}

impl<R: CommandRunner> EnvironmentProbe<R> {
    /// Probe using `runner` for subprocesses and `home` for socket lookups.
    pub fn new(runner: R, home: Option<PathBuf>) -> Self {
        Self {
            runner,
            home,
            engines: DashMap::new(),
            hosts: DashMap::new(),
            rootless: OnceCell::new(),
            docker_socket: OnceLock::new(),
        }
    }

    /// The runner used for subprocesses.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn cell(cells: &Cells, key: &str) -> Arc<OnceCell<bool>> {
        Arc::clone(&cells.entry(key.to_string()).or_default())
    }

    /// Whether `engine --version` runs and exits successfully.
    pub async fn engine_available(&self, engine: &str) -> bool {
        let cell = Self::cell(&self.engines, engine);
        *cell
            .get_or_init(|| async {
                let available = self.runner.run(engine, &["--version"]).await.is_ok();
                debug!("Engine {} available: {}", engine, available);
                available
            })
            .await
    }

    /// Whether docker is installed and answering.
    pub async fn docker_available(&self) -> bool {
        self.engine_available(RUNTIME_DOCKER).await
    }

    /// Whether podman is installed and answering.
    pub async fn podman_available(&self) -> bool {
        self.engine_available(RUNTIME_PODMAN).await
    }

    /// Whether the docker daemon runs in rootless mode.
    ///
    /// Checks the daemon's security options for a `rootless` marker first, then
    /// falls back to the presence of a rootless socket under the home directory.
    /// Always `false` on Windows.
    pub async fn rootless_mode(&self) -> bool {
        *self
            .rootless
            .get_or_init(|| async {
                let rootless = self.detect_rootless().await;
                debug!("Rootless docker: {}", rootless);
                rootless
            })
            .await
    }

    async fn detect_rootless(&self) -> bool {
        if cfg!(windows) {
            return false;
        }

        if let Ok(options) =
            self.runner.run(RUNTIME_DOCKER, &["info", "--format", "{{.SecurityOptions}}"]).await
            && options.contains(ROOTLESS_MARKER)
        {
            return true;
        }

        let Some(home) = &self.home else {
            return false;
        };
        ROOTLESS_SOCKETS.iter().any(|socket| is_socket_file(&home.join(socket)))
    }

    /// Whether docker is served by the virtualization host `name` (e.g. `orbstack`).
    ///
    /// Matches `name` case-insensitively against the docker socket path, then
    /// against the operating system reported by `docker info`.
    pub async fn virtualization_host_is(&self, name: &str) -> bool {
        let needle = name.to_lowercase();
        let cell = Self::cell(&self.hosts, &needle);
        *cell
            .get_or_init(|| async {
                let matched = self.detect_virtualization_host(&needle).await;
                debug!("Virtualization host {}: {}", needle, matched);
                matched
            })
            .await
    }

    async fn detect_virtualization_host(&self, needle: &str) -> bool {
        if self.docker_socket().to_string_lossy().to_lowercase().contains(needle) {
            return true;
        }

        match self.runner.run(RUNTIME_DOCKER, &["info", "--format", "{{.OperatingSystem}}"]).await
        {
            Ok(os) => os.to_lowercase().contains(needle),
            Err(e) => {
                debug!("docker info unavailable for host detection: {}", e);
                false
            }
        }
    }

    /// Whether docker runs inside OrbStack (macOS).
    pub async fn is_orbstack(&self) -> bool {
        self.virtualization_host_is("orbstack").await
    }

    /// Auto-detected docker socket.
    ///
    /// The first existing of the system socket, the OrbStack socket and the
    /// Docker Desktop user socket; the system socket path when none exist.
    pub fn docker_socket(&self) -> &Path {
        self.docker_socket.get_or_init(|| {
            let mut candidates = vec![PathBuf::from(SYSTEM_DOCKER_SOCKET)];
            if let Some(home) = &self.home {
                candidates.extend(USER_DOCKER_SOCKETS.iter().map(|socket| home.join(socket)));
            }
            candidates
                .into_iter()
                .find(|candidate| is_socket_file(candidate))
                .unwrap_or_else(|| PathBuf::from(SYSTEM_DOCKER_SOCKET))
        })
    }
}

fn is_socket_file(path: &Path) -> bool {
    path.exists() && !path.is_dir()
}

static GLOBAL_PROBE: OnceLock<EnvironmentProbe> = OnceLock::new();

/// Process-wide probe, created on first use.
pub fn global_probe() -> &'static EnvironmentProbe {
    GLOBAL_PROBE.get_or_init(EnvironmentProbe::system)
}
