//! Global constants used throughout the cc-sandbox codebase.
//!
//! Names, registry locations and release coordinates that several modules
//! share. Defining them centrally keeps the image matcher, the updater and
//! the engine probes in agreement.

/// Name of the tool. Used as the image repository name and as the prefix of
/// published release artifacts (`cc-sandbox-linux-amd64`, ...).
pub const TOOL_NAME: &str = "cc-sandbox";

/// Version marker for builds that were not produced by the release pipeline.
///
/// A binary reporting this version never self-updates.
pub const DEV_VERSION: &str = "dev";

/// Version of the running binary.
///
/// Release builds set `CC_SANDBOX_VERSION` at compile time (e.g. `v1.4.0`);
/// local builds report [`DEV_VERSION`].
pub const VERSION: &str = match option_env!("CC_SANDBOX_VERSION") {
    Some(version) => version,
    None => DEV_VERSION,
};

/// Container registry that hosts the published sandbox images.
pub const DEFAULT_REGISTRY: &str = "ghcr.io/luwojtaszek";

/// GitHub repository that publishes releases of the CLI.
pub const RELEASE_REPOSITORY: &str = "luwojtaszek/cc-sandbox";

/// Base URL of the GitHub REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Base URL release assets are downloaded from.
pub const DEFAULT_DOWNLOAD_URL: &str = "https://github.com";

/// Name of the checksum manifest published with every release.
pub const CHECKSUM_MANIFEST_NAME: &str = "checksums.txt";

/// Image tags published for the sandbox image.
pub const KNOWN_IMAGE_TAGS: &[&str] = &["base", "docker", "bun-full"];

/// Docker engine binary.
pub const RUNTIME_DOCKER: &str = "docker";

/// Podman engine binary.
pub const RUNTIME_PODMAN: &str = "podman";

/// Socket used by a system-wide docker daemon.
pub const SYSTEM_DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Suffix appended to the executable name when it is moved aside during an update.
pub const BACKUP_SUFFIX: &str = ".old";
