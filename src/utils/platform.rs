//! Platform-specific helpers.
//!
//! Release artifacts are named after the identifiers used by the release
//! pipeline (`linux`, `darwin`, `windows` / `amd64`, `arm64`), which differ from
//! Rust's [`std::env::consts`] values. This module owns that mapping as well as
//! home-directory and path-expansion helpers used by the config and probe code.

use anyhow::Result;
use std::path::PathBuf;

use crate::constants::TOOL_NAME;
use crate::core::UpdateError;

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Gets the home directory path for the current user.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Expand a leading `~` and environment variables in a user-supplied path.
///
/// Falls back to the input unchanged when expansion fails (e.g. an unset
/// variable), so a typo surfaces later as a missing file rather than a panic.
#[must_use]
pub fn expand_path(input: &str) -> PathBuf {
    match shellexpand::full(input) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(input).as_ref()),
    }
}

/// Map a Rust target OS name to the release artifact identifier.
#[must_use]
pub fn release_os(os: &str) -> Option<&'static str> {
    match os {
        "linux" => Some("linux"),
        "macos" => Some("darwin"),
        "windows" => Some("windows"),
        _ => None,
    }
}

/// Map a Rust target architecture name to the release artifact identifier.
#[must_use]
pub fn release_arch(arch: &str) -> Option<&'static str> {
    match arch {
        "x86_64" => Some("amd64"),
        "aarch64" => Some("arm64"),
        _ => None,
    }
}

/// Release identifiers for the host, or [`UpdateError::UnsupportedPlatform`].
pub fn release_platform() -> Result<(&'static str, &'static str), UpdateError> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    match (release_os(os), release_arch(arch)) {
        (Some(os), Some(arch)) => Ok((os, arch)),
        _ => Err(UpdateError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        }),
    }
}

/// Artifact filename for a release platform: `<tool>-<os>-<arch>[.exe]`.
///
/// The `.exe` suffix is only added for `windows`.
#[must_use]
pub fn artifact_filename(os: &str, arch: &str) -> String {
    let suffix = if os == "windows" { ".exe" } else { "" };
    format!("{TOOL_NAME}-{os}-{arch}{suffix}")
}

/// Artifact filename for the host platform.
pub fn host_artifact_filename() -> Result<String, UpdateError> {
    let (os, arch) = release_platform()?;
    Ok(artifact_filename(os, arch))
}
