//! Self-update for the cc-sandbox binary and refresh of its container images.
//!
//! # Architecture Overview
//!
//! - **[`ReleaseOracle`]**: asks the release index for the latest tag
//! - **[`VersionPair`]**: decides whether that tag is an update
//! - **[`ChecksumVerifiedDownloader`]**: downloads the platform artifact and
//!   proves it matches `checksums.txt`, yielding a [`VerifiedArtifact`]
//! - **[`BinaryReplacer`]**: installs a [`VerifiedArtifact`] over the running
//!   executable ([`DirectRename`] on POSIX, [`BackupThenRename`] on Windows)
//! - **[`UpdateOrchestrator`]**: runs the CLI phase and the image phase and
//!   turns their failures into status lines
//!
//! ## Update Process Flow
//!
//! ```text
//! 1. CLI phase (unless --skip-cli)
//!    ├── GET {api}/repos/{repo}/releases/latest
//!    ├── dev build → skip; not newer and not --force → already current
//!    ├── download checksums.txt, look up cc-sandbox-<os>-<arch>[.exe]
//!    ├── download the artifact, SHA-256 it, delete it on mismatch
//!    └── rename it over the executable (backup first on Windows)
//!
//! 2. Image phase (unless --skip-images)
//!    ├── engine missing → skip
//!    ├── list local images, keep known sandbox tags
//!    └── pull each registry image once, continuing past failures
//! ```
//!
//! No network call is retried. A checksum mismatch is never installed.

/// Moving the running executable aside and cleaning up old backups.
pub mod backup;
/// HTTP transport abstraction.
pub mod http;
/// The two-phase update workflow.
pub mod orchestrator;
/// Latest-release lookup.
pub mod release;
/// Installing a verified artifact over the running executable.
pub mod replace;
/// Status output.
pub mod report;
/// Checksum manifests and verified downloads.
pub mod verification;
/// Version normalization and comparison.
pub mod version_check;


pub use http::{ReqwestTransport, Transport, TransportError};
pub use orchestrator::{
    CliOutcome, ImagesOutcome, ReleaseSource, UpdateOptions, UpdateOrchestrator, UpdateSummary,
};
pub use release::{ReleaseDescriptor, ReleaseOracle};
pub use replace::{BackupThenRename, BinaryReplacer, DirectRename, PlatformReplacer};
pub use report::{ConsoleReporter, Reporter, Status};
pub use verification::{
    ChecksumManifest, ChecksumVerifiedDownloader, ChecksumVerifier, ManifestEntry,
    VerifiedArtifact,
};
pub use version_check::{VersionComparison, VersionPair};
