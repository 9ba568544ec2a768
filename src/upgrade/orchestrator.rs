//! The `update` workflow.
//!
//! [`UpdateOrchestrator`] runs two independent phases:
//!
//! 1. **CLI update**: latest tag → version comparison → verified download →
//!    platform replacement.
//! 2. **Image refresh**: re-pull every locally present sandbox image from the
//!    registry.
//!
//! This is the only place where errors become soft. A failing phase is
//! reported as an `[ERROR]` line and the next phase still runs; [`run`]
//! itself cannot fail.
//!
//! [`run`]: UpdateOrchestrator::run

use std::path::PathBuf;
use tracing::{debug, warn};

use super::http::Transport;
use super::release::{ReleaseOracle, asset_url};
use super::replace::BinaryReplacer;
use super::report::{Reporter, Status};
use super::verification::ChecksumVerifiedDownloader;
use super::version_check::{VersionPair, is_dev_version};
use crate::constants::{
    CHECKSUM_MANIFEST_NAME, DEFAULT_API_URL, DEFAULT_DOWNLOAD_URL, RELEASE_REPOSITORY, VERSION,
};
use crate::core::UpdateError;
use crate::engine::ContainerEngine;
use crate::image::ImageCatalog;
use crate::utils::platform::host_artifact_filename;

/// Where releases are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    /// `owner/name` of the repository
    pub repository: String,
    /// Base URL of the releases API
    pub api_url: String,
    /// Base URL assets are downloaded from
    pub download_url: String,
}

impl Default for ReleaseSource {
    fn default() -> Self {
        Self {
            repository: RELEASE_REPOSITORY.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
        }
    }
}

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Do not touch the CLI binary
    pub skip_cli: bool,
    /// Do not refresh images
    pub skip_images: bool,
    /// Reinstall even when already at the latest version
    pub force: bool,
}

/// What the CLI phase did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliOutcome {
    /// Phase disabled
    Skipped,
    /// Running a development build
    DevBuild,
    /// Nothing newer was published
    AlreadyCurrent {
        /// Running version
        version: String,
    },
    /// The new binary was installed
    Updated {
        /// Installed release tag
        version: String,
    },
    /// The phase failed; the message was reported
    Failed(String),
}

impl CliOutcome {
    /// Whether the binary on disk changed.
    #[must_use]
    pub const fn changed(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// What the image phase did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagesOutcome {
    /// Phase disabled
    Skipped,
    /// The engine binary is not installed
    EngineMissing,
    /// Images were considered for refresh
    Refreshed {
        /// Registry images pulled successfully
        updated: Vec<String>,
        /// Registry images whose pull failed
        failed: Vec<String>,
    },
    /// Listing local images failed; the message was reported
    Failed(String),
}

impl ImagesOutcome {
    /// Whether at least one image was pulled.
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self, Self::Refreshed { updated, .. } if !updated.is_empty())
    }
}

/// Result of a full `update` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    /// CLI phase
    pub cli: CliOutcome,
    /// Image phase
    pub images: ImagesOutcome,
}

impl UpdateSummary {
    /// Whether either phase changed something.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.cli.changed() || self.images.changed()
    }
}

/// Sequences the CLI update and the image refresh.
///
/// Generic over its collaborators so the whole flow can run against fakes:
///
/// - `T`: [`Transport`] for the release index and downloads
/// - `E`: [`ContainerEngine`] for listing and pulling images
/// - `B`: [`BinaryReplacer`], normally [`PlatformReplacer`](super::replace::PlatformReplacer)
pub struct UpdateOrchestrator<'a, T, E, B> {
    transport: &'a T,
    engine: &'a E,
    replacer: B,
    source: ReleaseSource,
    catalog: ImageCatalog,
    current_version: String,
    executable: Option<PathBuf>,
    temp_dir: Option<PathBuf>,
}

impl<'a, T, E, B> UpdateOrchestrator<'a, T, E, B>
where
    T: Transport,
    E: ContainerEngine,
    B: BinaryReplacer,
{
    /// Orchestrator for the running binary with default release coordinates.
    pub fn new(transport: &'a T, engine: &'a E, replacer: B) -> Self {
        Self {
            transport,
            engine,
            replacer,
            source: ReleaseSource::default(),
            catalog: ImageCatalog::default(),
            current_version: VERSION.to_string(),
            executable: None,
            temp_dir: None,
        }
    }

    /// Use other release coordinates.
    #[must_use]
    pub fn with_source(mut self, source: ReleaseSource) -> Self {
        self.source = source;
        self
    }

    /// Match and pull images against `catalog`.
    #[must_use]
    pub fn with_catalog(mut self, catalog: ImageCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Pretend to be `version` instead of the compiled-in one.
    #[must_use]
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    /// Replace `path` instead of the running executable.
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Download into `dir` instead of the executable's directory.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Run both phases and report a final verdict.
    pub async fn run(&self, options: &UpdateOptions, reporter: &impl Reporter) -> UpdateSummary {
        let cli = if options.skip_cli {
            reporter.report(Status::Skip, "Skipping CLI update");
            CliOutcome::Skipped
        } else {
            self.update_cli(options.force, reporter).await
        };

        let images = if options.skip_images {
            reporter.report(Status::Skip, "Skipping image update");
            ImagesOutcome::Skipped
        } else {
            self.refresh_images(reporter).await
        };

        let summary = UpdateSummary {
            cli,
            images,
        };
        if summary.changed() {
            reporter.report(Status::Ok, "Update complete!");
        } else {
            reporter.report(Status::Info, "Everything is up to date.");
        }
        summary
    }

    /// Fetch the latest tag and pair it with the running version.
    pub async fn check(&self) -> Result<VersionPair, UpdateError> {
        let oracle =
            ReleaseOracle::new(self.transport, &self.source.api_url, &self.source.repository);
        let latest = oracle.latest_tag().await?;
        Ok(VersionPair::new(&self.current_version, &latest))
    }

    /// CLI phase. Failures are reported and returned as [`CliOutcome::Failed`].
    pub async fn update_cli(&self, force: bool, reporter: &impl Reporter) -> CliOutcome {
        reporter.report(Status::Info, "Checking for CLI updates...");
        match self.try_update_cli(force, reporter).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = format!("Failed to update CLI: {e}");
                reporter.report(Status::Error, &message);
                CliOutcome::Failed(message)
            }
        }
    }

    async fn try_update_cli(
        &self,
        force: bool,
        reporter: &impl Reporter,
    ) -> Result<CliOutcome, UpdateError> {
        let oracle =
            ReleaseOracle::new(self.transport, &self.source.api_url, &self.source.repository);
        let latest = oracle.latest_tag().await?;

        if is_dev_version(&self.current_version) {
            reporter.report(Status::Warn, "Running development version, skipping CLI update");
            return Ok(CliOutcome::DevBuild);
        }

        let pair = VersionPair::new(&self.current_version, &latest);
        if !force && !pair.needs_update() {
            reporter.report(
                Status::Ok,
                &format!("CLI is already at latest version ({})", self.current_version),
            );
            return Ok(CliOutcome::AlreadyCurrent {
                version: self.current_version.clone(),
            });
        }

        reporter.report(Status::Info, &format!("Current version: {}", self.current_version));
        reporter.report(Status::Info, &format!("Latest version:  {latest}"));
        reporter.report(Status::Info, "Downloading update...");

        let executable = self.executable_path()?;
        let filename = host_artifact_filename()?;
        let artifact_url =
            asset_url(&self.source.download_url, &self.source.repository, &latest, &filename);
        let manifest_url = asset_url(
            &self.source.download_url,
            &self.source.repository,
            &latest,
            CHECKSUM_MANIFEST_NAME,
        );

        // Download beside the executable so the final rename stays on one filesystem.
        let mut downloader = ChecksumVerifiedDownloader::new(self.transport);
        if let Some(dir) = self.temp_dir.as_deref().or_else(|| executable.parent()) {
            downloader = downloader.with_temp_dir(dir);
        }
        let artifact = downloader.fetch(&artifact_url, &manifest_url, &filename).await?;
        reporter.report(Status::Ok, "Checksum verified");

        let installed = self.replacer.replace(&executable, &artifact).await;
        artifact.discard().await;
        installed?;

        reporter.report(Status::Ok, &format!("CLI updated to {latest}"));
        Ok(CliOutcome::Updated {
            version: latest,
        })
    }

    /// Absolute, symlink-resolved path of the binary to replace.
    fn executable_path(&self) -> Result<PathBuf, UpdateError> {
        let path = match &self.executable {
            Some(path) => path.clone(),
            None => std::env::current_exe().map_err(|e| UpdateError::ExecutablePath {
                reason: e.to_string(),
            })?,
        };
        let resolved = path.canonicalize().map_err(|e| UpdateError::ExecutablePath {
            reason: format!("{}: {e}", path.display()),
        })?;
        debug!("Executable to replace: {:?}", resolved);
        Ok(resolved)
    }

    /// Image phase: pull each local sandbox image's registry equivalent once.
    pub async fn refresh_images(&self, reporter: &impl Reporter) -> ImagesOutcome {
        reporter.report(Status::Info, "Checking for image updates...");

        if !self.engine.is_installed() {
            reporter.report(
                Status::Warn,
                &format!("{} not found, skipping image updates", self.engine.name()),
            );
            return ImagesOutcome::EngineMissing;
        }

        let local = match self.engine.list_images().await {
            Ok(images) => images,
            Err(e) => {
                let message = format!("Failed to update images: failed to list local images: {e}");
                reporter.report(Status::Error, &message);
                return ImagesOutcome::Failed(message);
            }
        };

        let targets = self.catalog.refresh_targets(local.iter().map(String::as_str));
        if targets.is_empty() {
            reporter.report(Status::Info, "No cc-sandbox images found locally");
            return ImagesOutcome::Refreshed {
                updated: Vec::new(),
                failed: Vec::new(),
            };
        }
        reporter.report(
            Status::Info,
            &format!("Found {} local cc-sandbox image(s)", targets.len()),
        );

        let mut updated = Vec::new();
        let mut failed = Vec::new();
        for image in targets {
            reporter.report(Status::Info, &format!("Updating {image}..."));
            match self.engine.pull(&image).await {
                Ok(()) => {
                    reporter.report(Status::Ok, &format!("Updated {image}"));
                    updated.push(image);
                }
                Err(e) => {
                    warn!("Pull of {} failed: {}", image, e);
                    reporter.report(Status::Error, &format!("Failed to update {image}: {e}"));
                    failed.push(image);
                }
            }
        }

        ImagesOutcome::Refreshed {
            updated,
            failed,
        }
    }
}
