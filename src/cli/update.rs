//! Update the cc-sandbox binary and refresh its container images.
//!
//! # Examples
//!
//! ```bash
//! # Update everything
//! cc-sandbox update
//!
//! # Only refresh images
//! cc-sandbox update --skip-cli
//!
//! # Reinstall the latest release even if already current
//! cc-sandbox update --force
//!
//! # Show current and latest versions without installing
//! cc-sandbox update --check
//! ```
//!
//! Only images that are already present locally are refreshed. The command
//! exits successfully even when a phase fails; failures are printed as
//! `[ERROR]` lines.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::GlobalConfig;
use crate::engine::runtime::select_runtime;
use crate::engine::{
    CliEngine, CommandRunner, EnvironmentProbe, RuntimeKind, RuntimePreference, global_probe,
};
use crate::image::ImageCatalog;
use crate::upgrade::version_check::{format_version_info, is_dev_version};
use crate::upgrade::{
    ConsoleReporter, PlatformReplacer, ReqwestTransport, UpdateOptions, UpdateOrchestrator,
};

/// Arguments of `cc-sandbox update`.
#[derive(Args, Debug, Default)]
pub struct UpdateCommand {
    /// Skip updating the CLI binary
    #[arg(long)]
    pub skip_cli: bool,

    /// Skip refreshing container images
    #[arg(long)]
    pub skip_images: bool,

    /// Reinstall even when already at the latest version
    #[arg(short, long)]
    pub force: bool,

    /// Only report whether a newer version is published
    #[arg(long, conflicts_with_all = ["skip_cli", "skip_images", "force"])]
    pub check: bool,
}

impl UpdateCommand {
    /// Effective options: either the flag or the config file can skip a phase.
    #[must_use]
    pub fn options(&self, config: &GlobalConfig) -> UpdateOptions {
        UpdateOptions {
            skip_cli: self.skip_cli || config.update.skip_cli,
            skip_images: self.skip_images || config.update.skip_images,
            force: self.force,
        }
    }

    /// Run the update.
    pub async fn execute(&self, config: &GlobalConfig) -> Result<()> {
        let transport = ReqwestTransport::new(config.update.timeout())?;
        let options = self.options(config);
        let images_needed = !self.check && !options.skip_images;
        let runtime = image_runtime(images_needed, config.runtime, global_probe()).await;
        let engine = CliEngine::for_runtime(runtime).with_list_timeout(config.update.timeout());

        let orchestrator = UpdateOrchestrator::new(&transport, &engine, PlatformReplacer::default())
            .with_source(config.update.release_source())
            .with_catalog(ImageCatalog::new(&config.registry));

        if self.check {
            println!("{}", "Checking for updates...".cyan());
            let pair = orchestrator.check().await?;
            let show_latest = pair.needs_update() || is_dev_version(pair.current());
            let latest = show_latest.then(|| pair.latest());
            println!("{}", format_version_info(pair.current(), latest));
            return Ok(());
        }

        let reporter = ConsoleReporter;
        reporter.banner("cc-sandbox updater");
        orchestrator.run(&options, &reporter).await;
        Ok(())
    }
}

/// Engine used for the image phase. Nothing is probed unless that phase runs;
/// otherwise the docker default is returned untouched.
async fn image_runtime<R: CommandRunner>(
    images_needed: bool,
    preference: RuntimePreference,
    probe: &EnvironmentProbe<R>,
) -> RuntimeKind {
    if !images_needed {
        return RuntimeKind::Docker;
    }
    select_runtime(preference, probe).await
}
