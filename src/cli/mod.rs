//! Command-line interface for cc-sandbox.
//!
//! # Commands
//!
//! - `update` - Update the CLI binary and refresh local sandbox images
//! - `env` - Show the detected container environment
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - Debug logging
//! - `--quiet` / `-q` - Errors only
//! - `--config` / `-c` - Alternative config file
//!
//! Logging goes to stderr. `RUST_LOG` overrides the level chosen by the
//! flags, and `CC_SANDBOX_DEBUG=1` forces debug output.

mod env;
mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::GlobalConfig;

pub use env::EnvCommand;
pub use update::UpdateCommand;

/// Environment variable that forces debug logging.
pub const DEBUG_ENV: &str = "CC_SANDBOX_DEBUG";

/// Main CLI structure.
#[derive(Parser, Debug)]
#[command(
    name = "cc-sandbox",
    about = "Run Claude Code in an isolated container sandbox",
    version = crate::constants::VERSION,
    long_about = "cc-sandbox launches a containerized development sandbox. \
                  The `update` command keeps the CLI and its images current."
)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to an alternative config file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Update the cc-sandbox CLI and refresh local images
    Update(UpdateCommand),

    /// Show detected container engine, rootless mode and socket
    Env(EnvCommand),
}

impl Cli {
    /// Initialize logging, load configuration and run the subcommand.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.log_level());

        let config = GlobalConfig::load(self.config.as_deref()).await?;

        match self.command {
            Commands::Update(cmd) => cmd.execute(&config).await,
            Commands::Env(cmd) => cmd.execute(&config).await,
        }
    }

    /// Log directive selected by the global flags.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.verbose || debug_forced(|key| std::env::var(key).ok()) {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Whether `CC_SANDBOX_DEBUG` asks for debug logging.
fn debug_forced(lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup(DEBUG_ENV).is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes"))
}

/// Install the stderr subscriber. `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
