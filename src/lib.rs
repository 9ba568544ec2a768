//! cc-sandbox - run Claude Code in a container sandbox
//!
//! This library backs the `cc-sandbox` binary. It covers the parts of the tool
//! that need care beyond assembling `docker run` arguments:
//!
//! - **Self-update** ([`upgrade`]): find the latest release, download the
//!   platform artifact, verify it against the published SHA-256 manifest and
//!   atomically replace the running executable; then re-pull local sandbox
//!   images.
//! - **Environment detection** ([`engine`]): memoized probes for engine
//!   availability, rootless docker and the virtualization host, plus the
//!   runtime, root-mode and socket decisions built on them.
//!
//! # Modules
//!
//! - [`cli`] - `clap` command surface (`update`, `env`)
//! - [`config`] - `~/.cc-sandbox/config.toml` and `CC_SANDBOX_*` overrides
//! - [`constants`] - Names, registry and release coordinates
//! - [`core`] - Error types and user-facing error formatting
//! - [`engine`] - Container engine commands and environment probes
//! - [`image`] - Sandbox image naming and refresh selection
//! - [`upgrade`] - Self-update workflow
//! - [`utils`] - Platform helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use cc_sandbox::engine::{CliEngine, RuntimeKind};
//! use cc_sandbox::upgrade::{
//!     ConsoleReporter, PlatformReplacer, ReqwestTransport, UpdateOptions, UpdateOrchestrator,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let transport = ReqwestTransport::new(None)?;
//! let engine = CliEngine::for_runtime(RuntimeKind::Docker);
//! let summary = UpdateOrchestrator::new(&transport, &engine, PlatformReplacer::default())
//!     .run(&UpdateOptions::default(), &ConsoleReporter)
//!     .await;
//! println!("changed: {}", summary.changed());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod engine;
pub mod image;
pub mod upgrade;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
