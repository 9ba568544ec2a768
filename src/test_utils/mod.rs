//! Test utilities for cc-sandbox
//!
//! In-memory stand-ins for everything the update flow and the environment
//! probe touch outside the process, so tests never need the network or a
//! container engine:
//!
//! - [`FakeTransport`]: canned HTTP bodies and statuses keyed by URL
//! - [`FakeEngine`]: image listing and pulls
//! - [`ScriptedRunner`]: canned subprocess output with call counting
//! - [`RecordingReporter`]: captures status lines
//!
//! # Example
//!
//! ```rust,no_run
//! use cc_sandbox::test_utils::{FakeTransport, sha256_hex};
//!
//! let bytes = b"binary".to_vec();
//! let transport = FakeTransport::new()
//!     .serve("https://example.test/checksums.txt", format!("{}  cc-sandbox-linux-amd64", sha256_hex(&bytes)))
//!     .serve("https://example.test/cc-sandbox-linux-amd64", bytes);
//! ```

pub mod fakes;
pub mod runner;

pub use fakes::{FakeEngine, FakeTransport, RecordingReporter};
pub use runner::ScriptedRunner;

use sha2::{Digest, Sha256};
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG` if set, otherwise leaves logging off.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Lower-case hex SHA-256 of `bytes`, for building checksum manifests.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
