//! Core types shared across cc-sandbox.
//!
//! Currently this is the error taxonomy used by the updater and the engine
//! layer, plus the user-facing error formatting used by `main`.

pub mod error;

pub use error::{
    DownloadError, EngineError, ErrorContext, ReleaseError, ReplaceError, UpdateError,
    user_friendly_error,
};
