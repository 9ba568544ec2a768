//! Error handling for cc-sandbox
//!
//! Each component of the self-update path owns a small error enum so callers can
//! match on the exact failure:
//!
//! - [`ReleaseError`] - querying the release index
//! - [`DownloadError`] - fetching and verifying a release artifact
//! - [`ReplaceError`] - swapping the running executable
//! - [`EngineError`] - invoking the container engine CLI
//! - [`UpdateError`] - umbrella used by the update orchestrator
//!
//! At the command-line boundary errors travel as [`anyhow::Error`] and are
//! turned into an [`ErrorContext`] by [`user_friendly_error`], which adds
//! details and a suggestion before printing.

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the release index query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReleaseError {
    /// Transport-level failure (DNS, connection refused, TLS, truncated body).
    #[error("Network error while querying {url}: {reason}")]
    Network {
        /// Endpoint that was queried
        url: String,
        /// Underlying transport message
        reason: String,
    },

    /// The endpoint answered with a non-success status code.
    #[error("Release index {url} returned HTTP {status}")]
    Http {
        /// Endpoint that was queried
        url: String,
        /// Status code returned
        status: u16,
    },

    /// The response body was not the expected JSON document.
    #[error("Malformed release index response from {url}: {reason}")]
    Decode {
        /// Endpoint that was queried
        url: String,
        /// Decoder message
        reason: String,
    },
}

/// Failures while downloading and verifying a release artifact.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The checksum manifest could not be downloaded.
    #[error("Failed to download checksum manifest {url}: {reason}")]
    ManifestFetch {
        /// Manifest URL
        url: String,
        /// Transport message
        reason: String,
    },

    /// The manifest was fetched but has no row for the artifact.
    #[error("Checksum manifest has no entry for {filename}")]
    ManifestParse {
        /// Artifact filename that was looked up
        filename: String,
    },

    /// The artifact itself could not be downloaded.
    #[error("Failed to download {url}: {reason}")]
    ArtifactFetch {
        /// Artifact URL
        url: String,
        /// Transport message
        reason: String,
    },

    /// The downloaded bytes do not hash to the published digest.
    #[error("Checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Artifact filename
        filename: String,
        /// Digest published in the manifest
        expected: String,
        /// Digest of the downloaded bytes
        actual: String,
    },

    /// Local I/O failure on a temporary file.
    #[error("I/O error during {operation}: {source}")]
    Io {
        /// What was being done
        operation: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    pub(crate) fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Failures while installing a verified artifact over the running executable.
#[derive(Error, Debug)]
pub enum ReplaceError {
    /// The process is not allowed to modify the executable or its directory.
    #[error("Permission denied: {operation} {path}")]
    Permission {
        /// What was being done
        operation: String,
        /// Path that was touched
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Any other filesystem failure.
    #[error("File system error: {operation} {path}: {source}")]
    Filesystem {
        /// What was being done
        operation: String,
        /// Path that was touched
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Installing failed and moving the backup back into place failed too.
    #[error("{primary} (previous binary left at {backup})")]
    RestoreFailed {
        /// The install failure that triggered the restore
        #[source]
        primary: Box<ReplaceError>,
        /// Where the previous executable now lives
        backup: PathBuf,
    },
}

impl ReplaceError {
    /// Classify an I/O error raised while touching `path`.
    pub(crate) fn from_io(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        let operation = operation.into();
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::Permission {
                operation,
                path,
                source,
            }
        } else {
            Self::Filesystem {
                operation,
                path,
                source,
            }
        }
    }
}

/// Failures of container engine subprocesses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine binary is not installed or not on `PATH`.
    #[error("{engine} is not installed or not found in PATH")]
    NotFound {
        /// Engine binary name
        engine: String,
    },

    /// The process could not be started or waited on.
    #[error("Failed to run {engine} {operation}: {reason}")]
    Spawn {
        /// Engine binary name
        engine: String,
        /// Subcommand that was run
        operation: String,
        /// OS error message
        reason: String,
    },

    /// The process exited with a non-zero status.
    #[error("{engine} {operation} failed: {stderr}")]
    CommandFailed {
        /// Engine binary name
        engine: String,
        /// Subcommand that was run
        operation: String,
        /// Captured standard error
        stderr: String,
    },

    /// The process did not finish within the configured timeout.
    #[error("{engine} {operation} timed out after {seconds} seconds")]
    Timeout {
        /// Engine binary name
        engine: String,
        /// Subcommand that was run
        operation: String,
        /// Configured timeout
        seconds: u64,
    },
}

/// Failures of the CLI update phase.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Could not determine the latest release.
    #[error("Failed to fetch latest version: {0}")]
    Release(#[from] ReleaseError),

    /// Could not download or verify the new binary.
    #[error("Failed to download update: {0}")]
    Download(#[from] DownloadError),

    /// Could not install the new binary.
    #[error("Failed to install update: {0}")]
    Replace(#[from] ReplaceError),

    /// No release artifact is published for this host.
    #[error("Self-update is not supported on {os}/{arch}")]
    UnsupportedPlatform {
        /// Host operating system
        os: String,
        /// Host architecture
        arch: String,
    },

    /// The path of the running executable could not be resolved.
    #[error("Failed to resolve executable path: {reason}")]
    ExecutablePath {
        /// OS error message
        reason: String,
    },
}

/// An error together with optional details and a suggested fix.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error message
    pub message: String,
    /// A suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with color.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a helpful suggestion.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let message = format!("{error:#}");

    if let Some(update) = error.downcast_ref::<UpdateError>() {
        return match update {
            UpdateError::Release(ReleaseError::Http { status: 403 | 429, .. }) => {
                ErrorContext::new(message)
                    .with_details("The GitHub API rate limit for this address is exhausted")
                    .with_suggestion("Wait a few minutes and try again")
            }
            UpdateError::Release(ReleaseError::Http { status: 404, .. }) => {
                ErrorContext::new(message)
                    .with_suggestion("Check the `[update] repository` setting in your config file")
            }
            UpdateError::Release(ReleaseError::Network { .. }) => ErrorContext::new(message)
                .with_suggestion(
                    "Check your internet connection and proxy settings, then try again",
                ),
            UpdateError::Release(ReleaseError::Decode { .. }) => ErrorContext::new(message)
                .with_suggestion("Check that `[update] api_url` points at a GitHub releases API"),
            _ => ErrorContext::new(message),
        };
    }

    if error.downcast_ref::<toml::de::Error>().is_some() {
        return ErrorContext::new(message)
            .with_suggestion("Check the TOML syntax of your cc-sandbox config file");
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(message)
            .with_suggestion("Check file ownership or run with elevated permissions");
    }

    ErrorContext::new(message)
}
