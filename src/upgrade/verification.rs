use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use super::http::Transport;
use crate::core::DownloadError;

/// Read buffer used when hashing artifacts.
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Prefix of temporary files created by the downloader.
const TEMP_PREFIX: &str = "cc-sandbox-update-";

/// One row of a checksum manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Lower-cased hex digest
    pub checksum: String,
    /// Artifact filename
    pub filename: String,
}

/// A parsed `checksums.txt`.
///
/// Each non-blank line is `<hex-digest><whitespace><...><filename>`. Lines are
/// split on any run of whitespace, so both the `sha256sum` two-space format
/// and single-space variants parse; the first token is the digest and the last
/// is the filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
    entries: Vec<ManifestEntry>,
}

impl ChecksumManifest {
    /// Parse manifest text. Lines with fewer than two fields are skipped.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                match (parts.first(), parts.last()) {
                    (Some(checksum), Some(filename)) if parts.len() >= 2 => Some(ManifestEntry {
                        checksum: checksum.to_lowercase(),
                        filename: (*filename).to_string(),
                    }),
                    _ => None,
                }
            })
            .collect();

        Self {
            entries,
        }
    }

    /// All rows, in file order.
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Expected digest for `filename` (exact, case-sensitive match; first row wins).
    pub fn checksum_for(&self, filename: &str) -> Result<&str, DownloadError> {
        self.entries
            .iter()
            .find(|entry| entry.filename == filename)
            .map(|entry| entry.checksum.as_str())
            .ok_or_else(|| DownloadError::ManifestParse {
                filename: filename.to_string(),
            })
    }
}

/// Computes and compares SHA-256 digests of files.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Hex-encoded SHA-256 of a file, read in fixed-size chunks.
    pub async fn compute_sha256(file_path: &Path) -> Result<String, DownloadError> {
        debug!("Computing SHA256 checksum for: {:?}", file_path);

        let mut file = File::open(file_path)
            .await
            .map_err(|e| DownloadError::io(format!("opening {}", file_path.display()), e))?;

        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|e| DownloadError::io(format!("reading {}", file_path.display()), e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Whether two hex digests are equal, ignoring case.
    #[must_use]
    pub fn digests_match(expected: &str, actual: &str) -> bool {
        expected.eq_ignore_ascii_case(actual)
    }
}

/// A downloaded file whose SHA-256 matched its manifest entry.
///
/// Only [`ChecksumVerifiedDownloader`] can create one, so holding a
/// `VerifiedArtifact` is proof the bytes were checked. The file stays on disk
/// until [`discard`](Self::discard) is called or it is moved by an installer.
#[derive(Debug)]
pub struct VerifiedArtifact {
    path: PathBuf,
    checksum: String,
}

impl VerifiedArtifact {
    /// Location of the verified bytes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verified lower-case hex digest.
    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Remove the file if it is still at its download location.
    pub async fn discard(self) {
        match fs::remove_file(&self.path).await {
            Ok(()) => debug!("Removed downloaded artifact {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove downloaded artifact {:?}: {}", self.path, e),
        }
    }
}

/// Downloads a release artifact and proves it matches the published manifest.
///
/// # Examples
///
/// ```rust,no_run
/// use cc_sandbox::upgrade::http::ReqwestTransport;
/// use cc_sandbox::upgrade::verification::ChecksumVerifiedDownloader;
///
/// # async fn example() -> anyhow::Result<()> {
/// let transport = ReqwestTransport::new(None)?;
/// let artifact = ChecksumVerifiedDownloader::new(&transport)
///     .fetch(
///         "https://github.com/luwojtaszek/cc-sandbox/releases/download/v1.0.0/cc-sandbox-linux-amd64",
///         "https://github.com/luwojtaszek/cc-sandbox/releases/download/v1.0.0/checksums.txt",
///         "cc-sandbox-linux-amd64",
///     )
///     .await?;
/// println!("verified {}", artifact.path().display());
/// # Ok(())
/// # }
/// ```
pub struct ChecksumVerifiedDownloader<'a, T> {
    transport: &'a T,
    temp_dir: PathBuf,
}

impl<'a, T: Transport> ChecksumVerifiedDownloader<'a, T> {
    /// Downloader writing temporary files to the platform temp directory.
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Write temporary files under `dir` instead.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    fn temp_file(&self) -> Result<NamedTempFile, DownloadError> {
        tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.temp_dir)
            .map_err(|e| DownloadError::io("creating temporary file", e))
    }

    async fn download_to(&self, url: &str, temp: &NamedTempFile) -> Result<(), String> {
        let handle = temp.as_file().try_clone().map_err(|e| e.to_string())?;
        let mut file = File::from_std(handle);
        self.transport.download(url, &mut file).await.map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Download `artifact_url`, verify it against `filename`'s row in the
    /// manifest at `manifest_url`, and return it as a [`VerifiedArtifact`].
    ///
    /// Temporary files are removed on every failure. On a checksum mismatch
    /// the artifact is deleted before the error is returned.
    pub async fn fetch(
        &self,
        artifact_url: &str,
        manifest_url: &str,
        filename: &str,
    ) -> Result<VerifiedArtifact, DownloadError> {
        let manifest_file = self.temp_file()?;
        self.download_to(manifest_url, &manifest_file).await.map_err(|reason| {
            DownloadError::ManifestFetch {
                url: manifest_url.to_string(),
                reason,
            }
        })?;

        let content = fs::read_to_string(manifest_file.path())
            .await
            .map_err(|e| DownloadError::io("reading checksum manifest", e))?;
        let manifest = ChecksumManifest::parse(&content);
        let expected = manifest.checksum_for(filename)?.to_string();
        debug!("Expected checksum for {}: {}", filename, expected);
        drop(manifest_file);

        let artifact_file = self.temp_file()?;
        self.download_to(artifact_url, &artifact_file).await.map_err(|reason| {
            DownloadError::ArtifactFetch {
                url: artifact_url.to_string(),
                reason,
            }
        })?;

        let artifact_path: TempPath = artifact_file.into_temp_path();
        let actual = ChecksumVerifier::compute_sha256(&artifact_path).await?;

        if !ChecksumVerifier::digests_match(&expected, &actual) {
            warn!("Checksum mismatch for {}: expected {}, got {}", filename, expected, actual);
            if let Err(e) = artifact_path.close() {
                warn!("Failed to delete rejected artifact: {}", e);
            }
            return Err(DownloadError::ChecksumMismatch {
                filename: filename.to_string(),
                expected,
                actual,
            });
        }

        let path = artifact_path
            .keep()
            .map_err(|e| DownloadError::io("retaining verified artifact", e.error))?;
        info!("Checksum verified for {}", filename);

        Ok(VerifiedArtifact {
            path,
            checksum: actual,
        })
    }
}
