use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::constants::BACKUP_SUFFIX;
use crate::core::ReplaceError;

/// Manages the side-copy of the running executable during a backup-then-rename
/// install.
///
/// The previous binary is *moved* (not copied) beside the executable under a
/// name unique to this update attempt:
///
/// ```text
/// /usr/local/bin/cc-sandbox
/// /usr/local/bin/cc-sandbox.old.20250101120000123456789.4242
/// ```
///
/// The suffix combines a nanosecond timestamp with the process id, so two
/// rapid or concurrent attempts never pick the same name. Backups from earlier
/// attempts (`<name>.old` and `<name>.old.*`) are found by pattern and removed
/// on a best-effort basis once an install succeeds.
///
/// # Examples
///
/// ```rust,no_run
/// use cc_sandbox::upgrade::backup::BackupManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// let backup = BackupManager::new(PathBuf::from(r"C:\Tools\cc-sandbox.exe"));
/// backup.move_aside().await?;
/// // ... put the new binary in place; on failure:
/// backup.restore().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupManager {
    /// Path of the executable being replaced.
    original_path: PathBuf,
    /// Where the previous binary is parked for this attempt.
    backup_path: PathBuf,
}

impl BackupManager {
    /// Create a manager for `executable_path` with a fresh backup name.
    pub fn new(executable_path: PathBuf) -> Self {
        let disambiguator =
            format!("{}.{}", Utc::now().format("%Y%m%d%H%M%S%f"), std::process::id());
        let backup_path = executable_path.with_file_name(format!(
            "{}{BACKUP_SUFFIX}.{disambiguator}",
            file_name_of(&executable_path)
        ));

        Self {
            original_path: executable_path,
            backup_path,
        }
    }

    /// Path of the executable being replaced.
    #[must_use]
    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    /// Backup location used by this attempt.
    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Whether this attempt's backup exists on disk.
    #[must_use]
    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    /// Rename the current executable to the backup path, freeing its name.
    ///
    /// Renaming works on platforms that refuse to overwrite or delete a
    /// running executable, because the open handle follows the file.
    pub async fn move_aside(&self) -> Result<(), ReplaceError> {
        info!("Moving {:?} aside to {:?}", self.original_path, self.backup_path);
        fs::rename(&self.original_path, &self.backup_path)
            .await
            .map_err(|e| ReplaceError::from_io("back up current executable", &self.original_path, e))
    }

    /// Rename the backup back onto the original path.
    pub async fn restore(&self) -> Result<(), ReplaceError> {
        warn!("Restoring previous executable from {:?}", self.backup_path);
        fs::rename(&self.backup_path, &self.original_path)
            .await
            .map_err(|e| ReplaceError::from_io("restore previous executable", &self.original_path, e))?;
        info!("Previous executable restored");
        Ok(())
    }

    /// Backups beside the executable left by any update attempt, this one included.
    pub async fn stale_backups(&self) -> Vec<PathBuf> {
        let Some(dir) = self.original_path.parent() else {
            return Vec::new();
        };
        let stem = format!("{}{BACKUP_SUFFIX}", file_name_of(&self.original_path));
        let prefix = format!("{stem}.");

        let mut found = Vec::new();
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot scan {:?} for old backups: {}", dir, e);
                return found;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == stem || name.starts_with(&prefix) {
                found.push(entry.path());
            }
        }
        found.sort();
        found
    }

    /// Delete every backup it can, returning how many were removed.
    ///
    /// Failures are logged and skipped. On Windows the backup of the binary
    /// that is still running cannot be removed until that process exits; a
    /// later update picks it up.
    pub async fn cleanup_stale(&self) -> usize {
        let mut removed = 0;
        for path in self.stale_backups().await {
            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Removed old backup {:?}", path);
                    removed += 1;
                }
                Err(e) => debug!("Leaving old backup {:?}: {}", path, e),
            }
        }
        removed
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name().unwrap_or_default().to_string_lossy().into_owned()
}
