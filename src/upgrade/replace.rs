//! Installing a verified artifact over the running executable.
//!
//! Two strategies implement [`BinaryReplacer`]:
//!
//! - [`DirectRename`] renames the artifact straight onto the executable path.
//!   On POSIX systems a running process holds its binary by inode, so the
//!   rename is atomic and the current process keeps running the old bytes.
//! - [`BackupThenRename`] first renames the executable to a per-attempt
//!   backup, then renames the artifact into the freed path. Windows locks a
//!   running executable against overwrite and delete, but not against rename.
//!
//! [`PlatformReplacer`] picks one at compile time. Both are always compiled
//! so each can be exercised on any host.
//!
//! Either way the executable path only ever holds the complete old binary or
//! the complete new one. An artifact on another filesystem is first copied to
//! a temporary file beside the executable, since `rename` cannot cross
//! devices.

use std::future::Future;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error, info};

use super::backup::BackupManager;
use super::verification::VerifiedArtifact;
use crate::core::ReplaceError;

/// Strategy for putting a [`VerifiedArtifact`] in place of an executable.
pub trait BinaryReplacer: Send + Sync {
    /// Install `artifact` at `executable`, an absolute symlink-resolved path.
    fn replace(
        &self,
        executable: &Path,
        artifact: &VerifiedArtifact,
    ) -> impl Future<Output = Result<(), ReplaceError>> + Send;
}

/// Rename the artifact directly onto the executable path.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectRename;

/// Park the executable under a backup name, then rename the artifact into place.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackupThenRename;

/// Replacement strategy for the target platform.
#[cfg(not(windows))]
pub type PlatformReplacer = DirectRename;

/// Replacement strategy for the target platform.
#[cfg(windows)]
pub type PlatformReplacer = BackupThenRename;

/// Set mode 0755 on the artifact; downloads do not arrive executable.
async fn make_executable(path: &Path) -> Result<(), ReplaceError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|e| ReplaceError::from_io("mark executable", path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

impl BinaryReplacer for DirectRename {
    async fn replace(
        &self,
        executable: &Path,
        artifact: &VerifiedArtifact,
    ) -> Result<(), ReplaceError> {
        make_executable(artifact.path()).await?;

        debug!("Renaming {:?} onto {:?}", artifact.path(), executable);
        match fs::rename(artifact.path(), executable).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                debug!(
                    "{:?} is on another filesystem, staging beside the executable",
                    artifact.path()
                );
                install_via_sibling(artifact.path(), executable).await?;
            }
            Err(e) => return Err(ReplaceError::from_io("install new binary at", executable, e)),
        }

        info!("Installed new binary at {:?}", executable);
        Ok(())
    }
}

/// Copy `source` into a temporary file in the executable's directory, then
/// rename that onto `executable`. The staged copy is removed on failure.
async fn install_via_sibling(source: &Path, executable: &Path) -> Result<(), ReplaceError> {
    let dir = executable.parent().ok_or_else(|| {
        ReplaceError::from_io(
            "stage new binary beside",
            executable,
            io::Error::new(io::ErrorKind::InvalidInput, "executable has no parent directory"),
        )
    })?;

    let staged = tempfile::Builder::new()
        .prefix(".cc-sandbox-staged-")
        .tempfile_in(dir)
        .map_err(|e| ReplaceError::from_io("stage new binary in", dir, e))?
        .into_temp_path();

    fs::copy(source, &staged)
        .await
        .map_err(|e| ReplaceError::from_io("copy new binary to", &*staged, e))?;
    make_executable(&staged).await?;

    staged
        .persist(executable)
        .map_err(|e| ReplaceError::from_io("install new binary at", executable, e.error))?;

    if let Err(e) = fs::remove_file(source).await {
        debug!("Could not remove staged source {:?}: {}", source, e);
    }
    Ok(())
}

impl BinaryReplacer for BackupThenRename {
    async fn replace(
        &self,
        executable: &Path,
        artifact: &VerifiedArtifact,
    ) -> Result<(), ReplaceError> {
        make_executable(artifact.path()).await?;

        let backup = BackupManager::new(executable.to_path_buf());
        swap_in(&backup, artifact.path(), executable).await?;

        let removed = backup.cleanup_stale().await;
        debug!("Removed {} old backup(s)", removed);
        Ok(())
    }
}

/// Move `executable` aside and rename `source` onto it, restoring on failure.
async fn swap_in(
    backup: &BackupManager,
    source: &Path,
    executable: &Path,
) -> Result<(), ReplaceError> {
    swap_in_with(backup, source, executable, || backup.restore()).await
}

/// [`swap_in`] with the restore step supplied by the caller.
async fn swap_in_with<R, F>(
    backup: &BackupManager,
    source: &Path,
    executable: &Path,
    restore: R,
) -> Result<(), ReplaceError>
where
    R: FnOnce() -> F,
    F: Future<Output = Result<(), ReplaceError>>,
{
    backup.move_aside().await?;

    debug!("Renaming {:?} onto {:?}", source, executable);
    if let Err(e) = fs::rename(source, executable).await {
        let primary = ReplaceError::from_io("install new binary at", executable, e);
        if let Err(restore_err) = restore().await {
            error!("Could not restore previous executable: {}", restore_err);
            return Err(ReplaceError::RestoreFailed {
                primary: Box::new(primary),
                backup: backup.backup_path().to_path_buf(),
            });
        }
        return Err(primary);
    }

    info!("Installed new binary at {:?}", executable);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeTransport, sha256_hex};
    use crate::upgrade::verification::ChecksumVerifiedDownloader;
    use tempfile::TempDir;

    const ARTIFACT_URL: &str = "https://example.test/cc-sandbox-linux-amd64";
    const MANIFEST_URL: &str = "https://example.test/checksums.txt";

    async fn verified(downloads: &Path, bytes: &[u8]) -> VerifiedArtifact {
        let transport = FakeTransport::new()
            .serve(MANIFEST_URL, format!("{}  cc-sandbox-linux-amd64\n", sha256_hex(bytes)))
            .serve(ARTIFACT_URL, bytes.to_vec());
        ChecksumVerifiedDownloader::new(&transport)
            .with_temp_dir(downloads)
            .fetch(ARTIFACT_URL, MANIFEST_URL, "cc-sandbox-linux-amd64")
            .await
            .unwrap()
    }

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_direct_rename_installs_artifact() {
        let install = TempDir::new().unwrap();
        let downloads = TempDir::new().unwrap();
        let exe = install.path().join("cc-sandbox");
        std::fs::write(&exe, b"old binary").unwrap();

        let artifact = verified(downloads.path(), b"new binary").await;
        DirectRename.replace(&exe, &artifact).await.unwrap();

        assert_eq!(std::fs::read(&exe).unwrap(), b"new binary");
        assert!(!artifact.path().exists());
        assert_eq!(dir_names(install.path()), vec!["cc-sandbox"]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&exe).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[tokio::test]
    async fn test_direct_rename_missing_directory_leaves_artifact() {
        let downloads = TempDir::new().unwrap();
        let artifact = verified(downloads.path(), b"new binary").await;
        let exe = downloads.path().join("missing").join("cc-sandbox");

        let err = DirectRename.replace(&exe, &artifact).await.unwrap_err();
        assert!(matches!(err, ReplaceError::Filesystem { .. }));
        assert!(artifact.path().exists());
        artifact.discard().await;
    }

    #[tokio::test]
    async fn test_backup_then_rename_cleans_old_backups() {
        let install = TempDir::new().unwrap();
        let downloads = TempDir::new().unwrap();
        let exe = install.path().join("cc-sandbox");
        std::fs::write(&exe, b"old binary").unwrap();
        std::fs::write(install.path().join("cc-sandbox.old"), b"ancient").unwrap();
        std::fs::write(install.path().join("cc-sandbox.old.1700000000"), b"older").unwrap();

        let artifact = verified(downloads.path(), b"new binary").await;
        BackupThenRename.replace(&exe, &artifact).await.unwrap();

        assert_eq!(std::fs::read(&exe).unwrap(), b"new binary");
        // Nothing holds the old binary open here, so its backup goes too.
        assert_eq!(dir_names(install.path()), vec!["cc-sandbox"]);
    }

    #[tokio::test]
    async fn test_swap_in_restores_on_failure() {
        let install = TempDir::new().unwrap();
        let exe = install.path().join("cc-sandbox");
        std::fs::write(&exe, b"old binary").unwrap();

        let backup = BackupManager::new(exe.clone());
        let err = swap_in(&backup, &install.path().join("vanished"), &exe).await.unwrap_err();

        assert!(matches!(err, ReplaceError::Filesystem { .. }));
        assert_eq!(std::fs::read(&exe).unwrap(), b"old binary");
        assert!(!backup.backup_exists());
        assert_eq!(dir_names(install.path()), vec!["cc-sandbox"]);
    }

    #[tokio::test]
    async fn test_swap_in_reports_failed_restore() {
        let install = TempDir::new().unwrap();
        let exe = install.path().join("cc-sandbox");
        std::fs::write(&exe, b"old binary").unwrap();

        let backup = BackupManager::new(exe.clone());
        let restore_target = exe.clone();
        let err = swap_in_with(&backup, &install.path().join("vanished"), &exe, move || async move {
            Err(ReplaceError::from_io(
                "restore previous binary to",
                restore_target,
                io::Error::other("device busy"),
            ))
        })
        .await
        .unwrap_err();

        let text = err.to_string();
        match err {
            ReplaceError::RestoreFailed {
                primary,
                backup: kept,
            } => {
                assert!(matches!(*primary, ReplaceError::Filesystem { .. }));
                assert!(primary.to_string().contains("install new binary at"));
                assert_eq!(kept, backup.backup_path());
                assert_eq!(std::fs::read(&kept).unwrap(), b"old binary");
            }
            other => panic!("expected RestoreFailed, got {other:?}"),
        }
        assert!(text.contains("install new binary at"));
        assert!(text.contains(&backup.backup_path().display().to_string()));
        assert!(!exe.exists());
    }

    #[tokio::test]
    async fn test_direct_rename_staged_copy_from_other_directory() {
        let install = TempDir::new().unwrap();
        let downloads = TempDir::new().unwrap();
        let exe = install.path().join("cc-sandbox");
        std::fs::write(&exe, b"old binary").unwrap();
        let source = downloads.path().join("cc-sandbox-update-artifact");
        std::fs::write(&source, b"new binary").unwrap();

        install_via_sibling(&source, &exe).await.unwrap();

        assert_eq!(std::fs::read(&exe).unwrap(), b"new binary");
        assert!(!source.exists());
        assert_eq!(dir_names(install.path()), vec!["cc-sandbox"]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&exe).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[tokio::test]
    async fn test_staged_copy_failure_leaves_executable() {
        let install = TempDir::new().unwrap();
        let exe = install.path().join("cc-sandbox");
        std::fs::write(&exe, b"old binary").unwrap();

        let err = install_via_sibling(&install.path().join("vanished"), &exe).await.unwrap_err();

        assert!(matches!(err, ReplaceError::Filesystem { .. }));
        assert_eq!(std::fs::read(&exe).unwrap(), b"old binary");
        assert_eq!(dir_names(install.path()), vec!["cc-sandbox"]);
    }

    /// Artifacts on a tmpfs are installed onto a disk-backed executable path.
    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_direct_rename_across_filesystems() {
        use std::os::unix::fs::MetadataExt;

        let shm = Path::new("/dev/shm");
        if !shm.is_dir() {
            return;
        }
        let downloads = match TempDir::new_in(shm) {
            Ok(dir) => dir,
            Err(_) => return,
        };
        let install = TempDir::new_in(env!("CARGO_MANIFEST_DIR")).unwrap();
        let same_device = std::fs::metadata(downloads.path()).unwrap().dev()
            == std::fs::metadata(install.path()).unwrap().dev();
        if same_device {
            return;
        }

        let exe = install.path().join("cc-sandbox");
        std::fs::write(&exe, b"old binary").unwrap();
        let artifact = verified(downloads.path(), b"new binary").await;

        DirectRename.replace(&exe, &artifact).await.unwrap();

        assert_eq!(std::fs::read(&exe).unwrap(), b"new binary");
        assert_eq!(dir_names(install.path()), vec!["cc-sandbox"]);
        artifact.discard().await;
    }

    #[tokio::test]
    async fn test_backup_then_rename_missing_executable() {
        let install = TempDir::new().unwrap();
        let downloads = TempDir::new().unwrap();
        let exe = install.path().join("cc-sandbox");

        let artifact = verified(downloads.path(), b"new binary").await;
        let err = BackupThenRename.replace(&exe, &artifact).await.unwrap_err();

        assert!(matches!(err, ReplaceError::Filesystem { .. }));
        assert!(!exe.exists());
        assert!(artifact.path().exists());
        artifact.discard().await;
    }
}
