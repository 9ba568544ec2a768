use anyhow::Result;
use cc_sandbox::core::DownloadError;
use cc_sandbox::image::ImageCatalog;
use cc_sandbox::test_utils::{
    FakeEngine, FakeTransport, RecordingReporter, init_test_logging, sha256_hex,
};
use cc_sandbox::upgrade::{
    BackupThenRename, ChecksumVerifiedDownloader, CliOutcome, DirectRename, ImagesOutcome,
    ReleaseSource, Status, UpdateOptions, UpdateOrchestrator,
};
use cc_sandbox::utils::platform::host_artifact_filename;
use std::path::Path;
use tempfile::TempDir;

const API: &str = "https://api.example.test";
const DOWNLOADS: &str = "https://downloads.example.test";
const REPO: &str = "example/cc-sandbox";

fn source() -> ReleaseSource {
    ReleaseSource {
        repository: REPO.to_string(),
        api_url: API.to_string(),
        download_url: DOWNLOADS.to_string(),
    }
}

fn latest_url() -> String {
    format!("{API}/repos/{REPO}/releases/latest")
}

fn asset(tag: &str, name: &str) -> String {
    format!("{DOWNLOADS}/{REPO}/releases/download/{tag}/{name}")
}

fn release(tag: &str, payload: &[u8], digest: &str) -> Result<FakeTransport> {
    let filename = host_artifact_filename()?;
    Ok(FakeTransport::new()
        .serve(&latest_url(), format!(r#"{{"tag_name":"{tag}"}}"#))
        .serve(&asset(tag, "checksums.txt"), format!("{digest} {filename}\n"))
        .serve(&asset(tag, &filename), payload.to_vec()))
}

fn file_count(dir: &Path) -> Result<usize> {
    Ok(std::fs::read_dir(dir)?.count())
}

/// A full update installs the new binary and refreshes images in one run.
#[tokio::test]
async fn test_full_update_run() -> Result<()> {
    init_test_logging(None);
    let install = TempDir::new()?;
    let downloads = TempDir::new()?;
    let exe = install.path().join("cc-sandbox");
    std::fs::write(&exe, b"v1.9.0")?;

    let payload = b"v2.0.0".to_vec();
    let transport = release("v2.0.0", &payload, &sha256_hex(&payload))?;
    let engine = FakeEngine::with_images(["cc-sandbox:base", "cc-sandbox:docker"]);
    let reporter = RecordingReporter::new();

    let summary = UpdateOrchestrator::new(&transport, &engine, DirectRename)
        .with_source(source())
        .with_current_version("v1.9.0")
        .with_executable(&exe)
        .with_temp_dir(downloads.path())
        .run(&UpdateOptions::default(), &reporter)
        .await;

    assert_eq!(
        summary.cli,
        CliOutcome::Updated {
            version: "v2.0.0".to_string()
        }
    );
    assert!(summary.images.changed());
    assert_eq!(std::fs::read(&exe)?, payload);
    assert_eq!(file_count(downloads.path())?, 0);
    assert!(reporter.contains(Status::Ok, "CLI updated to v2.0.0"));
    assert!(reporter.contains(Status::Ok, "Updated ghcr.io/luwojtaszek/cc-sandbox:docker"));
    assert_eq!(reporter.last(), Some((Status::Ok, "Update complete!".to_string())));
    Ok(())
}

/// Tampered artifacts are deleted and the CLI failure does not stop the image phase.
#[tokio::test]
async fn test_tampered_artifact_then_images() -> Result<()> {
    let install = TempDir::new()?;
    let downloads = TempDir::new()?;
    let exe = install.path().join("cc-sandbox");
    std::fs::write(&exe, b"v1.9.0")?;

    let transport = release("v2.0.0", b"evil", "abc123")?;
    let engine = FakeEngine::with_images(["ghcr.io/luwojtaszek/cc-sandbox:bun-full"])
        .failing_pull("ghcr.io/luwojtaszek/cc-sandbox:bun-full");
    let reporter = RecordingReporter::new();

    let summary = UpdateOrchestrator::new(&transport, &engine, BackupThenRename)
        .with_source(source())
        .with_current_version("1.9.0")
        .with_executable(&exe)
        .with_temp_dir(downloads.path())
        .run(&UpdateOptions::default(), &reporter)
        .await;

    assert!(matches!(summary.cli, CliOutcome::Failed(_)));
    assert_eq!(
        summary.images,
        ImagesOutcome::Refreshed {
            updated: Vec::new(),
            failed: vec!["ghcr.io/luwojtaszek/cc-sandbox:bun-full".to_string()],
        }
    );
    assert!(!summary.changed());
    assert_eq!(std::fs::read(&exe)?, b"v1.9.0");
    assert_eq!(file_count(install.path())?, 1);
    assert_eq!(file_count(downloads.path())?, 0);
    assert_eq!(reporter.last(), Some((Status::Info, "Everything is up to date.".to_string())));
    Ok(())
}

/// The downloader reports a mismatch with both digests.
#[tokio::test]
async fn test_downloader_mismatch_error() -> Result<()> {
    let downloads = TempDir::new()?;
    let transport = FakeTransport::new()
        .serve("https://x.test/checksums.txt", "ABC123  tool-linux-amd64\n")
        .serve("https://x.test/tool-linux-amd64", b"def".to_vec());

    let result = ChecksumVerifiedDownloader::new(&transport)
        .with_temp_dir(downloads.path())
        .fetch("https://x.test/tool-linux-amd64", "https://x.test/checksums.txt", "tool-linux-amd64")
        .await;

    match result {
        Err(DownloadError::ChecksumMismatch {
            filename,
            expected,
            actual,
        }) => {
            assert_eq!(filename, "tool-linux-amd64");
            assert_eq!(expected, "abc123");
            assert_eq!(actual, sha256_hex(b"def"));
        }
        other => panic!("expected checksum mismatch, got {other:?}"),
    }
    assert_eq!(file_count(downloads.path())?, 0);
    Ok(())
}

/// Images are matched against a custom registry when one is configured.
#[tokio::test]
async fn test_custom_registry_catalog() -> Result<()> {
    let transport = FakeTransport::new();
    let engine = FakeEngine::with_images([
        "cc-sandbox:base",
        "registry.example.com/team/cc-sandbox:base",
        "ghcr.io/luwojtaszek/cc-sandbox:docker",
    ]);
    let reporter = RecordingReporter::new();

    let outcome = UpdateOrchestrator::new(&transport, &engine, DirectRename)
        .with_catalog(ImageCatalog::new("registry.example.com/team/"))
        .refresh_images(&reporter)
        .await;

    assert_eq!(engine.pulled(), vec!["registry.example.com/team/cc-sandbox:base"]);
    assert!(outcome.changed());
    Ok(())
}
