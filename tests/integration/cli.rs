use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::path::Path;
use tempfile::TempDir;

/// `cc-sandbox` with an isolated home, config path and an empty `PATH`, so no
/// engine binary is found and nothing reaches the network.
fn cc_sandbox(home: &Path) -> Result<Command> {
    let mut cmd = Command::cargo_bin("cc-sandbox")?;
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("LOCALAPPDATA", home)
        .env("CC_SANDBOX_CONFIG", home.join("config.toml"))
        .env("PATH", "")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("CC_SANDBOX_DEBUG")
        .env_remove("CC_SANDBOX_RUNTIME")
        .env_remove("CC_SANDBOX_REGISTRY")
        .env_remove("CC_SANDBOX_DOCKER_SOCKET")
        .env_remove("CC_SANDBOX_ROOT");
    Ok(cmd)
}

/// Help lists both subcommands.
#[test]
fn test_help() -> Result<()> {
    let home = TempDir::new()?;
    cc_sandbox(home.path())?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("update").and(predicate::str::contains("env")));
    Ok(())
}

/// Update help documents the phase switches.
#[test]
fn test_update_help() -> Result<()> {
    let home = TempDir::new()?;
    cc_sandbox(home.path())?
        .args(["update", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--skip-cli")
                .and(predicate::str::contains("--skip-images"))
                .and(predicate::str::contains("--force"))
                .and(predicate::str::contains("--check")),
        );
    Ok(())
}

/// Skipping both phases reports both skips and exits cleanly.
#[test]
#[serial]
fn test_update_skip_everything() -> Result<()> {
    let home = TempDir::new()?;
    cc_sandbox(home.path())?
        .args(["update", "--skip-cli", "--skip-images"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("cc-sandbox updater")
                .and(predicate::str::contains("[SKIP] Skipping CLI update"))
                .and(predicate::str::contains("[SKIP] Skipping image update"))
                .and(predicate::str::contains("Everything is up to date.")),
        );
    Ok(())
}

/// Skips configured in the config file apply without flags.
#[test]
#[serial]
fn test_update_skips_from_config_file() -> Result<()> {
    let home = TempDir::new()?;
    std::fs::write(
        home.path().join("config.toml"),
        "[update]\nskip_cli = true\nskip_images = true\n",
    )?;

    cc_sandbox(home.path())?
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipping CLI update"))
        .stdout(predicate::str::contains("Everything is up to date."));
    Ok(())
}

/// A missing engine is a skipped phase, not a failure.
#[test]
#[serial]
fn test_update_without_engine() -> Result<()> {
    let home = TempDir::new()?;
    cc_sandbox(home.path())?
        .args(["update", "--skip-cli"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not found, skipping image updates"));
    Ok(())
}

/// A broken config file fails with a suggestion.
#[test]
#[serial]
fn test_invalid_config_file() -> Result<()> {
    let home = TempDir::new()?;
    std::fs::write(home.path().join("config.toml"), "runtime = [")?;

    cc_sandbox(home.path())?
        .args(["update", "--skip-cli", "--skip-images"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config"))
        .stderr(predicate::str::contains("TOML"));
    Ok(())
}

/// `env` prints the detected facts; with no engine on `PATH` both are absent.
#[test]
#[serial]
fn test_env_command() -> Result<()> {
    let home = TempDir::new()?;
    cc_sandbox(home.path())?
        .arg("env")
        .env("CC_SANDBOX_DOCKER_SOCKET", "/tmp/custom-docker.sock")
        .env("CC_SANDBOX_ROOT", "yes")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Docker available:")
                .and(predicate::str::is_match(r"Podman available:\s+no")?)
                .and(predicate::str::contains("/tmp/custom-docker.sock"))
                .and(predicate::str::is_match(r"Root mode:\s+yes")?),
        );
    Ok(())
}

/// `update --check` against an unreachable API fails with a connectivity hint.
#[test]
#[serial]
fn test_update_check_unreachable_api() -> Result<()> {
    let home = TempDir::new()?;
    std::fs::write(
        home.path().join("config.toml"),
        "[update]\napi_url = \"http://127.0.0.1:1\"\ntimeout_secs = 5\n",
    )?;

    cc_sandbox(home.path())?
        .args(["update", "--check"])
        .env_remove("HTTP_PROXY")
        .env_remove("HTTPS_PROXY")
        .env_remove("ALL_PROXY")
        .env_remove("http_proxy")
        .env_remove("https_proxy")
        .env_remove("all_proxy")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to fetch latest version"))
        .stderr(predicate::str::contains("internet connection"));
    Ok(())
}
