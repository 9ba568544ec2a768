use cc_sandbox::engine::runtime::{select_runtime, should_use_root_mode};
use cc_sandbox::engine::{EnvironmentProbe, RuntimeKind, RuntimePreference};
use cc_sandbox::test_utils::ScriptedRunner;
use std::sync::Arc;
use std::time::Duration;

const SECURITY_OPTIONS: &str = "docker info --format {{.SecurityOptions}}";
const OPERATING_SYSTEM: &str = "docker info --format {{.OperatingSystem}}";

/// Many concurrent callers of every predicate trigger each detection once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_predicates_detect_once_under_contention() {
    let runner = ScriptedRunner::new()
        .respond("docker --version", "Docker version 27.0.1")
        .respond(SECURITY_OPTIONS, "[name=seccomp name=rootless]")
        .respond(OPERATING_SYSTEM, "Docker Desktop")
        .with_delay(Duration::from_millis(10));
    let probe = Arc::new(EnvironmentProbe::new(runner, None));

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..32 {
        let probe = Arc::clone(&probe);
        tasks.spawn(async move {
            (
                probe.docker_available().await,
                probe.podman_available().await,
                probe.rootless_mode().await,
                probe.virtualization_host_is("docker desktop").await,
            )
        });
    }

    let mut results = Vec::new();
    while let Some(result) = tasks.join_next().await {
        results.push(result.unwrap());
    }
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert!(results[0].0);
    assert!(!results[0].1);

    let runner = probe.runner();
    assert_eq!(runner.calls_for("docker --version"), 1);
    assert_eq!(runner.calls_for("podman --version"), 1);
    if cfg!(windows) {
        assert_eq!(runner.calls_for(SECURITY_OPTIONS), 0);
    } else {
        assert!(results[0].2);
        assert_eq!(runner.calls_for(SECURITY_OPTIONS), 1);
    }
}

/// Runtime and root-mode decisions reuse cached probe results.
#[tokio::test]
async fn test_decisions_share_probe_cache() {
    let runner = ScriptedRunner::new()
        .respond("podman --version", "podman version 5.2.0")
        .respond(OPERATING_SYSTEM, "Fedora Linux 40");
    let probe = EnvironmentProbe::new(runner, None);

    for _ in 0..3 {
        let runtime = select_runtime(RuntimePreference::Auto, &probe).await;
        assert_eq!(runtime, RuntimeKind::Podman);
        assert!(!should_use_root_mode(None, runtime, &probe).await);
    }

    assert_eq!(probe.runner().calls_for("podman --version"), 1);
    assert_eq!(probe.runner().calls_for("docker --version"), 1);
    assert_eq!(probe.runner().calls_for(OPERATING_SYSTEM), 0);
}
