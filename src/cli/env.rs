//! Show what cc-sandbox detects about the container environment.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::GlobalConfig;
use crate::constants::VERSION;
use crate::engine::runtime::{resolve_docker_socket, select_runtime, should_use_root_mode};
use crate::engine::{CommandRunner, EnvironmentProbe, global_probe};

/// Arguments of `cc-sandbox env`.
#[derive(Args, Debug, Default)]
pub struct EnvCommand {}

/// Facts gathered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentReport {
    /// Rows of (label, value)
    pub rows: Vec<(&'static str, String)>,
}

impl EnvironmentReport {
    /// Gather every fact from `probe`, honoring configured overrides.
    pub async fn gather<R: CommandRunner>(
        config: &GlobalConfig,
        probe: &EnvironmentProbe<R>,
    ) -> Self {
        let (docker, podman) = tokio::join!(probe.docker_available(), probe.podman_available());
        let runtime = select_runtime(config.runtime, probe).await;
        let rootless = probe.rootless_mode().await;
        let orbstack = probe.is_orbstack().await;
        let root = should_use_root_mode(config.root, runtime, probe).await;
        let socket = resolve_docker_socket(config.docker_socket.as_deref(), probe);

        Self {
            rows: vec![
                ("Version", VERSION.to_string()),
                ("Docker available", yes_no(docker)),
                ("Podman available", yes_no(podman)),
                ("Runtime", runtime.to_string()),
                ("Rootless docker", yes_no(rootless)),
                ("OrbStack", yes_no(orbstack)),
                ("Root mode", yes_no(root)),
                ("Docker socket", socket.display().to_string()),
                ("Registry", config.registry.clone()),
            ],
        }
    }

    /// Value for `label`.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.rows.iter().find(|(l, _)| *l == label).map(|(_, v)| v.as_str())
    }
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

impl EnvCommand {
    /// Print the environment report.
    pub async fn execute(&self, config: &GlobalConfig) -> Result<()> {
        let report = EnvironmentReport::gather(config, global_probe()).await;

        println!("{}", "cc-sandbox environment".bold());
        for (label, value) in &report.rows {
            println!("  {:<18} {}", format!("{label}:").cyan(), value);
        }
        Ok(())
    }
}
