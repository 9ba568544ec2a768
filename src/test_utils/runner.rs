use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::core::EngineError;
use crate::engine::CommandRunner;

/// [`CommandRunner`] that answers from a script and counts invocations.
///
/// Commands are keyed by `program` and `args` joined with single spaces, e.g.
/// `"docker info --format {{.SecurityOptions}}"`. Unscripted commands fail
/// as if the program were not installed.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, String>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedRunner {
    /// Runner with no scripted commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `command` succeed with `stdout`.
    #[must_use]
    pub fn respond(mut self, command: &str, stdout: &str) -> Self {
        self.responses.insert(command.to_string(), stdout.to_string());
        self
    }

    /// Sleep this long inside every call, widening race windows.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How often `command` was run.
    pub fn calls_for(&self, command: &str) -> usize {
        self.calls.lock().unwrap().get(command).copied().unwrap_or(0)
    }

    /// How many commands were run in total.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, EngineError> {
        let key = std::iter::once(program).chain(args.iter().copied()).collect::<Vec<_>>().join(" ");
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.responses.get(&key).cloned().ok_or_else(|| EngineError::NotFound {
            engine: program.to_string(),
        })
    }
}
