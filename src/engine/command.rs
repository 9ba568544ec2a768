//! Builder for container engine subprocesses.
//!
//! All `docker`/`podman` invocations go through [`EngineCommand`], which logs the
//! command line, captures or streams output, applies an optional timeout and
//! maps failures to [`EngineError`].

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::EngineError;

/// Captured output of a successful engine command.
#[derive(Debug, Clone, Default)]
pub struct EngineCommandOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

/// A single invocation of a container engine binary.
///
/// # Examples
///
/// ```rust,no_run
/// use cc_sandbox::engine::command::EngineCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let output = EngineCommand::new("docker")
///     .args(["info", "--format", "{{.OperatingSystem}}"])
///     .execute()
///     .await?;
/// println!("{}", output.stdout.trim());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EngineCommand {
    /// Engine binary (`docker`, `podman`, or an absolute path)
    program: String,
    /// Arguments passed to the engine
    args: Vec<String>,
    /// Capture output (true) or stream it to the terminal (false)
    capture_output: bool,
    /// Maximum duration to wait for completion (None = wait forever)
    timeout_duration: Option<Duration>,
}

impl EngineCommand {
    /// Create a command for `program` with output capture and no timeout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            capture_output: true,
            timeout_duration: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Stream stdout/stderr to the terminal instead of capturing them.
    ///
    /// Used for `pull`, whose progress output is meant for the user.
    pub fn inherit_output(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Set a timeout for the command (None for no timeout).
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_default()
    }

    /// Run the command, failing on spawn errors, timeouts and non-zero exits.
    pub async fn execute(self) -> Result<EngineCommandOutput, EngineError> {
        let operation = self.operation();
        tracing::debug!(target: "engine", "Executing command: {} {}", self.program, self.args.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null()).kill_on_drop(true);

        if self.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }

        let output_future = cmd.output();
        let result = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        target: "engine",
                        "Command timed out after {} seconds: {} {}",
                        duration.as_secs(),
                        self.program,
                        self.args.join(" ")
                    );
                    return Err(EngineError::Timeout {
                        engine: self.program,
                        operation,
                        seconds: duration.as_secs(),
                    });
                }
            },
            None => output_future.await,
        };

        let output = result.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::NotFound {
                    engine: self.program.clone(),
                }
            } else {
                EngineError::Spawn {
                    engine: self.program.clone(),
                    operation: operation.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "engine",
                "Command failed with exit code: {:?}",
                output.status.code()
            );
            let stderr = stderr.trim();
            return Err(EngineError::CommandFailed {
                engine: self.program,
                operation,
                stderr: if stderr.is_empty() {
                    format!("exit status {:?}", output.status.code())
                } else {
                    stderr.to_string()
                },
            });
        }

        tracing::trace!(target: "engine", "Command completed successfully");
        Ok(EngineCommandOutput {
            stdout,
            stderr,
        })
    }
}
