use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::contract::{ProcessOutput, ProcessRunner};
use crate::error::RunError;

/// [`ProcessRunner`] backed by `tokio::process`. The child is spawned with
/// `kill_on_drop`, so abandoning the wait on timeout also terminates it.
///
/// Children never get a terminal: stdin is null and `GIT_TERMINAL_PROMPT=0` stops git
/// from opening `/dev/tty` to ask for credentials, so an unreachable or private
/// repository fails immediately instead of waiting out the clone timeout.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, RunError> {
        tracing::debug!(program, ?args, timeout_secs = timeout.as_secs(), "Spawning process");

        let child = Command::new(program)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Launch {
                program: program.to_string(),
                source,
            })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let result = ProcessOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    status: output.status.code(),
                };
                tracing::debug!(program, status = ?result.status, "Process finished");
                Ok(result)
            }
            Ok(Err(source)) => Err(RunError::Launch {
                program: program.to_string(),
                source,
            }),
            Err(_) => {
                tracing::warn!(program, timeout_secs = timeout.as_secs(), "Process timed out, killed");
                Err(RunError::TimedOut {
                    program: program.to_string(),
                    timeout,
                })
            }
        }
    }
}
