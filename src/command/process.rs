//! [`CommandRunner`] backed by real child processes.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{CommandError, CommandOutput, CommandRunner, CommandSpec, redact_credentials};

/// Runs commands as child processes, killing any that outlive `timeout`.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        ProcessRunner { timeout }
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let command_line = spec.display();
        if !spec.quiet {
            info!("> {} (cwd: {})", command_line, spec.cwd.display());
        }

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the output future on timeout must take the child with it.
            .kill_on_drop(true);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(CommandError::Spawn {
                    command: command_line,
                    source,
                });
            }
            Err(_) => {
                warn!(command = %command_line, timeout_secs = self.timeout.as_secs(), "command timed out");
                return Err(CommandError::TimedOut {
                    command: command_line,
                    timeout: self.timeout,
                });
            }
        };

        let result = CommandOutput {
            code: output.status.code(),
            stdout: redact_credentials(&String::from_utf8_lossy(&output.stdout)),
            stderr: redact_credentials(&String::from_utf8_lossy(&output.stderr)),
            cwd: spec.cwd.clone(),
        };

        if !spec.quiet {
            for line in result.stdout.lines().chain(result.stderr.lines()) {
                debug!("{line}");
            }
        }

        if output.status.success() {
            Ok(result)
        } else {
            Err(CommandError::failed(spec, &result))
        }
    }
}
