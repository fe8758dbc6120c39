//! Subprocess runner

use async_trait::async_trait;
use ghrelay_core::{CliCommandRunner, CliOutput, Error, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Exit code reported when the binary cannot be found
pub const COMMAND_NOT_FOUND: i32 = 127;

/// Runs commands with tokio, capturing output.
///
/// A missing binary is reported as exit code 127 rather than an error, so
/// preflight reads it as "not installed".
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    env: Vec<(String, String)>,
    working_dir: Option<PathBuf>,
}

impl ProcessRunner {
    /// Create a runner inheriting the current environment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable for every command
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl CliCommandRunner for ProcessRunner {
    async fn run(&self, command: &str, args: &[String], timeout_ms: u64) -> Result<CliOutput> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!(command = %command, args = ?args, timeout_ms, "Spawning command");
        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(command = %command, "Command not found");
                return Ok(CliOutput {
                    stdout: String::new(),
                    stderr: format!("{}: command not found", command),
                    exit_code: COMMAND_NOT_FOUND,
                });
            }
            Err(e) => return Err(Error::Command(format!("failed to spawn {}: {}", command, e))),
        };

        let output = tokio::time::timeout(Duration::from_millis(timeout_ms), child.wait_with_output())
            .await
            .map_err(|_| Error::Timeout(timeout_ms))??;

        let result = CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        };
        debug!(command = %command, exit_code = result.exit_code, "Command finished");
        Ok(result)
    }
}
