//! Streaming output for spawned tool processes.

use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::error::{Error, Result};
use crate::runner::Invocation;

/// A child process whose stdout and stderr are read line by line.
pub struct StreamingProcess {
    child: Child,
    label: String,
    program: String,
}

impl StreamingProcess {
    pub fn spawn(invocation: &Invocation) -> Result<Self> {
        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ToolExecution {
                package: invocation.label.clone(),
                tool: invocation.program.clone(),
                message: format!("Failed to spawn '{}': {}", invocation.command_line(), e),
            })?;

        Ok(Self {
            child,
            label: invocation.label.clone(),
            program: invocation.program.clone(),
        })
    }

    fn error(&self, message: String) -> Error {
        Error::ToolExecution {
            package: self.label.clone(),
            tool: self.program.clone(),
            message,
        }
    }

    /// Forwards every output line to `on_line` until both streams close, then
    /// waits for the process to exit. The flag is `true` for stderr lines.
    pub async fn stream_output<F>(mut self, mut on_line: F) -> Result<ExitStatus>
    where
        F: FnMut(&str, bool),
    {
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| self.error("Failed to capture stdout".to_string()))?;
        let stderr = self
            .child
            .stderr
            .take()
            .ok_or_else(|| self.error("Failed to capture stderr".to_string()))?;

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stdout_open = true;
        let mut stderr_open = true;

        while stdout_open || stderr_open {
            tokio::select! {
                line = stdout_lines.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => on_line(line.trim_end(), false),
                    Ok(None) => stdout_open = false,
                    Err(e) => return Err(self.error(format!("Failed to read stdout: {}", e))),
                },
                line = stderr_lines.next_line(), if stderr_open => match line {
                    Ok(Some(line)) => on_line(line.trim_end(), true),
                    Ok(None) => stderr_open = false,
                    Err(e) => return Err(self.error(format!("Failed to read stderr: {}", e))),
                },
            }
        }

        self.child
            .wait()
            .await
            .map_err(|e| self.error(format!("Failed to wait for process: {}", e)))
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
