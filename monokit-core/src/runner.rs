//! Process execution across packages.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};

use crate::error::Error;
use crate::streaming::StreamingProcess;

const STDERR_TAIL_LINES: usize = 20;

/// One planned subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Package name used to label output and results.
    pub label: String,
    pub cwd: PathBuf,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(label: impl Into<String>, cwd: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            cwd: cwd.into(),
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program and arguments joined for display.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(|a| a.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of a single invocation.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub label: String,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    /// Last lines of stderr, captured when output is prefixed.
    pub stderr: String,
    /// Set when the process could not be spawned or awaited.
    pub error: Option<String>,
}

impl InvocationResult {
    fn failed(label: &str, started: Instant, error: String) -> Self {
        Self {
            label: label.to_string(),
            success: false,
            exit_code: None,
            duration: started.elapsed(),
            stderr: String::new(),
            error: Some(error),
        }
    }
}

/// How child output reaches the parent's streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Children inherit stdin, stdout and stderr.
    Inherit,
    /// Lines are forwarded through the output handler with the package label.
    Prefixed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Upper bound on concurrently running children. `None` is unbounded.
    pub max_parallel: Option<usize>,
    pub sequential: bool,
}

impl RunOptions {
    #[inline]
    pub fn is_sequential(&self) -> bool {
        self.sequential || self.max_parallel == Some(1)
    }
}

/// Runs invocations and reports one result per invocation, in input order.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, invocations: Vec<Invocation>, options: &RunOptions) -> Vec<InvocationResult>;
}

pub type OutputHandler = Arc<dyn Fn(&str, &str, bool) + Send + Sync>;

fn default_output_handler() -> OutputHandler {
    Arc::new(|label, line, is_stderr| {
        if is_stderr {
            eprintln!("[{}] {}", label, line);
        } else {
            println!("[{}] {}", label, line);
        }
    })
}

/// Spawns real processes.
///
/// A single invocation runs interactively with inherited stdio unless an output
/// mode is forced; several invocations stream prefixed lines.
pub struct ProcessRunner {
    mode: Option<OutputMode>,
    on_output: OutputHandler,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            mode: None,
            on_output: default_output_handler(),
        }
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_output_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &str, bool) + Send + Sync + 'static,
    {
        self.on_output = Arc::new(handler);
        self
    }

    fn mode_for(&self, count: usize) -> OutputMode {
        match self.mode {
            Some(mode) => mode,
            None if count == 1 => OutputMode::Inherit,
            None => OutputMode::Prefixed,
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

type LineSender = mpsc::UnboundedSender<(String, String, bool)>;

#[async_trait]
impl Executor for ProcessRunner {
    async fn execute(&self, invocations: Vec<Invocation>, options: &RunOptions) -> Vec<InvocationResult> {
        if invocations.is_empty() {
            return Vec::new();
        }

        let mode = self.mode_for(invocations.len());
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, String, bool)>();
        let handler = Arc::clone(&self.on_output);
        let printer = tokio::spawn(async move {
            while let Some((label, line, is_stderr)) = rx.recv().await {
                handler(&label, &line, is_stderr);
            }
        });

        let mut results = Vec::with_capacity(invocations.len());
        if options.is_sequential() {
            for invocation in invocations {
                results.push(run_one(invocation, mode, tx.clone()).await);
            }
        } else {
            let limit = options
                .max_parallel
                .filter(|n| *n > 0)
                .map(|n| Arc::new(Semaphore::new(n)));

            let mut handles = Vec::with_capacity(invocations.len());
            for invocation in invocations {
                let label = invocation.label.clone();
                let tx = tx.clone();
                let limit = limit.clone();
                let handle = tokio::spawn(async move {
                    let _permit = match limit {
                        Some(ref semaphore) => semaphore.acquire().await.ok(),
                        None => None,
                    };
                    run_one(invocation, mode, tx).await
                });
                handles.push((label, Instant::now(), handle));
            }

            for (label, started, handle) in handles {
                match handle.await {
                    Ok(result) => results.push(result),
                    Err(e) => results.push(InvocationResult::failed(
                        &label,
                        started,
                        format!("Task panicked or was cancelled: {}", e),
                    )),
                }
            }
        }

        drop(tx);
        let _ = printer.await;
        results
    }
}

async fn run_one(invocation: Invocation, mode: OutputMode, tx: LineSender) -> InvocationResult {
    let started = Instant::now();
    tracing::info!(
        package = %invocation.label,
        cwd = %invocation.cwd.display(),
        "running {}",
        invocation.command_line()
    );

    match mode {
        OutputMode::Inherit => run_inherited(&invocation, started).await,
        OutputMode::Prefixed => run_prefixed(&invocation, started, tx).await,
    }
}

async fn run_inherited(invocation: &Invocation, started: Instant) -> InvocationResult {
    let status = Command::new(&invocation.program)
        .args(&invocation.args)
        .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&invocation.cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await;

    match status {
        Ok(status) => InvocationResult {
            label: invocation.label.clone(),
            success: status.success(),
            exit_code: status.code(),
            duration: started.elapsed(),
            stderr: String::new(),
            error: None,
        },
        Err(e) => InvocationResult::failed(
            &invocation.label,
            started,
            format!("Failed to spawn '{}': {}", invocation.command_line(), e),
        ),
    }
}

async fn run_prefixed(invocation: &Invocation, started: Instant, tx: LineSender) -> InvocationResult {
    let process = match StreamingProcess::spawn(invocation) {
        Ok(process) => process,
        Err(e) => return InvocationResult::failed(&invocation.label, started, failure_message(e)),
    };

    let label = invocation.label.clone();
    let mut stderr_tail: Vec<String> = Vec::new();
    let status = process
        .stream_output(|line, is_stderr| {
            if is_stderr {
                if stderr_tail.len() == STDERR_TAIL_LINES {
                    stderr_tail.remove(0);
                }
                stderr_tail.push(line.to_string());
            }
            let _ = tx.send((label.clone(), line.to_string(), is_stderr));
        })
        .await;

    match status {
        Ok(status) => InvocationResult {
            label: invocation.label.clone(),
            success: status.success(),
            exit_code: status.code(),
            duration: started.elapsed(),
            stderr: stderr_tail.join("\n"),
            error: None,
        },
        Err(e) => InvocationResult::failed(&invocation.label, started, failure_message(e)),
    }
}

/// The cause alone; callers add the package and tool names.
fn failure_message(error: Error) -> String {
    match error {
        Error::ToolExecution { message, .. } => message,
        other => other.to_string(),
    }
}
