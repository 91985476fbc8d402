//! Command dispatch across workspace packages.
//!
//! Dispatch is best effort: a package whose tool config cannot be resolved, or
//! whose process fails, is recorded and its siblings still run. Unknown tools
//! and unknown package names fail the whole dispatch before anything spawns.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::resolve::ConfigResolver;
use crate::runner::{Executor, Invocation, InvocationResult, RunOptions};
use crate::tool::{ToolRegistry, ToolSpec};
use crate::workspace::Workspace;

/// Options for a single dispatch, built once per CLI invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Registered tool name, e.g. `jest`.
    pub command: String,
    /// Package-name filters. Empty targets the workspace root.
    pub packages: Vec<String>,
    /// Appended after the tool's own arguments.
    pub extra_args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub run: RunOptions,
}

impl CommandOptions {
    pub fn new(command: impl Into<String>, packages: Vec<String>) -> Self {
        Self {
            command: command.into(),
            packages,
            ..Self::default()
        }
    }
}

/// Per-package result category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed { exit_code: Option<i32> },
    ConfigUnresolved { attempted: Vec<PathBuf> },
    SpawnFailed,
}

#[derive(Debug, Clone)]
pub struct PackageOutcome {
    pub package: String,
    pub outcome: Outcome,
    pub duration: Option<Duration>,
    /// Error message or stderr tail; empty on success.
    pub detail: String,
}

impl PackageOutcome {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }
}

/// Results of a dispatch, in target order.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub tool: String,
    pub outcomes: Vec<PackageOutcome>,
}

impl DispatchReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.is_success())
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// What a dispatch will do, before any process is spawned.
#[derive(Debug)]
pub struct DispatchPlan {
    pub tool: ToolSpec,
    pub targets: Vec<String>,
    pub invocations: Vec<Invocation>,
    pub unresolved: Vec<(String, Error)>,
}

/// Receives per-package failures so the library never writes to the terminal.
pub trait DispatchReporter: Send + Sync {
    fn config_unresolved(&self, package: &str, error: &Error);
    fn invocation_failed(&self, package: &str, tool: &str, result: &InvocationResult);
}

/// Reporter that only logs.
pub struct LogReporter;

impl DispatchReporter for LogReporter {
    fn config_unresolved(&self, package: &str, error: &Error) {
        tracing::error!(package, "{}", error);
    }

    fn invocation_failed(&self, package: &str, tool: &str, result: &InvocationResult) {
        tracing::error!(package, tool, exit_code = ?result.exit_code, "tool failed");
    }
}

pub struct Dispatcher {
    workspace: Workspace,
    registry: ToolRegistry,
    executor: Arc<dyn Executor>,
    reporter: Box<dyn DispatchReporter>,
}

impl Dispatcher {
    pub fn new(workspace: Workspace, registry: ToolRegistry, executor: Arc<dyn Executor>) -> Self {
        Self {
            workspace,
            registry,
            executor,
            reporter: Box::new(LogReporter),
        }
    }

    pub fn with_reporter<R>(mut self, reporter: R) -> Self
    where
        R: DispatchReporter + 'static,
    {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Resolves the tool, the targets and each target's config.
    pub fn plan(&self, options: &CommandOptions) -> Result<DispatchPlan> {
        let tool = self.registry.get(&options.command)?.clone();
        let targets = self.workspace.resolve(&options.packages)?;
        let resolver = ConfigResolver::new(self.workspace.root_dir());

        let mut invocations = Vec::with_capacity(targets.len());
        let mut unresolved = Vec::new();
        for package in &targets {
            match resolver.resolve(&tool, &package.root) {
                Ok(config) => {
                    let mut invocation = Invocation::new(&package.name, &package.root, &tool.program)
                        .args(tool.render_args(config.as_deref()))
                        .args(options.extra_args.iter().cloned());
                    invocation.env.extend(tool.env.iter().cloned());
                    invocation.env.extend(options.env.iter().cloned());
                    invocations.push(invocation);
                }
                Err(e) => unresolved.push((package.name.clone(), e)),
            }
        }

        Ok(DispatchPlan {
            tool,
            targets: targets.iter().map(|p| p.name.clone()).collect(),
            invocations,
            unresolved,
        })
    }

    /// Runs the tool once per target and collects a report.
    pub async fn dispatch(&self, options: &CommandOptions) -> Result<DispatchReport> {
        let plan = self.plan(options)?;
        let mut outcomes: HashMap<String, PackageOutcome> = HashMap::new();

        for (package, error) in &plan.unresolved {
            self.reporter.config_unresolved(package, error);
            let attempted = match error {
                Error::ConfigNotResolved { attempted, .. } => attempted.clone(),
                _ => Vec::new(),
            };
            outcomes.insert(
                package.clone(),
                PackageOutcome {
                    package: package.clone(),
                    outcome: Outcome::ConfigUnresolved { attempted },
                    duration: None,
                    detail: error.to_string(),
                },
            );
        }

        let results = self.executor.execute(plan.invocations, &options.run).await;
        for result in results {
            let outcome = if result.success {
                Outcome::Succeeded
            } else if result.error.is_some() {
                Outcome::SpawnFailed
            } else {
                Outcome::Failed {
                    exit_code: result.exit_code,
                }
            };
            if outcome != Outcome::Succeeded {
                self.reporter
                    .invocation_failed(&result.label, &plan.tool.name, &result);
            }
            let detail = result.error.clone().unwrap_or_else(|| result.stderr.clone());
            outcomes.insert(
                result.label.clone(),
                PackageOutcome {
                    package: result.label,
                    outcome,
                    duration: Some(result.duration),
                    detail,
                },
            );
        }

        let ordered = plan
            .targets
            .iter()
            .filter_map(|name| outcomes.remove(name))
            .collect();

        Ok(DispatchReport {
            tool: plan.tool.name,
            outcomes: ordered,
        })
    }
}
