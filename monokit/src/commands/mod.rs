//! Command implementations for the CLI.

mod dev;
mod discovery;
mod execution;
mod info;
mod reporter;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use monokit_core::{Workspace, WorkspaceConfig};

use crate::formatting::{eprint_success, format_elapsed, print_success};

pub use dev::cmd_dev;
pub use discovery::cmd_list;
pub use execution::{cmd_build, cmd_lint, cmd_run, cmd_test, cmd_tool, DispatchArgs};
pub use info::cmd_changelog;

/// The discovered workspace and its effective configuration.
struct Project {
    workspace: Workspace,
    config: WorkspaceConfig,
}

impl Project {
    fn load(cwd: &Path) -> Result<Self> {
        let workspace = Workspace::discover(cwd)?;
        let config = WorkspaceConfig::load(workspace.root_dir())?;
        tracing::debug!(
            root = %workspace.root_dir().display(),
            members = workspace.members().len(),
            config_files = config.sources.len(),
            "loaded workspace"
        );
        Ok(Self { workspace, config })
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create tokio runtime")
}

/// Runs `action` and prints `Finished <phase> in <time>` when it succeeds.
pub fn timed<T>(phase: &str, action: impl FnOnce() -> Result<T>) -> Result<T> {
    report_elapsed(phase, print_success, action)
}

/// `timed` for commands whose stdout is their product, such as `changelog`.
pub fn timed_stderr<T>(phase: &str, action: impl FnOnce() -> Result<T>) -> Result<T> {
    report_elapsed(phase, eprint_success, action)
}

fn report_elapsed<T>(phase: &str, report: fn(&str), action: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = Instant::now();
    let value = action()?;
    report(&format!("Finished {} in {}", phase, format_elapsed(start.elapsed())));
    Ok(value)
}
