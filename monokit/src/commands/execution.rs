//! Tool dispatch and script commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use monokit_core::{
    CommandOptions, DispatchReport, Dispatcher, Error, Executor, InvocationResult, ProcessRunner,
    RunOptions, ScriptPlanner, ToolRegistry, Workspace, WorkspaceConfig,
};
use owo_colors::OwoColorize;

use crate::formatting::{
    print_error, print_outcome_table, print_section_header, print_separator_with_spacing,
    print_summary_box, print_warning, SectionStyle,
};

use super::reporter::CliDispatchReporter;
use super::{runtime, Project};

/// Flags shared by every command that dispatches a tool per package.
#[derive(Args, Debug, Clone, Default)]
pub struct DispatchArgs {
    /// Packages to run in. Defaults to the workspace root.
    pub packages: Vec<String>,

    /// Maximum number of packages processed at once.
    #[arg(short = 'j', long)]
    pub parallel: Option<usize>,

    /// Process one package at a time.
    #[arg(long, action)]
    pub sequential: bool,

    /// Arguments forwarded to the tool.
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

impl DispatchArgs {
    fn run_options(&self, config: &WorkspaceConfig) -> RunOptions {
        RunOptions {
            max_parallel: self.parallel.or(config.max_parallel),
            sequential: self.sequential || config.sequential,
        }
    }
}

fn print_prefixed_line(label: &str, line: &str, is_stderr: bool) {
    let prefix = format!("[{}]", label);
    if is_stderr {
        eprintln!("  {} {}", prefix.bright_black().bold(), line.bright_red());
    } else {
        println!("  {} {}", prefix.bright_black().bold(), line);
    }
}

fn dispatch_tool(
    cwd: &Path,
    tool: &str,
    title: &str,
    args: DispatchArgs,
    leading_args: Vec<String>,
    env: Vec<(String, String)>,
) -> Result<()> {
    let Project { workspace, config } = Project::load(cwd)?;
    let registry = ToolRegistry::from_config(&config, workspace.root_dir())?;
    let run = args.run_options(&config);

    let mut extra_args = leading_args;
    extra_args.extend(args.extra_args);
    let options = CommandOptions {
        command: tool.to_string(),
        packages: args.packages,
        extra_args,
        env,
        run,
    };

    let runner = ProcessRunner::new().with_output_handler(print_prefixed_line);
    let dispatcher =
        Dispatcher::new(workspace, registry, Arc::new(runner)).with_reporter(CliDispatchReporter);

    print_section_header(title, SectionStyle::Primary);
    let report = runtime()?.block_on(dispatcher.dispatch(&options))?;
    print_report(&report)
}

fn print_report(report: &DispatchReport) -> Result<()> {
    print_separator_with_spacing();
    print_outcome_table(report);
    println!();

    let total = report.outcomes.len().to_string();
    let succeeded = report.succeeded().to_string();
    let failed = report.failed().to_string();
    print_summary_box(
        "Summary",
        &[
            ("Packages", &total),
            ("Succeeded", &succeeded),
            ("Failed", &failed),
        ],
    );
    println!();

    if !report.is_success() {
        bail!(
            "{} failed for {} of {} packages",
            report.tool,
            report.failed(),
            report.outcomes.len()
        );
    }
    Ok(())
}

/// Bundles packages with rollup. `NODE_ENV` is `development` with `--dev`.
pub fn cmd_build(cwd: &Path, args: DispatchArgs, watch: bool, dev: bool) -> Result<()> {
    let leading_args = if watch {
        vec!["--watch".to_string()]
    } else {
        Vec::new()
    };
    let node_env = if dev { "development" } else { "production" };
    dispatch_tool(
        cwd,
        "rollup",
        "Building packages",
        args,
        leading_args,
        vec![("NODE_ENV".to_string(), node_env.to_string())],
    )
}

pub fn cmd_test(cwd: &Path, args: DispatchArgs) -> Result<()> {
    dispatch_tool(cwd, "jest", "Running tests", args, Vec::new(), Vec::new())
}

pub fn cmd_lint(cwd: &Path, args: DispatchArgs) -> Result<()> {
    dispatch_tool(cwd, "eslint", "Linting packages", args, Vec::new(), Vec::new())
}

pub fn cmd_tool(cwd: &Path, name: &str, args: DispatchArgs) -> Result<()> {
    let title = format!("Running {}", name);
    dispatch_tool(cwd, name, &title, args, Vec::new(), Vec::new())
}

/// Runs a script or command in `cwd`, or in every workspace member.
pub fn cmd_run(
    cwd: &Path,
    file: &str,
    args: &[String],
    workspaces: bool,
    sequential: bool,
) -> Result<()> {
    let (invocations, config) = if workspaces {
        let Project { workspace, config } = Project::load(cwd)?;
        let invocations = ScriptPlanner::new(&config.run).plan_workspaces(&workspace, file, args)?;
        (invocations, config)
    } else {
        let config = match Workspace::discover(cwd) {
            Ok(workspace) => WorkspaceConfig::load(workspace.root_dir())?,
            Err(Error::ManifestNotFound(_)) => WorkspaceConfig::load(cwd)?,
            Err(e) => return Err(e.into()),
        };
        let invocation = ScriptPlanner::new(&config.run).plan_local(cwd, file, args)?;
        (vec![invocation], config)
    };

    if invocations.is_empty() {
        print_warning("No workspace packages found");
        return Ok(());
    }

    let options = RunOptions {
        max_parallel: config.max_parallel,
        sequential: sequential || config.sequential,
    };
    let total = invocations.len();
    let runner = ProcessRunner::new().with_output_handler(print_prefixed_line);
    let results = runtime()?.block_on(runner.execute(invocations, &options));

    let failures: Vec<&InvocationResult> = results.iter().filter(|r| !r.success).collect();
    for failure in &failures {
        print_error(&describe_failure(failure));
    }
    if !failures.is_empty() {
        bail!("{} failed in {} of {} locations", file, failures.len(), total);
    }
    Ok(())
}

fn describe_failure(result: &InvocationResult) -> String {
    match (&result.error, result.exit_code) {
        (Some(message), _) => format!("[{}] {}", result.label, message),
        (None, Some(code)) => format!("[{}] exited with code {}", result.label, code),
        (None, None) => format!("[{}] terminated by signal", result.label),
    }
}
