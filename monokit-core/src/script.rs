//! Planning for `run`: scripts by extension, anything else as a command.

use std::path::Path;

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::runner::Invocation;
use crate::workspace::Workspace;

const TS_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];
const JS_EXTENSIONS: &[&str] = &["js", "mjs", "cjs"];

pub struct ScriptPlanner<'a> {
    config: &'a RunConfig,
}

impl<'a> ScriptPlanner<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self { config }
    }

    /// Single invocation in `dir`, labelled after the directory.
    pub fn plan_local(&self, dir: &Path, file: &str, args: &[String]) -> Result<Invocation> {
        let label = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());
        self.plan_in(&label, dir, file, args)
    }

    /// One invocation per workspace member, in member order.
    pub fn plan_workspaces(&self, workspace: &Workspace, file: &str, args: &[String]) -> Result<Vec<Invocation>> {
        workspace
            .members()
            .iter()
            .map(|package| self.plan_in(&package.name, &package.root, file, args))
            .collect()
    }

    fn plan_in(&self, label: &str, dir: &Path, file: &str, args: &[String]) -> Result<Invocation> {
        let script = dir.join(file);
        let extension = script
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        let runner = match extension.as_deref() {
            Some(ext) if script.is_file() && TS_EXTENSIONS.contains(&ext) => Some(&self.config.ts_runner),
            Some(ext) if script.is_file() && JS_EXTENSIONS.contains(&ext) => Some(&self.config.js_runner),
            _ => None,
        };

        let invocation = match runner {
            Some(runner) => {
                let (program, runner_args) = runner.split_first().ok_or_else(|| Error::InvalidTool {
                    name: "run".to_string(),
                    message: "script runner command is empty".to_string(),
                })?;
                Invocation::new(label, dir, program.as_str())
                    .args(runner_args.iter().cloned())
                    .arg(script.display().to_string())
                    .args(args.iter().cloned())
            }
            None => Invocation::new(label, dir, file).args(args.iter().cloned()),
        };
        Ok(invocation)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn typescript_file_uses_ts_runner() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("task.ts"), "").unwrap();
        let config = RunConfig::default();
        let planner = ScriptPlanner::new(&config);

        let invocation = planner
            .plan_local(temp.path(), "task.ts", &["--flag".to_string()])
            .unwrap();
        assert_eq!(invocation.program, "yarn");
        assert_eq!(invocation.args[0], "jiti");
        assert!(invocation.args[1].ends_with("task.ts"));
        assert_eq!(invocation.args[2], "--flag");
    }

    #[test]
    fn missing_file_runs_as_command() {
        let temp = TempDir::new().unwrap();
        let config = RunConfig::default();
        let planner = ScriptPlanner::new(&config);

        let invocation = planner.plan_local(temp.path(), "ls", &["-la".to_string()]).unwrap();
        assert_eq!(invocation.program, "ls");
        assert_eq!(invocation.args, vec!["-la".to_string()]);
    }

    #[test]
    fn empty_runner_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("task.js"), "").unwrap();
        let config = RunConfig {
            ts_runner: vec![],
            js_runner: vec![],
        };
        let planner = ScriptPlanner::new(&config);
        assert!(planner.plan_local(temp.path(), "task.js", &[]).is_err());
    }
}
