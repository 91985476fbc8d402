use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use monokit_core::dispatch::{CommandOptions, DispatchReporter, Dispatcher, Outcome};
use monokit_core::error::Error;
use monokit_core::runner::{Executor, Invocation, InvocationResult, RunOptions};
use monokit_core::tool::ToolRegistry;
use monokit_core::workspace::Workspace;
use tempfile::TempDir;

/// Records invocations and reports them as succeeded, except for `failing` labels.
#[derive(Default)]
struct RecordingExecutor {
    calls: Mutex<Vec<Invocation>>,
    failing: Vec<String>,
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(&self, invocations: Vec<Invocation>, _options: &RunOptions) -> Vec<InvocationResult> {
        let mut calls = self.calls.lock().unwrap();
        invocations
            .into_iter()
            .map(|invocation| {
                let success = !self.failing.contains(&invocation.label);
                let result = InvocationResult {
                    label: invocation.label.clone(),
                    success,
                    exit_code: Some(if success { 0 } else { 1 }),
                    duration: Duration::from_millis(1),
                    stderr: if success { String::new() } else { "boom".to_string() },
                    error: None,
                };
                calls.push(invocation);
                result
            })
            .collect()
    }
}

#[derive(Default, Clone)]
struct CollectingReporter {
    unresolved: Arc<Mutex<Vec<String>>>,
    failed: Arc<Mutex<Vec<String>>>,
}

impl DispatchReporter for CollectingReporter {
    fn config_unresolved(&self, package: &str, error: &Error) {
        self.unresolved
            .lock()
            .unwrap()
            .push(format!("{}: {}", package, error));
    }

    fn invocation_failed(&self, package: &str, _tool: &str, _result: &InvocationResult) {
        self.failed.lock().unwrap().push(package.to_string());
    }
}

fn setup_workspace(dir: &Path, packages: &[&str]) {
    fs::write(
        dir.join("package.json"),
        r#"{"name": "root", "private": true, "workspaces": ["packages/*"]}"#,
    )
    .unwrap();
    for name in packages {
        let pkg_dir = dir.join("packages").join(name);
        fs::create_dir_all(&pkg_dir).unwrap();
        fs::write(
            pkg_dir.join("package.json"),
            format!(r#"{{"name": "{}"}}"#, name),
        )
        .unwrap();
    }
}

fn install_jest_preset(dir: &Path) -> std::path::PathBuf {
    let preset = dir.join("node_modules/@siroc/jest-preset");
    fs::create_dir_all(&preset).unwrap();
    let config = preset.join("jest.config.js");
    fs::write(&config, "module.exports = {}").unwrap();
    config
}

fn dispatcher(dir: &Path, executor: Arc<RecordingExecutor>) -> Dispatcher {
    let workspace = Workspace::load(dir).unwrap();
    Dispatcher::new(workspace, ToolRegistry::builtin(), executor)
}

#[tokio::test]
async fn test_jest_runs_once_per_named_package() {
    let temp_dir = TempDir::new().unwrap();
    setup_workspace(temp_dir.path(), &["a", "b"]);
    let config = install_jest_preset(temp_dir.path());

    let executor = Arc::new(RecordingExecutor::default());
    let dispatcher = dispatcher(temp_dir.path(), Arc::clone(&executor));
    let options = CommandOptions::new("jest", vec!["a".to_string(), "b".to_string()]);

    let report = dispatcher.dispatch(&options).await.unwrap();

    assert!(report.is_success());
    let calls = executor.calls.lock().unwrap();
    let labels: Vec<&str> = calls.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["a", "b"]);
    for call in calls.iter() {
        assert_eq!(call.program, "yarn");
        assert_eq!(
            call.args,
            vec![
                "jest".to_string(),
                "--passWithNoTests".to_string(),
                "-c".to_string(),
                config.display().to_string(),
            ]
        );
        assert_eq!(call.cwd, temp_dir.path().join("packages").join(&call.label));
    }
}

#[tokio::test]
async fn test_no_packages_targets_root() {
    let temp_dir = TempDir::new().unwrap();
    setup_workspace(temp_dir.path(), &["a", "b"]);
    install_jest_preset(temp_dir.path());

    let executor = Arc::new(RecordingExecutor::default());
    let dispatcher = dispatcher(temp_dir.path(), Arc::clone(&executor));

    let report = dispatcher
        .dispatch(&CommandOptions::new("jest", vec![]))
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].package, "root");
    let calls = executor.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].cwd, temp_dir.path());
}

#[tokio::test]
async fn test_unknown_package_aborts_before_spawning() {
    let temp_dir = TempDir::new().unwrap();
    setup_workspace(temp_dir.path(), &["a"]);
    install_jest_preset(temp_dir.path());

    let executor = Arc::new(RecordingExecutor::default());
    let dispatcher = dispatcher(temp_dir.path(), Arc::clone(&executor));
    let options = CommandOptions::new("jest", vec!["a".to_string(), "ghost".to_string()]);

    let err = dispatcher.dispatch(&options).await.unwrap_err();
    assert!(matches!(err, Error::PackageNotFound { ref name, .. } if name == "ghost"));
    assert!(executor.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_command_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    setup_workspace(temp_dir.path(), &["a"]);

    let executor = Arc::new(RecordingExecutor::default());
    let dispatcher = dispatcher(temp_dir.path(), Arc::clone(&executor));

    let err = dispatcher
        .dispatch(&CommandOptions::new("mocha", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownCommand { .. }));
}

#[tokio::test]
async fn test_missing_config_reports_and_continues_siblings() {
    let temp_dir = TempDir::new().unwrap();
    setup_workspace(temp_dir.path(), &["a", "b"]);
    // Only `b` has a local config; no preset is installed.
    fs::write(
        temp_dir.path().join("packages/b/jest.config.js"),
        "module.exports = {}",
    )
    .unwrap();

    let executor = Arc::new(RecordingExecutor::default());
    let reporter = CollectingReporter::default();
    let dispatcher = dispatcher(temp_dir.path(), Arc::clone(&executor)).with_reporter(reporter.clone());
    let options = CommandOptions::new("jest", vec!["a".to_string(), "b".to_string()]);

    let report = dispatcher.dispatch(&options).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);

    let a = &report.outcomes[0];
    assert_eq!(a.package, "a");
    match a.outcome {
        Outcome::ConfigUnresolved { ref attempted } => {
            assert!(attempted.contains(&temp_dir.path().join("packages/a/jest.config.js")));
            assert!(attempted.contains(
                &temp_dir
                    .path()
                    .join("node_modules/@siroc/jest-preset/jest.config.js")
            ));
        }
        ref other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(a.detail.contains("jest"));

    assert_eq!(report.outcomes[1].package, "b");
    assert!(report.outcomes[1].is_success());

    let unresolved = reporter.unresolved.lock().unwrap();
    assert_eq!(unresolved.len(), 1);
    assert!(unresolved[0].starts_with("a: Couldn't resolve jest config"));

    let calls = executor.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].label, "b");
}

#[tokio::test]
async fn test_failed_tool_is_recorded() {
    let temp_dir = TempDir::new().unwrap();
    setup_workspace(temp_dir.path(), &["a", "b"]);
    install_jest_preset(temp_dir.path());

    let executor = Arc::new(RecordingExecutor {
        failing: vec!["a".to_string()],
        ..RecordingExecutor::default()
    });
    let reporter = CollectingReporter::default();
    let dispatcher = dispatcher(temp_dir.path(), Arc::clone(&executor)).with_reporter(reporter.clone());
    let options = CommandOptions::new("jest", vec!["a".to_string(), "b".to_string()]);

    let report = dispatcher.dispatch(&options).await.unwrap();

    assert_eq!(
        report.outcomes[0].outcome,
        Outcome::Failed { exit_code: Some(1) }
    );
    assert_eq!(report.outcomes[0].detail, "boom");
    assert!(report.outcomes[1].is_success());
    assert_eq!(*reporter.failed.lock().unwrap(), vec!["a".to_string()]);
}

#[test]
fn test_plan_appends_extra_args_and_env() {
    let temp_dir = TempDir::new().unwrap();
    setup_workspace(temp_dir.path(), &["a"]);
    fs::write(temp_dir.path().join("rollup.config.js"), "").unwrap();

    let executor = Arc::new(RecordingExecutor::default());
    let dispatcher = dispatcher(temp_dir.path(), executor);
    let options = CommandOptions {
        extra_args: vec!["--watch".to_string()],
        env: vec![("NODE_ENV".to_string(), "development".to_string())],
        ..CommandOptions::new("rollup", vec!["a".to_string()])
    };

    let plan = dispatcher.plan(&options).unwrap();

    assert!(plan.unresolved.is_empty());
    let invocation = &plan.invocations[0];
    assert_eq!(
        invocation.args,
        vec![
            "rollup".to_string(),
            "-c".to_string(),
            temp_dir.path().join("rollup.config.js").display().to_string(),
            "--watch".to_string(),
        ]
    );
    assert_eq!(
        invocation.env,
        vec![("NODE_ENV".to_string(), "development".to_string())]
    );
}
