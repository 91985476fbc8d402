//! Core library for dispatching external tools across workspace packages.

pub mod changelog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod manifest;
pub mod package;
pub mod resolve;
pub mod runner;
pub mod script;
pub mod streaming;
pub mod stub;
pub mod tool;
pub mod workspace;

pub use changelog::{Bump, Changelog, Commit, Section};
pub use config::{ToolConfig, WorkspaceConfig};
pub use dispatch::{
    CommandOptions, DispatchPlan, DispatchReport, DispatchReporter, Dispatcher, LogReporter,
    Outcome, PackageOutcome,
};
pub use error::{Error, Result};
pub use manifest::{PackageManifest, Workspaces};
pub use package::Package;
pub use resolve::ConfigResolver;
pub use runner::{Executor, Invocation, InvocationResult, OutputMode, ProcessRunner, RunOptions};
pub use script::ScriptPlanner;
pub use streaming::StreamingProcess;
pub use stub::{Stub, StubGenerator, StubKind};
pub use tool::{ConfigSource, Preset, ToolRegistry, ToolSpec};
pub use workspace::{PatternSet, Workspace};
