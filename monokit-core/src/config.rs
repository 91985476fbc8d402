//! `monokit.toml` configuration.
//!
//! A global file under the user config directory is read first, then the
//! workspace file overrides it key by key. Tool tables merge per field.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "monokit.toml";

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("monokit").join("config.toml"))
}

/// Per-tool overrides. Every field is optional; unset fields keep the built-in value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    /// Explicit config path, relative to the workspace root.
    pub config: Option<String>,
    /// npm package shipping the shared config.
    pub preset: Option<String>,
    /// File inside `preset`.
    pub config_file: Option<String>,
    /// File names looked up in the package and workspace roots.
    pub local: Option<Vec<String>>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

impl ToolConfig {
    fn merge(self, over: ToolConfig) -> ToolConfig {
        let mut env = self.env;
        env.extend(over.env);
        ToolConfig {
            program: over.program.or(self.program),
            args: over.args.or(self.args),
            config: over.config.or(self.config),
            preset: over.preset.or(self.preset),
            config_file: over.config_file.or(self.config_file),
            local: over.local.or(self.local),
            env,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevConfig {
    /// Source entry candidates, first existing wins.
    #[serde(default = "default_entries")]
    pub entries: Vec<String>,
}

fn default_entries() -> Vec<String> {
    vec!["src/index.ts".to_string(), "src/index.js".to_string()]
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            entries: default_entries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_ts_runner")]
    pub ts_runner: Vec<String>,
    #[serde(default = "default_js_runner")]
    pub js_runner: Vec<String>,
}

fn default_ts_runner() -> Vec<String> {
    vec!["yarn".to_string(), "jiti".to_string()]
}

fn default_js_runner() -> Vec<String> {
    vec!["node".to_string()]
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ts_runner: default_ts_runner(),
            js_runner: default_js_runner(),
        }
    }
}

/// Raw contents of a single config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub max_parallel: Option<usize>,
    pub sequential: Option<bool>,
    #[serde(default)]
    pub tools: IndexMap<String, ToolConfig>,
    pub dev: Option<DevConfigFile>,
    pub run: Option<RunConfigFile>,
}

/// `[dev]` as written in a file; unset keys fall through to the layer below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevConfigFile {
    pub entries: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfigFile {
    pub ts_runner: Option<Vec<String>>,
    pub js_runner: Option<Vec<String>>,
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let file = toml::from_str(&content).map_err(|error| Error::Toml {
            error,
            context: path.display().to_string(),
        })?;
        Ok(Some(file))
    }
}

/// Effective configuration for a workspace.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceConfig {
    pub max_parallel: Option<usize>,
    pub sequential: bool,
    pub tools: IndexMap<String, ToolConfig>,
    pub dev: DevConfig,
    pub run: RunConfig,
    /// Files that contributed, lowest precedence first.
    pub sources: Vec<PathBuf>,
}

impl WorkspaceConfig {
    /// Loads the global config and `monokit.toml` from `root_dir`.
    pub fn load(root_dir: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_global(root_dir, global_config_path().as_deref())
    }

    pub fn load_with_global(root_dir: impl AsRef<Path>, global: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(global) = global {
            if let Some(file) = ConfigFile::read(global)? {
                config.apply(file);
                config.sources.push(global.to_path_buf());
            }
        }

        let workspace_path = root_dir.as_ref().join(CONFIG_FILE);
        if let Some(file) = ConfigFile::read(&workspace_path)? {
            config.apply(file);
            config.sources.push(workspace_path);
        }

        tracing::debug!(sources = config.sources.len(), "loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        let mut config = Self::default();
        config.apply(file);
        Ok(config)
    }

    /// Layers `file` over the current values.
    pub fn apply(&mut self, file: ConfigFile) {
        if file.max_parallel.is_some() {
            self.max_parallel = file.max_parallel;
        }
        if let Some(sequential) = file.sequential {
            self.sequential = sequential;
        }
        if let Some(entries) = file.dev.and_then(|dev| dev.entries) {
            self.dev.entries = entries;
        }
        if let Some(run) = file.run {
            if let Some(ts_runner) = run.ts_runner {
                self.run.ts_runner = ts_runner;
            }
            if let Some(js_runner) = run.js_runner {
                self.run.js_runner = js_runner;
            }
        }
        for (name, tool) in file.tools {
            let merged = match self.tools.shift_remove(&name) {
                Some(existing) => existing.merge(tool),
                None => tool,
            };
            self.tools.insert(name, merged);
        }
    }

    #[inline]
    pub fn tool(&self, name: &str) -> Option<&ToolConfig> {
        self.tools.get(name)
    }
}
