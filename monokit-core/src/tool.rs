//! Tool registry: the commands monokit can dispatch and how to invoke them.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::config::{ToolConfig, WorkspaceConfig};
use crate::error::{Error, Result};

/// Replaced with the resolved config path when rendering arguments.
pub const CONFIG_PLACEHOLDER: &str = "{config}";

/// A shared config file shipped inside an npm package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub module: String,
    pub file: String,
}

/// Where a tool's configuration file may come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSource {
    /// Absolute override, wins unconditionally when it exists.
    pub explicit: Option<PathBuf>,
    /// File names looked up in the package root.
    pub local: Vec<String>,
    /// Also look up `local` names in the workspace root.
    pub search_workspace_root: bool,
    pub preset: Option<Preset>,
}

/// A registered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub config: Option<ConfigSource>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: Vec::new(),
            config: None,
        }
    }

    pub fn with_config(mut self, source: ConfigSource) -> Self {
        self.config = Some(source);
        self
    }

    #[inline]
    pub fn needs_config(&self) -> bool {
        self.config.is_some()
    }

    /// Arguments with every `{config}` occurrence replaced.
    pub fn render_args(&self, config: Option<&Path>) -> Vec<String> {
        let config = config.map(|p| p.display().to_string()).unwrap_or_default();
        self.args
            .iter()
            .map(|arg| arg.replace(CONFIG_PLACEHOLDER, &config))
            .collect()
    }

    fn apply(&mut self, overrides: &ToolConfig, root_dir: &Path) -> Result<()> {
        let has_preset = overrides.preset.is_some()
            || self
                .config
                .as_ref()
                .map_or(false, |source| source.preset.is_some());
        if overrides.config_file.is_some() && !has_preset {
            return Err(Error::InvalidTool {
                name: self.name.clone(),
                message: "'config_file' requires 'preset'".to_string(),
            });
        }

        if let Some(ref program) = overrides.program {
            self.program = program.clone();
        }
        if let Some(ref args) = overrides.args {
            self.args = args.clone();
        }
        for (key, value) in &overrides.env {
            self.env.retain(|(k, _)| k != key);
            self.env.push((key.clone(), value.clone()));
        }

        let touches_config = overrides.config.is_some()
            || overrides.preset.is_some()
            || overrides.local.is_some();
        if !touches_config {
            return Ok(());
        }

        let source = self.config.get_or_insert_with(|| ConfigSource {
            search_workspace_root: true,
            ..ConfigSource::default()
        });
        if let Some(ref explicit) = overrides.config {
            source.explicit = Some(root_dir.join(explicit));
        }
        if let Some(ref local) = overrides.local {
            source.local = local.clone();
        }
        if let Some(ref module) = overrides.preset {
            let file = overrides
                .config_file
                .clone()
                .or_else(|| source.preset.as_ref().map(|p| p.file.clone()))
                .unwrap_or_else(|| "index.js".to_string());
            source.preset = Some(Preset {
                module: module.clone(),
                file,
            });
        } else if let (Some(file), Some(preset)) = (&overrides.config_file, source.preset.as_mut()) {
            preset.file = file.clone();
        }
        Ok(())
    }
}

static BUILTIN_TOOLS: Lazy<IndexMap<String, ToolSpec>> = Lazy::new(|| {
    let jest = ToolSpec::new("jest", "yarn", &["jest", "--passWithNoTests", "-c", CONFIG_PLACEHOLDER])
        .with_config(ConfigSource {
            explicit: None,
            local: vec!["jest.config.js".to_string(), "jest.config.ts".to_string()],
            search_workspace_root: true,
            preset: Some(Preset {
                module: "@siroc/jest-preset".to_string(),
                file: "jest.config.js".to_string(),
            }),
        });

    let eslint = ToolSpec::new(
        "eslint",
        "yarn",
        &["eslint", "-c", CONFIG_PLACEHOLDER, "--ext", ".js,.ts", "."],
    )
    .with_config(ConfigSource {
        explicit: None,
        local: vec![".eslintrc.js".to_string(), ".eslintrc.json".to_string()],
        search_workspace_root: true,
        preset: Some(Preset {
            module: "@siroc/eslint-config".to_string(),
            file: ".eslintrc.js".to_string(),
        }),
    });

    let rollup = ToolSpec::new("rollup", "yarn", &["rollup", "-c", CONFIG_PLACEHOLDER])
        .with_config(ConfigSource {
            explicit: None,
            local: vec![
                "rollup.config.js".to_string(),
                "rollup.config.mjs".to_string(),
                "rollup.config.ts".to_string(),
            ],
            search_workspace_root: true,
            preset: None,
        });

    [jest, eslint, rollup]
        .into_iter()
        .map(|spec| (spec.name.clone(), spec))
        .collect()
});

/// Maps command names to tool specs.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolSpec>,
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Registry holding `jest`, `eslint` and `rollup`.
    pub fn builtin() -> Self {
        Self {
            tools: BUILTIN_TOOLS.clone(),
        }
    }

    /// Built-in tools with `[tools.*]` overrides applied.
    ///
    /// Tables naming an unknown tool define a new one and must set `program`.
    /// `config_file` is only valid for tools that end up with a preset.
    pub fn from_config(config: &WorkspaceConfig, root_dir: &Path) -> Result<Self> {
        let mut registry = Self::builtin();
        for (name, overrides) in &config.tools {
            match registry.tools.get_mut(name) {
                Some(spec) => spec.apply(overrides, root_dir)?,
                None => {
                    let program = overrides.program.clone().ok_or_else(|| Error::InvalidTool {
                        name: name.clone(),
                        message: "custom tools must set 'program'".to_string(),
                    })?;
                    let mut spec = ToolSpec {
                        name: name.clone(),
                        program,
                        args: Vec::new(),
                        env: Vec::new(),
                        config: None,
                    };
                    spec.apply(overrides, root_dir)?;
                    registry.register(spec);
                }
            }
        }
        Ok(registry)
    }

    /// Registers or replaces a tool.
    pub fn register(&mut self, spec: ToolSpec) {
        self.tools.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Result<&ToolSpec> {
        self.tools.get(name).ok_or_else(|| Error::UnknownCommand {
            name: name.to_string(),
            available: self.names().join(", "),
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|k| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
