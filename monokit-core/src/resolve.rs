//! Tool configuration file resolution.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::tool::ToolSpec;

/// Finds the config file a tool should run with for a given package.
///
/// Candidates are tried in order: the explicit override, local files in the
/// package root, local files in the workspace root, then the preset module
/// looked up through `node_modules` in every ancestor of the package root.
pub struct ConfigResolver<'a> {
    workspace_root: &'a Path,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(workspace_root: &'a Path) -> Self {
        Self { workspace_root }
    }

    /// Resolves the config for `tool` in `package_root`.
    ///
    /// Returns `Ok(None)` for tools that take no config file.
    pub fn resolve(&self, tool: &ToolSpec, package_root: &Path) -> Result<Option<PathBuf>> {
        if tool.config.is_none() {
            return Ok(None);
        }

        let candidates = self.candidates(tool, package_root);
        for candidate in &candidates {
            if candidate.is_file() {
                tracing::debug!(tool = %tool.name, config = %candidate.display(), "resolved config");
                return Ok(Some(candidate.clone()));
            }
        }

        Err(Error::ConfigNotResolved {
            tool: tool.name.clone(),
            attempted: candidates,
        })
    }

    /// Every path `resolve` would try, in order, without duplicates.
    pub fn candidates(&self, tool: &ToolSpec, package_root: &Path) -> Vec<PathBuf> {
        let Some(ref source) = tool.config else {
            return Vec::new();
        };

        let mut candidates: Vec<PathBuf> = Vec::new();
        let mut push = |path: PathBuf| {
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        };

        if let Some(ref explicit) = source.explicit {
            push(explicit.clone());
        }
        for name in &source.local {
            push(package_root.join(name));
        }
        if source.search_workspace_root {
            for name in &source.local {
                push(self.workspace_root.join(name));
            }
        }
        if let Some(ref preset) = source.preset {
            for dir in package_root.ancestors() {
                push(dir.join("node_modules").join(&preset.module).join(&preset.file));
            }
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::tool::{ConfigSource, Preset, ToolSpec};

    fn tool() -> ToolSpec {
        ToolSpec::new("jest", "yarn", &["jest", "-c", "{config}"]).with_config(ConfigSource {
            explicit: None,
            local: vec!["jest.config.js".to_string()],
            search_workspace_root: true,
            preset: Some(Preset {
                module: "@scope/preset".to_string(),
                file: "jest.config.js".to_string(),
            }),
        })
    }

    #[test]
    fn package_local_config_wins_over_preset() {
        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join("packages/a");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("jest.config.js"), "").unwrap();
        let preset_dir = temp.path().join("node_modules/@scope/preset");
        fs::create_dir_all(&preset_dir).unwrap();
        fs::write(preset_dir.join("jest.config.js"), "").unwrap();

        let resolver = ConfigResolver::new(temp.path());
        let resolved = resolver.resolve(&tool(), &pkg).unwrap();
        assert_eq!(resolved, Some(pkg.join("jest.config.js")));
    }

    #[test]
    fn preset_found_in_ancestor_node_modules() {
        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join("packages/a");
        fs::create_dir_all(&pkg).unwrap();
        let preset_dir = temp.path().join("node_modules/@scope/preset");
        fs::create_dir_all(&preset_dir).unwrap();
        fs::write(preset_dir.join("jest.config.js"), "").unwrap();

        let resolver = ConfigResolver::new(temp.path());
        let resolved = resolver.resolve(&tool(), &pkg).unwrap();
        assert_eq!(resolved, Some(preset_dir.join("jest.config.js")));
    }

    #[test]
    fn tools_without_config_resolve_to_none() {
        let temp = TempDir::new().unwrap();
        let resolver = ConfigResolver::new(temp.path());
        let spec = ToolSpec::new("tsc", "yarn", &["tsc"]);
        assert_eq!(resolver.resolve(&spec, temp.path()).unwrap(), None);
    }

    #[test]
    fn candidates_are_ordered_and_unique() {
        let temp = TempDir::new().unwrap();
        let resolver = ConfigResolver::new(temp.path());
        // Package root equal to workspace root must not repeat the local lookup.
        let candidates = resolver.candidates(&tool(), temp.path());
        assert_eq!(candidates[0], temp.path().join("jest.config.js"));
        assert_eq!(
            candidates[1],
            temp.path().join("node_modules/@scope/preset/jest.config.js")
        );
        let mut deduped = candidates.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), candidates.len());
    }
}
