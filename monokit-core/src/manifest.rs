//! `package.json` manifest parsing.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MANIFEST_FILE: &str = "package.json";

/// Workspace globs as declared by npm and yarn.
///
/// Both the array form and the `{ "packages": [...] }` object form are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Workspaces {
    Globs(Vec<String>),
    Config {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl Workspaces {
    pub fn patterns(&self) -> &[String] {
        match self {
            Workspaces::Globs(globs) => globs,
            Workspaces::Config { packages } => packages,
        }
    }
}

/// The subset of `package.json` monokit reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default, alias = "typings")]
    pub types: Option<String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
    #[serde(default)]
    pub workspaces: Option<Workspaces>,
}

impl PackageManifest {
    /// Reads `package.json` from a package directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ManifestNotFound(path.clone())
            } else {
                Error::Io(e)
            }
        })?;
        Self::parse(&content, &path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(content).map_err(|error| Error::Json {
            error,
            path: path.to_path_buf(),
        })
    }

    #[inline]
    pub fn workspace_patterns(&self) -> &[String] {
        self.workspaces
            .as_ref()
            .map(|w| w.patterns())
            .unwrap_or_default()
    }

    #[inline]
    pub fn declares_workspaces(&self) -> bool {
        self.workspaces.is_some()
    }
}
