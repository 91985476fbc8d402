//! Workspace package model.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::manifest::PackageManifest;

/// A package in the workspace, identified by its manifest name.
#[derive(Debug, Clone, Serialize)]
pub struct Package {
    pub name: String,
    pub root: PathBuf,
    pub manifest: PackageManifest,
}

impl Package {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, manifest: PackageManifest) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            manifest,
        }
    }

    /// Loads the package rooted at `root`.
    ///
    /// Packages without a `name` field are named after their directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let manifest = PackageManifest::load(&root)?;
        let name = manifest
            .name
            .clone()
            .unwrap_or_else(|| dir_name(&root));
        Ok(Self {
            name,
            root,
            manifest,
        })
    }

    #[inline]
    pub fn version(&self) -> Option<&str> {
        self.manifest.version.as_deref()
    }

    /// Path of `relative` inside this package.
    #[inline]
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

fn dir_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| root.display().to_string())
}
