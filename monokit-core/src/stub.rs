//! Development stubs.
//!
//! A stub sits at a package's build output path and loads the source entry at
//! runtime through `jiti`, so dependents can use the package without a bundle.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::DevConfig;
use crate::error::{Error, Result};
use crate::package::Package;

/// Which manifest field a stub was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubKind {
    /// `main`: CommonJS.
    Main,
    /// `module`: ES module.
    Module,
    /// `types`: declaration re-export.
    Types,
}

impl StubKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StubKind::Main => "main",
            StubKind::Module => "module",
            StubKind::Types => "types",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stub {
    pub kind: StubKind,
    pub path: PathBuf,
    pub contents: String,
}

pub struct StubGenerator<'a> {
    config: &'a DevConfig,
}

impl<'a> StubGenerator<'a> {
    pub fn new(config: &'a DevConfig) -> Self {
        Self { config }
    }

    /// First configured entry that exists in the package.
    pub fn find_entry(&self, package: &Package) -> Result<PathBuf> {
        self.config
            .entries
            .iter()
            .map(|entry| package.resolve(entry))
            .find(|path| path.is_file())
            .ok_or_else(|| Error::Stub {
                package: package.name.clone(),
                message: format!(
                    "no source entry found (tried {})",
                    self.config.entries.join(", ")
                ),
            })
    }

    /// Computes the stubs for `package` without touching the filesystem.
    pub fn plan(&self, package: &Package) -> Result<Vec<Stub>> {
        let entry = self.find_entry(package)?;
        let manifest = &package.manifest;
        let outputs = [
            (StubKind::Main, manifest.main.as_deref()),
            (StubKind::Module, manifest.module.as_deref()),
            (StubKind::Types, manifest.types.as_deref()),
        ];

        let mut stubs = Vec::new();
        for (kind, field) in outputs {
            let Some(field) = field else { continue };
            let path = package.resolve(with_default_extension(field, kind));
            let contents = match kind {
                StubKind::Main => format!(
                    "module.exports = require('jiti')(null, {{ interopDefault: true }})('{}')\n",
                    js_path(&entry)
                ),
                StubKind::Module => format!(
                    "import jiti from 'jiti'\n\nexport default jiti(null, {{ interopDefault: true }})('{}')\n",
                    js_path(&entry)
                ),
                StubKind::Types => {
                    let from = path.parent().unwrap_or(&package.root);
                    format!("export * from '{}'\n", import_specifier(from, &entry))
                }
            };
            stubs.push(Stub {
                kind,
                path,
                contents,
            });
        }

        if stubs.is_empty() {
            return Err(Error::Stub {
                package: package.name.clone(),
                message: "package.json declares none of main, module or types".to_string(),
            });
        }
        Ok(stubs)
    }

    /// Writes the stubs for `package`, creating output directories as needed.
    pub fn generate(&self, package: &Package) -> Result<Vec<Stub>> {
        let stubs = self.plan(package)?;
        for stub in &stubs {
            if let Some(parent) = stub.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&stub.path, &stub.contents)?;
            tracing::debug!(
                package = %package.name,
                kind = stub.kind.as_str(),
                path = %stub.path.display(),
                "wrote stub"
            );
        }
        Ok(stubs)
    }
}

fn with_default_extension(field: &str, kind: StubKind) -> String {
    let has_extension = Path::new(field).extension().is_some();
    match (kind, has_extension) {
        (StubKind::Types, false) => format!("{}.d.ts", field),
        (_, false) => format!("{}.js", field),
        _ => field.to_string(),
    }
}

fn js_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Relative import specifier from `from_dir` to `target`, without the extension.
fn import_specifier(from_dir: &Path, target: &Path) -> String {
    let target = target.with_extension("");
    let from: Vec<Component> = from_dir.components().collect();
    let to: Vec<Component> = target.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &to[common..] {
        parts.push(component.as_os_str().to_string_lossy().to_string());
    }

    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{}", joined)
    }
}
