//! Workspace discovery and package filter resolution.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::manifest::{PackageManifest, MANIFEST_FILE};
use crate::package::Package;

/// A workspace root package together with its members.
///
/// Members are sorted by name and names are unique.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: Package,
    members: Vec<Package>,
}

impl Workspace {
    /// Builds a workspace from already-loaded packages.
    pub fn from_parts(root: Package, mut members: Vec<Package>) -> Result<Self> {
        members.sort_by(|a, b| a.name.cmp(&b.name));
        let mut seen: HashMap<&str, &Path> = HashMap::new();
        for member in &members {
            if let Some(first) = seen.insert(member.name.as_str(), member.root.as_path()) {
                return Err(Error::DuplicatePackage {
                    name: member.name.clone(),
                    first: first.to_path_buf(),
                    second: member.root.clone(),
                });
            }
        }
        Ok(Self { root, members })
    }

    /// Loads the workspace whose root `package.json` lives in `root_dir`.
    pub fn load(root_dir: impl AsRef<Path>) -> Result<Self> {
        let root = Package::load(root_dir.as_ref())?;
        let members = discover_members(&root.root, root.manifest.workspace_patterns())?;
        tracing::debug!(
            root = %root.root.display(),
            members = members.len(),
            "loaded workspace"
        );
        Self::from_parts(root, members)
    }

    /// Walks up from `start` to the nearest `package.json` declaring `workspaces`.
    ///
    /// The walk stops at a directory containing `.git`. When no ancestor declares
    /// workspaces, the nearest `package.json` is used as a single-package workspace.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        let start = start.as_ref();
        let mut nearest: Option<PathBuf> = None;

        for dir in start.ancestors() {
            let manifest_path = dir.join(MANIFEST_FILE);
            if manifest_path.is_file() {
                let manifest = PackageManifest::load(dir)?;
                if manifest.declares_workspaces() {
                    return Self::load(dir);
                }
                if nearest.is_none() {
                    nearest = Some(dir.to_path_buf());
                }
            }

            if dir.join(".git").exists() {
                break;
            }
        }

        match nearest {
            Some(dir) => Self::load(dir),
            None => Err(Error::ManifestNotFound(start.join(MANIFEST_FILE))),
        }
    }

    #[inline]
    pub fn root(&self) -> &Package {
        &self.root
    }

    #[inline]
    pub fn root_dir(&self) -> &Path {
        &self.root.root
    }

    #[inline]
    pub fn members(&self) -> &[Package] {
        &self.members
    }

    pub fn get(&self, name: &str) -> Option<&Package> {
        self.members.iter().find(|p| p.name == name)
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|p| p.name.as_str()).collect()
    }

    /// Resolves package-name filters to target packages.
    ///
    /// No filters selects the root package only. Every named package must be a
    /// workspace member; duplicates resolve once, in first-seen order.
    pub fn resolve(&self, filters: &[String]) -> Result<Vec<&Package>> {
        if filters.is_empty() {
            return Ok(vec![&self.root]);
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(filters.len());
        for name in filters {
            if !seen.insert(name.as_str()) {
                continue;
            }
            let package = self.get(name).ok_or_else(|| Error::PackageNotFound {
                name: name.clone(),
                available: self.available(),
            })?;
            targets.push(package);
        }
        Ok(targets)
    }

    fn available(&self) -> String {
        if self.members.is_empty() {
            "(none)".to_string()
        } else {
            self.member_names().join(", ")
        }
    }
}

/// A compiled set of workspace globs.
#[derive(Debug)]
pub struct PatternSet {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl PatternSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for pattern in patterns {
            match pattern.strip_prefix('!') {
                Some(negated) => exclude.push(glob_to_regex(negated)?),
                None => include.push(glob_to_regex(pattern)?),
            }
        }
        Ok(Self { include, exclude })
    }

    /// Matches a `/`-separated path relative to the workspace root.
    pub fn matches(&self, relative: &str) -> bool {
        self.include.iter().any(|re| re.is_match(relative))
            && !self.exclude.iter().any(|re| re.is_match(relative))
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let trimmed = pattern
        .trim()
        .trim_start_matches("./")
        .trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: "pattern is empty".to_string(),
        });
    }

    let mut re = String::from("^");
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    re.push_str("(?:.*/)?");
                } else {
                    re.push_str(".*");
                }
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');

    Regex::new(&re).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn discover_members(root_dir: &Path, patterns: &[String]) -> Result<Vec<Package>> {
    let patterns = PatternSet::new(patterns)?;
    if patterns.is_empty() {
        return Ok(Vec::new());
    }

    let mut members = Vec::new();
    let walker = WalkDir::new(root_dir)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            e.file_type().is_dir() && name != "node_modules" && !name.starts_with('.')
        });

    for entry in walker.filter_map(|e| e.ok()) {
        let relative = match entry.path().strip_prefix(root_dir) {
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => continue,
        };

        if !patterns.matches(&relative) {
            continue;
        }
        if !entry.path().join(MANIFEST_FILE).is_file() {
            tracing::trace!(dir = %relative, "skipping workspace match without package.json");
            continue;
        }

        members.push(Package::load(entry.path())?);
    }

    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(patterns: &[&str]) -> PatternSet {
        let owned: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        PatternSet::new(&owned).unwrap()
    }

    #[test]
    fn single_star_matches_one_segment() {
        let patterns = set(&["packages/*"]);
        assert!(patterns.matches("packages/a"));
        assert!(!patterns.matches("packages/a/b"));
        assert!(!patterns.matches("packages"));
    }

    #[test]
    fn double_star_matches_nested() {
        let patterns = set(&["packages/**"]);
        assert!(patterns.matches("packages/a"));
        assert!(patterns.matches("packages/a/b"));

        let patterns = set(&["**/pkg"]);
        assert!(patterns.matches("pkg"));
        assert!(patterns.matches("a/b/pkg"));
    }

    #[test]
    fn negation_excludes() {
        let patterns = set(&["packages/*", "!packages/internal"]);
        assert!(patterns.matches("packages/cli"));
        assert!(!patterns.matches("packages/internal"));
    }

    #[test]
    fn leading_dot_slash_and_trailing_slash_are_ignored() {
        let patterns = set(&["./packages/*/"]);
        assert!(patterns.matches("packages/cli"));
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert!(PatternSet::new(&["".to_string()]).is_err());
    }
}
