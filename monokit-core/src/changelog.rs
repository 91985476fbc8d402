//! Changelog generation from conventional commits.

use std::fmt::Write as _;
use std::path::Path;
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;

use crate::error::{Error, Result};

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

static CONVENTIONAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<kind>[A-Za-z]+)(?:\((?P<scope>[^)]*)\))?(?P<bang>!)?:\s*(?P<subject>.+)$")
        .expect("conventional commit pattern is valid")
});

/// A parsed commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub kind: String,
    pub scope: Option<String>,
    pub subject: String,
    pub breaking: bool,
}

impl Commit {
    /// Parses a commit subject and body. Non-conventional subjects get kind `other`.
    pub fn parse(hash: &str, subject: &str, body: &str) -> Self {
        let subject = subject.trim();
        let footer_breaking = body.contains("BREAKING CHANGE") || body.contains("BREAKING-CHANGE");
        match CONVENTIONAL.captures(subject) {
            Some(caps) => Commit {
                hash: hash.to_string(),
                kind: caps["kind"].to_lowercase(),
                scope: caps
                    .name("scope")
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|s| !s.is_empty()),
                subject: caps["subject"].trim().to_string(),
                breaking: caps.name("bang").is_some() || footer_breaking,
            },
            None => Commit {
                hash: hash.to_string(),
                kind: "other".to_string(),
                scope: None,
                subject: subject.to_string(),
                breaking: footer_breaking,
            },
        }
    }

    pub fn section(&self) -> Section {
        if self.breaking {
            return Section::Breaking;
        }
        match self.kind.as_str() {
            "feat" => Section::Features,
            "fix" => Section::Fixes,
            "perf" => Section::Performance,
            _ => Section::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Breaking,
    Features,
    Fixes,
    Performance,
    Other,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Breaking,
        Section::Features,
        Section::Fixes,
        Section::Performance,
        Section::Other,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Section::Breaking => "Breaking Changes",
            Section::Features => "Features",
            Section::Fixes => "Bug Fixes",
            Section::Performance => "Performance",
            Section::Other => "Other Changes",
        }
    }
}

/// Size of the release implied by a set of commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bump {
    Patch,
    Minor,
    Major,
}

#[derive(Debug, Clone)]
pub struct Changelog {
    /// Tag the changelog starts after, if any.
    pub previous: Option<String>,
    pub commits: Vec<Commit>,
}

impl Changelog {
    /// Reads commits after `from`, or after the latest tag when `from` is `None`.
    pub fn from_git(repo: &Path, from: Option<&str>) -> Result<Self> {
        let previous = match from {
            Some(reference) => Some(reference.to_string()),
            None => latest_tag(repo)?,
        };
        let range = match previous {
            Some(ref tag) => format!("{}..HEAD", tag),
            None => "HEAD".to_string(),
        };
        let log = git(
            repo,
            &["log", &range, "--no-merges", "--format=%h%x1f%s%x1f%b%x1e"],
        )?;
        tracing::debug!(range = %range, "read git log");
        Ok(Self::from_log(&log, previous))
    }

    /// Parses `git log` output written with unit/record separators.
    pub fn from_log(log: &str, previous: Option<String>) -> Self {
        let commits = log
            .split(RECORD_SEP)
            .map(|record| record.trim_matches(|c: char| c == '\n' || c == '\r'))
            .filter(|record| !record.is_empty())
            .filter_map(|record| {
                let mut fields = record.splitn(3, FIELD_SEP);
                let hash = fields.next()?.trim();
                let subject = fields.next()?;
                let body = fields.next().unwrap_or("");
                Some(Commit::parse(hash, subject, body))
            })
            .collect();
        Self { previous, commits }
    }

    pub fn bump(&self) -> Bump {
        self.commits
            .iter()
            .map(|c| match c.section() {
                Section::Breaking => Bump::Major,
                Section::Features => Bump::Minor,
                _ => Bump::Patch,
            })
            .max()
            .unwrap_or(Bump::Patch)
    }

    /// Next version after the previous tag, when that tag is a semver version.
    pub fn next_version(&self) -> Result<Option<Version>> {
        let Some(ref tag) = self.previous else {
            return Ok(None);
        };
        let raw = tag.trim_start_matches('v');
        let current = Version::parse(raw).map_err(|e| Error::Version {
            version: tag.clone(),
            message: e.to_string(),
        })?;
        let next = match self.bump() {
            Bump::Major => Version::new(current.major + 1, 0, 0),
            Bump::Minor => Version::new(current.major, current.minor + 1, 0),
            Bump::Patch => Version::new(current.major, current.minor, current.patch + 1),
        };
        Ok(Some(next))
    }

    pub fn commits_in(&self, section: Section) -> impl Iterator<Item = &Commit> {
        self.commits.iter().filter(move |c| c.section() == section)
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Renders Markdown. Tags that are not semver produce an `Unreleased` heading.
    pub fn render(&self) -> String {
        let heading = match self.next_version() {
            Ok(Some(version)) => format!("v{}", version),
            _ => "Unreleased".to_string(),
        };

        let mut out = String::new();
        let _ = writeln!(out, "## {}", heading);
        if let Some(ref previous) = self.previous {
            let _ = writeln!(out, "\nChanges since {}", previous);
        }

        for section in Section::ALL {
            let mut commits = self.commits_in(section).peekable();
            if commits.peek().is_none() {
                continue;
            }
            let _ = writeln!(out, "\n### {}\n", section.title());
            for commit in commits {
                match commit.scope {
                    Some(ref scope) => {
                        let _ = writeln!(out, "- **{}:** {} ({})", scope, commit.subject, commit.hash);
                    }
                    None => {
                        let _ = writeln!(out, "- {} ({})", commit.subject, commit.hash);
                    }
                }
            }
        }
        out
    }
}

fn latest_tag(repo: &Path) -> Result<Option<String>> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--abbrev=0"])
        .current_dir(repo)
        .output()
        .map_err(|e| Error::Git(format!("Failed to run git describe: {}", e)))?;

    if !output.status.success() {
        // No tags yet.
        return Ok(None);
    }
    let tag = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(if tag.is_empty() { None } else { Some(tag) })
}

fn git(repo: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .map_err(|e| Error::Git(format!("Failed to run git {}: {}", args.join(" "), e)))?;

    if !output.status.success() {
        return Err(Error::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
