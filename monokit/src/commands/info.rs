//! Changelog command.

use std::path::Path;

use anyhow::Result;
use monokit_core::Changelog;

use crate::formatting::print_warning;

pub fn cmd_changelog(cwd: &Path, from: Option<String>) -> Result<()> {
    let changelog = Changelog::from_git(cwd, from.as_deref())?;

    if changelog.is_empty() {
        match changelog.previous {
            Some(ref previous) => print_warning(&format!("No commits since {}", previous)),
            None => print_warning("No commits found"),
        }
        return Ok(());
    }

    if let Err(e) = changelog.next_version() {
        print_warning(&format!("{}; rendering as unreleased", e));
    }

    println!("{}", changelog.render());
    Ok(())
}
