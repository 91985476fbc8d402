//! Workspace inspection.

use std::path::Path;

use anyhow::Result;
use monokit_core::{Package, ToolRegistry};

use crate::formatting::{
    print_key_value, print_package_table, print_section_header, print_warning, PackageRow,
    SectionStyle,
};

use super::Project;

fn package_row(package: &Package, root_dir: &Path) -> PackageRow {
    let relative = package.root.strip_prefix(root_dir).unwrap_or(&package.root);
    let path = if relative.as_os_str().is_empty() {
        ".".to_string()
    } else {
        relative.display().to_string()
    };
    PackageRow {
        name: package.name.clone(),
        version: package.version().map(str::to_string),
        path,
        private: package.manifest.private,
    }
}

pub fn cmd_list(cwd: &Path, json: bool) -> Result<()> {
    let Project { workspace, config } = Project::load(cwd)?;
    let root_dir = workspace.root_dir();
    let rows: Vec<PackageRow> = workspace
        .members()
        .iter()
        .map(|p| package_row(p, root_dir))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    print_section_header("Workspace Packages", SectionStyle::Primary);
    print_key_value("Root", &root_dir.display().to_string());
    println!();

    if rows.is_empty() {
        print_warning("No workspace packages found; commands run in the root package");
    } else {
        print_package_table(&rows);
    }
    println!();

    let registry = ToolRegistry::from_config(&config, root_dir)?;
    print_key_value("Tools", &registry.names().join(", "));
    println!();

    Ok(())
}
