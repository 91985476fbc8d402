//! Development stub generation.

use std::path::Path;

use anyhow::{bail, Result};
use monokit_core::StubGenerator;

use crate::formatting::{
    create_progress_bar, print_error, print_key_value, print_section_header, SectionStyle,
};

use super::Project;

pub fn cmd_dev(cwd: &Path, packages: Vec<String>) -> Result<()> {
    let project = Project::load(cwd)?;
    let targets = project.workspace.resolve(&packages)?;
    let generator = StubGenerator::new(&project.config.dev);

    print_section_header("Generating stubs", SectionStyle::Primary);

    let pb = create_progress_bar(targets.len() as u64);
    let mut written = Vec::new();
    let mut errors = Vec::new();
    for package in &targets {
        pb.set_message(package.name.clone());
        match generator.generate(package) {
            Ok(stubs) => written.push((*package, stubs)),
            Err(e) => errors.push(e),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    for (package, stubs) in &written {
        for stub in stubs {
            let path = stub
                .path
                .strip_prefix(project.workspace.root_dir())
                .unwrap_or(&stub.path);
            print_key_value(
                &format!("{} ({})", package.name, stub.kind.as_str()),
                &path.display().to_string(),
            );
        }
    }
    println!();

    if !errors.is_empty() {
        print_section_header("Failed packages", SectionStyle::Warning);
        for error in &errors {
            print_error(&error.to_string());
        }
        println!();
        bail!(
            "Failed to stub {} of {} packages",
            errors.len(),
            targets.len()
        );
    }
    Ok(())
}
