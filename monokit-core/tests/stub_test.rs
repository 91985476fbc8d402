use std::fs;
use std::path::Path;

use monokit_core::config::DevConfig;
use monokit_core::package::Package;
use monokit_core::stub::{StubGenerator, StubKind};
use tempfile::TempDir;

fn create_package(dir: &Path, manifest: &str, entry: Option<&str>) -> Package {
    fs::write(dir.join("package.json"), manifest).unwrap();
    if let Some(entry) = entry {
        let path = dir.join(entry);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "export const x = 1").unwrap();
    }
    Package::load(dir).unwrap()
}

#[test]
fn test_generates_stubs_for_each_output_field() {
    let temp_dir = TempDir::new().unwrap();
    let package = create_package(
        temp_dir.path(),
        r#"{"name": "pkg", "main": "dist/index.js", "module": "dist/index.mjs", "types": "dist/index.d.ts"}"#,
        Some("src/index.ts"),
    );
    let config = DevConfig::default();

    let stubs = StubGenerator::new(&config).generate(&package).unwrap();

    assert_eq!(stubs.len(), 3);
    let entry = temp_dir.path().join("src/index.ts").display().to_string();

    let main = fs::read_to_string(temp_dir.path().join("dist/index.js")).unwrap();
    assert!(main.starts_with("module.exports = require('jiti')"));
    assert!(main.contains(&entry));

    let module = fs::read_to_string(temp_dir.path().join("dist/index.mjs")).unwrap();
    assert!(module.starts_with("import jiti from 'jiti'"));
    assert!(module.contains(&entry));

    let types = fs::read_to_string(temp_dir.path().join("dist/index.d.ts")).unwrap();
    assert_eq!(types, "export * from '../src/index'\n");
}

#[test]
fn test_only_declared_fields_are_written() {
    let temp_dir = TempDir::new().unwrap();
    let package = create_package(
        temp_dir.path(),
        r#"{"name": "pkg", "main": "lib/index"}"#,
        Some("src/index.js"),
    );
    let config = DevConfig::default();

    let stubs = StubGenerator::new(&config).plan(&package).unwrap();

    assert_eq!(stubs.len(), 1);
    assert_eq!(stubs[0].kind, StubKind::Main);
    assert_eq!(stubs[0].path, temp_dir.path().join("lib/index.js"));
    assert!(!temp_dir.path().join("lib").exists());
}

#[test]
fn test_missing_entry_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let package = create_package(temp_dir.path(), r#"{"name": "pkg", "main": "dist/index.js"}"#, None);
    let config = DevConfig::default();

    let err = StubGenerator::new(&config).generate(&package).unwrap_err();
    assert!(err.to_string().contains("no source entry found"));
}

#[test]
fn test_no_output_fields_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let package = create_package(temp_dir.path(), r#"{"name": "pkg"}"#, Some("src/index.ts"));
    let config = DevConfig::default();

    assert!(StubGenerator::new(&config).plan(&package).is_err());
}

#[test]
fn test_configured_entry() {
    let temp_dir = TempDir::new().unwrap();
    let package = create_package(
        temp_dir.path(),
        r#"{"name": "pkg", "main": "dist/index.js"}"#,
        Some("lib/main.ts"),
    );
    let config = DevConfig {
        entries: vec!["lib/main.ts".to_string()],
    };

    let entry = StubGenerator::new(&config).find_entry(&package).unwrap();
    assert_eq!(entry, temp_dir.path().join("lib/main.ts"));
}
