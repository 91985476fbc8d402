//! Error types and result aliases.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error in {}: {error}", .path.display())]
    Json {
        error: serde_json::Error,
        path: PathBuf,
    },

    #[error("TOML parse error in {context}: {error}")]
    Toml {
        error: toml::de::Error,
        context: String,
    },

    #[error("Manifest not found: {0}. Expected a 'package.json' in the workspace root.")]
    ManifestNotFound(PathBuf),

    #[error("Invalid workspace pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Duplicate package name '{name}' in {} and {}", .first.display(), .second.display())]
    DuplicatePackage {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Package not found: {name}. Available packages: {available}")]
    PackageNotFound { name: String, available: String },

    #[error("Unknown command: {name}. Available commands: {available}")]
    UnknownCommand { name: String, available: String },

    #[error("Invalid tool '{name}': {message}")]
    InvalidTool { name: String, message: String },

    #[error("Couldn't resolve {tool} config. Tried: {}", format_attempts(.attempted))]
    ConfigNotResolved {
        tool: String,
        attempted: Vec<PathBuf>,
    },

    #[error("Error running {tool} for {package}: {message}")]
    ToolExecution {
        package: String,
        tool: String,
        message: String,
    },

    #[error("Stub generation failed for {package}: {message}")]
    Stub { package: String, message: String },

    #[error("Git error: {0}")]
    Git(String),

    #[error("Invalid version '{version}': {message}")]
    Version { version: String, message: String },
}

fn format_attempts(attempted: &[PathBuf]) -> String {
    if attempted.is_empty() {
        return "(no candidate paths)".to_string();
    }
    attempted
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Toml {
            error,
            context: "monokit.toml".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
