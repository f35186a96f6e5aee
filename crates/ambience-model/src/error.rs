//! Error types for workspace (AppState) persistence and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur loading, saving, or validating the persisted
/// workspace state.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the persisted JSON document.
    #[error("failed to parse workspace JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A required top-level field was missing from an incoming workspace
    /// update (spec §6: `environments`, `masterVolume`, `soundboard`).
    #[error("missing required field '{0}' in workspace update")]
    MissingField(String),

    /// Failed to create a directory.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Validation errors from the effective-value tree.
    #[error("validation failed: {0}")]
    Validation(#[from] crate::validation::ValidationErrors),
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}

/// Convenience result type for this crate.
pub type Result<T> = std::result::Result<T, ConfigError>;
