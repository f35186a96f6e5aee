//! Error types for sound-file loading and decoding.

use std::path::PathBuf;

/// Errors raised while loading a sound file into the registry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file could not be opened or read.
    #[error("could not read audio file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file extension has no registered decoder.
    #[error("unsupported audio format for {path} (expected one of: {supported})")]
    UnsupportedFormat { path: PathBuf, supported: String },

    /// The decoder recognized the format but failed to parse the file.
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Decoded audio was empty (zero frames).
    #[error("decoded audio for {path} contains no samples")]
    EmptyAudio { path: PathBuf },
}

impl Error {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience result type for registry operations.
pub type Result<T> = std::result::Result<T, Error>;
