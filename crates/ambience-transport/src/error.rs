//! Error types for the concrete transport sinks.

use std::path::PathBuf;

/// Errors raised while setting up or tearing down a [`crate::Transport`]
/// implementation. The trait's per-frame methods never return this —
/// per spec §7, a submit failure is reported as `false`, not an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to open or finalize a WAV output file.
    #[error("WAV sink error for {path}: {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// No usable local playback device was found.
    #[error("no audio output device available")]
    NoDevice,

    /// The local output device rejected the requested stream config.
    #[error("failed to build output stream: {0}")]
    Stream(String),
}

pub type Result<T> = std::result::Result<T, Error>;
