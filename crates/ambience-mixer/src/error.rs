//! Error type for the mixer/reconciler boundary.

use thiserror::Error;

/// Errors the mixer surfaces to its caller. Per-frame faults (decode
/// silence, dropped transport frames, DSP NaN resets) are handled
/// internally and logged, never returned here (spec §7) — this type
/// covers only setup/control failures.
#[derive(Debug, Error)]
pub enum Error {
    /// A control-plane operation was requested while the mixer thread
    /// had already panicked and not yet been restarted.
    #[error("mixer thread is not running")]
    NotRunning,

    /// `stop_processing` could not join the audio thread within its
    /// timeout; resources are abandoned rather than blocking forever.
    #[error("audio thread did not stop within {timeout_ms} ms")]
    StopTimeout { timeout_ms: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
