//! Ambience Mixer - the real-time audio core (C4 + C6).
//!
//! [`Mixer`] owns the single audio thread, the per-environment and
//! per-layer runtime cache, the DSP chain, and the transport it writes
//! frames to, all behind one lock (spec §5). [`Mixer::reconcile`] is the
//! control-plane entry point: it diffs a new declarative [`AppState`]
//! against the one currently playing, starts or clears environment
//! fades, and publishes the result for the audio thread to pick up on
//! its next frame.

mod cache;
mod env_fade;
mod error;
mod mix;
mod mixer;
mod reconcile;
mod soundboard;

pub use error::{Error, Result};
pub use mixer::{Mixer, CHANNELS, CHUNK_SAMPLES, FRAME_MS, SAMPLE_RATE, TARGET_BUFFER_CHUNKS};
