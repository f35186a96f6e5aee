//! Ambience Runtime - per-layer playback scheduling (C3).
//!
//! [`LayerRuntime`] is the state machine that decides, cycle by cycle,
//! whether a layer's gate passes and which of its sounds is active. It
//! holds no PCM and no lock — the mixer owns one per active layer
//! instance and advances it alongside the actual audio copy.

mod layer_runtime;
mod rng;

pub use layer_runtime::{free_weight, ChunkAdvance, CopySpan, LayerRuntime, DEFAULT_LOOP_LENGTH_MS};
pub use rng::{ChanceRng, FixedRng, ThreadRngSource};
