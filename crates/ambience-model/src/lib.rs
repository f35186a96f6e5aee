//! Ambience Model - the declarative workspace data model (C2).
//!
//! Defines the persisted/control-plane document (environments, layers,
//! presets, and global effects configuration), the pure effective-value
//! resolution functions that combine a base entity with its preset
//! override, the fade-window primitive those resolved values ride, and
//! JSON load/save for the workspace file.
//!
//! This crate owns no runtime state — loop positions, chance rolls, and
//! in-flight fades live in `ambience-runtime` and `ambience-mixer`,
//! which borrow these types rather than mutating them in place.

mod error;
mod fade;
mod model;
mod persistence;
mod resolve;

/// Effective-tree validation.
pub mod validation;

pub use error::{ConfigError, Result};
pub use fade::{effective_volume_including_fade, FadeWindow};
pub use model::{
    AppState, Compressor, DampenSpeechRange, Effects, Environment, Fades, Filters, HighPass,
    Layer, LayerMode, LayerSound, LowPass, Normalize, PlayState, Preset, PresetLayer,
    PresetSound, SoundFileMeta,
};
pub use persistence::{load_workspace, load_workspace_or_else, save_workspace};
pub use resolve::{
    eff_chance, eff_cooldown_cycles, eff_layer_volume, eff_max_weight, eff_mode,
    eff_sound_frequency, eff_sound_volume, eff_weight, effective_volume, normalized_sound_volume,
    preset_layer_for, preset_sound_for,
};
pub use validation::{validate_environment, ValidationError, ValidationErrors, ValidationResult};
