//! Effective-tree validation.
//!
//! Mirrors the original `EffectiveEnvironment.validate()` (returns a list
//! of human-readable problems rather than failing fast on the first one),
//! translated into a typed `Vec<ValidationError>` instead of a list of
//! strings.

use thiserror::Error;

/// One problem found while validating an [`crate::model::Environment`]'s
/// effective tree.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("environment '{0}': max_weight must be > 0")]
    NonPositiveMaxWeight(String),

    #[error("environment '{env}', layer '{layer}': weight must be >= 0")]
    NegativeLayerWeight { env: String, layer: String },

    #[error("environment '{env}', layer '{layer}': volume must be in [0, 1]")]
    LayerVolumeOutOfRange { env: String, layer: String },

    #[error("environment '{env}', layer '{layer}': chance must be in [0, 1]")]
    LayerChanceOutOfRange { env: String, layer: String },

    #[error("environment '{env}', layer '{layer}': has no sounds")]
    LayerHasNoSounds { env: String, layer: String },

    #[error("environment '{env}', layer '{layer}', sound '{sound}': volume must be in [0, 1]")]
    SoundVolumeOutOfRange {
        env: String,
        layer: String,
        sound: String,
    },

    #[error("environment '{env}', layer '{layer}', sound '{sound}': frequency must be > 0")]
    NonPositiveFrequency {
        env: String,
        layer: String,
        sound: String,
    },

    #[error(
        "environment '{env}': total layer weight {total} exceeds max_weight {max_weight}"
    )]
    TotalWeightExceedsMax {
        env: String,
        total: f32,
        max_weight: f32,
    },
}

/// A non-empty collection of [`ValidationError`]s, usable as a single
/// `std::error::Error` (e.g. via `#[from]` in [`crate::error::ConfigError`]).
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{} validation error(s): {}", .0.len(), summarize(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ValidationResult = std::result::Result<(), ValidationErrors>;

use crate::model::Environment;
use crate::resolve::{eff_chance, eff_layer_volume, eff_max_weight, eff_sound_volume, eff_weight, preset_layer_for, preset_sound_for};

/// Validate an environment's effective tree (after preset overrides are
/// applied), collecting every problem rather than stopping at the first.
pub fn validate_environment(env: &Environment) -> ValidationResult {
    let mut errors = Vec::new();
    let preset = env.active_preset();
    let max_weight = eff_max_weight(env, preset);

    if max_weight <= 0.0 {
        errors.push(ValidationError::NonPositiveMaxWeight(env.id.clone()));
    }

    let mut total_weight = 0.0_f32;
    for layer in &env.layers {
        let preset_layer = preset_layer_for(preset, layer);
        let weight = eff_weight(layer, preset_layer);
        let volume = eff_layer_volume(layer, preset_layer);
        let chance = eff_chance(layer, preset_layer);
        total_weight += weight.max(0.0);

        if weight < 0.0 {
            errors.push(ValidationError::NegativeLayerWeight {
                env: env.id.clone(),
                layer: layer.id.clone(),
            });
        }
        if !(0.0..=1.0).contains(&volume) {
            errors.push(ValidationError::LayerVolumeOutOfRange {
                env: env.id.clone(),
                layer: layer.id.clone(),
            });
        }
        if !(0.0..=1.0).contains(&chance) {
            errors.push(ValidationError::LayerChanceOutOfRange {
                env: env.id.clone(),
                layer: layer.id.clone(),
            });
        }
        if layer.sounds.is_empty() {
            errors.push(ValidationError::LayerHasNoSounds {
                env: env.id.clone(),
                layer: layer.id.clone(),
            });
        }

        for sound in &layer.sounds {
            let preset_sound = preset_sound_for(preset_layer, sound);
            let sound_volume = eff_sound_volume(sound, preset_sound);
            if !(0.0..=1.0).contains(&sound_volume) {
                errors.push(ValidationError::SoundVolumeOutOfRange {
                    env: env.id.clone(),
                    layer: layer.id.clone(),
                    sound: sound.id.clone(),
                });
            }
            if sound.frequency <= 0.0 {
                errors.push(ValidationError::NonPositiveFrequency {
                    env: env.id.clone(),
                    layer: layer.id.clone(),
                    sound: sound.id.clone(),
                });
            }
        }
    }

    if total_weight > max_weight {
        errors.push(ValidationError::TotalWeightExceedsMax {
            env: env.id.clone(),
            total: total_weight,
            max_weight,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Layer, LayerMode, LayerSound, PlayState};

    fn sound_layer(weight: f32, volume: f32) -> Layer {
        Layer {
            id: "l1".into(),
            name: "Wind".into(),
            sounds: vec![LayerSound {
                id: "s1".into(),
                file_id: "f1".into(),
                frequency: 1.0,
                volume,
            }],
            chance: 0.5,
            cooldown_cycles: 0,
            loop_length_ms: None,
            weight,
            volume: 1.0,
            mode: LayerMode::Single,
            selected_sound_index: 0,
        }
    }

    fn environment(layers: Vec<Layer>, max_weight: f32) -> Environment {
        Environment {
            id: "e1".into(),
            name: "Forest".into(),
            max_weight,
            background_image: None,
            soundboard: vec![],
            layers,
            presets: vec![],
            active_preset_id: None,
            play_state: PlayState::Stopped,
        }
    }

    #[test]
    fn valid_environment_passes() {
        let env = environment(vec![sound_layer(2.0, 0.5)], 10.0);
        assert!(validate_environment(&env).is_ok());
    }

    #[test]
    fn empty_layer_is_reported() {
        let mut layer = sound_layer(1.0, 0.5);
        layer.sounds.clear();
        let env = environment(vec![layer], 10.0);
        let errors = validate_environment(&env).unwrap_err();
        assert!(errors
            .0
            .iter()
            .any(|e| matches!(e, ValidationError::LayerHasNoSounds { .. })));
    }

    #[test]
    fn total_weight_over_max_is_reported() {
        let env = environment(vec![sound_layer(5.0, 0.5), sound_layer(6.0, 0.5)], 10.0);
        let errors = validate_environment(&env).unwrap_err();
        assert!(errors
            .0
            .iter()
            .any(|e| matches!(e, ValidationError::TotalWeightExceedsMax { .. })));
    }

    #[test]
    fn nonpositive_max_weight_is_reported() {
        let env = environment(vec![sound_layer(1.0, 0.5)], 0.0);
        let errors = validate_environment(&env).unwrap_err();
        assert!(errors
            .0
            .iter()
            .any(|e| matches!(e, ValidationError::NonPositiveMaxWeight(_))));
    }
}
