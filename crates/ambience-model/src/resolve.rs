//! Effective-value resolution (spec §3): combining a base [`Layer`]/
//! [`LayerSound`]/[`Environment`] with an optional preset override.
//!
//! Every function here is a pure `base ?? override` lookup — no state,
//! no I/O. They take ancestors as explicit parameters instead of the
//! cyclic back-references the original object model used, so a
//! `LayerSound` never needs to know which `Layer` or `Environment`
//! contains it.

use crate::model::{Environment, Layer, LayerMode, LayerSound, Preset, PresetLayer, PresetSound};

/// `max_weight` for an environment, honoring the active preset's override.
pub fn eff_max_weight(env: &Environment, preset: Option<&Preset>) -> f32 {
    preset
        .and_then(|p| p.max_weight)
        .unwrap_or(env.max_weight)
}

/// `chance` for a layer, honoring a preset-layer override.
pub fn eff_chance(layer: &Layer, preset_layer: Option<&PresetLayer>) -> f32 {
    preset_layer
        .and_then(|p| p.chance)
        .unwrap_or(layer.chance)
}

/// `weight` for a layer, honoring a preset-layer override.
pub fn eff_weight(layer: &Layer, preset_layer: Option<&PresetLayer>) -> f32 {
    preset_layer
        .and_then(|p| p.weight)
        .unwrap_or(layer.weight)
}

/// `volume` for a layer, honoring a preset-layer override.
pub fn eff_layer_volume(layer: &Layer, preset_layer: Option<&PresetLayer>) -> f32 {
    preset_layer
        .and_then(|p| p.volume)
        .unwrap_or(layer.volume)
}

/// `cooldown_cycles` for a layer, honoring a preset-layer override.
pub fn eff_cooldown_cycles(layer: &Layer, preset_layer: Option<&PresetLayer>) -> u32 {
    preset_layer
        .and_then(|p| p.cooldown_cycles)
        .unwrap_or(layer.cooldown_cycles)
}

/// `mode` for a layer, honoring a preset-layer override.
pub fn eff_mode(layer: &Layer, preset_layer: Option<&PresetLayer>) -> LayerMode {
    preset_layer.and_then(|p| p.mode).unwrap_or(layer.mode)
}

/// `volume` for a layer-sound, honoring a preset-sound override.
pub fn eff_sound_volume(sound: &LayerSound, preset_sound: Option<&PresetSound>) -> f32 {
    preset_sound
        .and_then(|p| p.volume)
        .unwrap_or(sound.volume)
}

/// `frequency` for a layer-sound, honoring a preset-sound override.
pub fn eff_sound_frequency(sound: &LayerSound, preset_sound: Option<&PresetSound>) -> f32 {
    preset_sound
        .and_then(|p| p.frequency)
        .unwrap_or(sound.frequency)
}

/// A sound's volume after equal-peak normalization (spec §3,
/// `effects.normalize.enabled`): scales so every sound hits the same
/// peak amplitude before the per-sound volume is applied.
///
/// `peak_volume` of `0.0` (silent or not-yet-decoded file) disables
/// normalization for that sound rather than dividing by zero.
pub fn normalized_sound_volume(sound_volume: f32, peak_volume: f32, normalize_enabled: bool) -> f32 {
    if !normalize_enabled || peak_volume <= 0.0 {
        sound_volume
    } else {
        (sound_volume / peak_volume).min(1.0 / peak_volume)
    }
}

/// The full effective per-frame gain for a layer-sound: layer volume
/// times the (possibly normalized) sound volume. Fade-window and
/// master-volume multipliers are applied downstream by the mixer.
pub fn effective_volume(
    layer: &Layer,
    preset_layer: Option<&PresetLayer>,
    sound: &LayerSound,
    preset_sound: Option<&PresetSound>,
    peak_volume: f32,
    normalize_enabled: bool,
) -> f32 {
    let layer_volume = eff_layer_volume(layer, preset_layer);
    let sound_volume = eff_sound_volume(sound, preset_sound);
    let normalized = normalized_sound_volume(sound_volume, peak_volume, normalize_enabled);
    layer_volume * normalized
}

/// Look up the preset-layer override matching `layer`'s id, if any.
pub fn preset_layer_for<'a>(preset: Option<&'a Preset>, layer: &Layer) -> Option<&'a PresetLayer> {
    preset.and_then(|p| p.layer(&layer.id))
}

/// Look up the preset-sound override matching `sound`'s id, if any.
pub fn preset_sound_for<'a>(
    preset_layer: Option<&'a PresetLayer>,
    sound: &LayerSound,
) -> Option<&'a PresetSound> {
    preset_layer.and_then(|pl| pl.preset_sound(&sound.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LayerMode, PlayState};

    fn layer() -> Layer {
        Layer {
            id: "l1".into(),
            name: "Wind".into(),
            sounds: vec![LayerSound {
                id: "s1".into(),
                file_id: "f1".into(),
                frequency: 5.0,
                volume: 0.8,
            }],
            chance: 0.5,
            cooldown_cycles: 2,
            loop_length_ms: None,
            weight: 3.0,
            volume: 0.6,
            mode: LayerMode::Shuffle,
            selected_sound_index: 0,
        }
    }

    fn env(layers: Vec<Layer>) -> Environment {
        Environment {
            id: "e1".into(),
            name: "Forest".into(),
            max_weight: 10.0,
            background_image: None,
            soundboard: vec![],
            layers,
            presets: vec![],
            active_preset_id: None,
            play_state: PlayState::Stopped,
        }
    }

    #[test]
    fn no_preset_falls_back_to_base() {
        let l = layer();
        assert_eq!(eff_chance(&l, None), 0.5);
        assert_eq!(eff_weight(&l, None), 3.0);
        assert_eq!(eff_layer_volume(&l, None), 0.6);
        assert_eq!(eff_cooldown_cycles(&l, None), 2);
        assert_eq!(eff_mode(&l, None), LayerMode::Shuffle);
    }

    #[test]
    fn preset_override_wins_when_present() {
        let l = layer();
        let pl = PresetLayer {
            id: "l1".into(),
            volume: Some(0.9),
            weight: None,
            chance: Some(1.0),
            cooldown_cycles: None,
            mode: Some(LayerMode::Sequence),
            sounds: None,
        };
        assert_eq!(eff_chance(&l, Some(&pl)), 1.0);
        assert_eq!(eff_weight(&l, Some(&pl)), 3.0); // untouched, falls back
        assert_eq!(eff_layer_volume(&l, Some(&pl)), 0.9);
        assert_eq!(eff_mode(&l, Some(&pl)), LayerMode::Sequence);
    }

    #[test]
    fn sound_override_is_sparse() {
        let l = layer();
        let sound = &l.sounds[0];
        let preset_sound = PresetSound {
            id: "s1".into(),
            volume: Some(0.2),
            frequency: None,
        };
        assert_eq!(eff_sound_volume(sound, Some(&preset_sound)), 0.2);
        assert_eq!(eff_sound_frequency(sound, Some(&preset_sound)), 5.0);
    }

    #[test]
    fn normalization_scales_toward_common_peak() {
        assert_eq!(normalized_sound_volume(0.5, 0.5, true), 1.0);
        assert_eq!(normalized_sound_volume(0.5, 0.0, true), 0.5); // guarded
        assert_eq!(normalized_sound_volume(0.5, 0.25, false), 0.5); // disabled
    }

    #[test]
    fn active_preset_lookup_via_environment() {
        let l = layer();
        let mut e = env(vec![l]);
        e.presets.push(Preset {
            id: "p1".into(),
            name: "Calm".into(),
            max_weight: Some(2.0),
            layers: vec![PresetLayer {
                id: "l1".into(),
                volume: Some(0.1),
                weight: None,
                chance: None,
                cooldown_cycles: None,
                mode: None,
                sounds: None,
            }],
            is_default: false,
        });
        e.active_preset_id = Some("p1".into());

        let preset = e.active_preset().unwrap();
        assert_eq!(eff_max_weight(&e, Some(preset)), 2.0);
        let pl = preset_layer_for(Some(preset), &e.layers[0]);
        assert_eq!(eff_layer_volume(&e.layers[0], pl), 0.1);
    }
}
