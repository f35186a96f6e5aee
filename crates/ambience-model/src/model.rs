//! Declarative data model (spec §3): sound files, layer-sounds, layers,
//! presets, environments, and the top-level app state.
//!
//! This module holds only *declarative* data — the tree a workspace JSON
//! document serializes to. Mutable runtime bookkeeping (loop position,
//! chance rolls, fade windows) lives in `ambience-runtime` and
//! `ambience-mixer`, which hold these types by reference rather than
//! embedding back-pointers into them. This sidesteps spec §9's cyclic
//! "Layer.environment / LayerSound.layer / Environment.app_state"
//! back-references entirely: resolution functions in [`crate::resolve`]
//! take the relevant ancestors as plain parameters instead.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// How a layer selects its next active sound at the end of each loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerMode {
    Shuffle,
    Sequence,
    Single,
}

/// Whether an environment is currently meant to be audible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayState {
    Playing,
    Stopped,
}

/// Declarative record of a decoded audio file (spec §3 `SoundFile`,
/// without the PCM buffer — the buffer lives in
/// `ambience_registry::SoundFile`, keyed by the same `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundFileMeta {
    pub id: String,
    pub name: String,
    pub path: String,
    pub peak_volume: f32,
    pub duration_ms: u32,
    pub original_filename: String,
    #[serde(rename = "usageCount")]
    pub usage_count: u32,
}

/// One candidate sound within a layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSound {
    pub id: String,
    #[serde(rename = "fileId")]
    pub file_id: String,
    pub frequency: f32,
    pub volume: f32,
}

/// A scheduled, looping (or one-shot) layer within an environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    pub name: String,
    pub sounds: Vec<LayerSound>,
    pub chance: f32,
    #[serde(rename = "cooldownCycles", default)]
    pub cooldown_cycles: u32,
    /// `None` means one-shot: the loop length is the active sound's own
    /// length (spec §9 Open Question, resolved in `SPEC_FULL.md` §3.1).
    /// A persisted `0` is normalized to `None` at the serde boundary by
    /// [`deserialize_loop_length`].
    #[serde(
        rename = "loopLengthMs",
        default,
        deserialize_with = "deserialize_loop_length",
        serialize_with = "serialize_loop_length"
    )]
    pub loop_length_ms: Option<NonZeroU32>,
    pub weight: f32,
    pub volume: f32,
    pub mode: LayerMode,
    #[serde(rename = "selectedSoundIndex", default)]
    pub selected_sound_index: usize,
}

fn deserialize_loop_length<'de, D>(deserializer: D) -> Result<Option<NonZeroU32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<u32> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(NonZeroU32::new))
}

fn serialize_loop_length<S>(value: &Option<NonZeroU32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(v) => serializer.serialize_u32(v.get()),
        None => serializer.serialize_none(),
    }
}

impl Layer {
    /// Clamp `selected_sound_index` into range, per spec §3's invariant.
    pub fn clamped_selected_sound_index(&self) -> usize {
        if self.sounds.is_empty() {
            0
        } else {
            self.selected_sound_index.min(self.sounds.len() - 1)
        }
    }
}

/// Sparse per-sound override within a [`PresetLayer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetSound {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub volume: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub frequency: Option<f32>,
}

/// Sparse per-layer override within a [`Preset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetLayer {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub volume: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub chance: Option<f32>,
    #[serde(
        rename = "cooldownCycles",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub cooldown_cycles: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mode: Option<LayerMode>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sounds: Option<Vec<PresetSound>>,
}

impl PresetLayer {
    pub fn preset_sound(&self, sound_id: &str) -> Option<&PresetSound> {
        self.sounds
            .as_ref()
            .and_then(|sounds| sounds.iter().find(|s| s.id == sound_id))
    }
}

/// A named set of sparse overrides over an environment's base layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    #[serde(rename = "maxWeight", skip_serializing_if = "Option::is_none", default)]
    pub max_weight: Option<f32>,
    pub layers: Vec<PresetLayer>,
    /// UI hint only (supplemental, see `SPEC_FULL.md` §2); has no effect
    /// on effective-value resolution.
    #[serde(rename = "isDefault", default)]
    pub is_default: bool,
}

impl Preset {
    pub fn layer(&self, layer_id: &str) -> Option<&PresetLayer> {
        self.layers.iter().find(|l| l.id == layer_id)
    }
}

/// A declarative sound "scene": a set of scheduled layers plus a
/// soundboard of one-shot file ids, with optional preset overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
    #[serde(rename = "maxWeight")]
    pub max_weight: f32,
    #[serde(rename = "backgroundImage", skip_serializing_if = "Option::is_none", default)]
    pub background_image: Option<String>,
    pub soundboard: Vec<String>,
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub presets: Vec<Preset>,
    #[serde(rename = "activePresetId", skip_serializing_if = "Option::is_none", default)]
    pub active_preset_id: Option<String>,
    #[serde(rename = "playState")]
    pub play_state: PlayState,
}

impl Environment {
    pub fn active_preset(&self) -> Option<&Preset> {
        let id = self.active_preset_id.as_ref()?;
        self.presets.iter().find(|p| &p.id == id)
    }

    pub fn layer(&self, layer_id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == layer_id)
    }
}

/// Global DSP/behavior configuration (spec §6 `effects`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Normalize {
    pub enabled: bool,
}

impl Default for Normalize {
    fn default() -> Self {
        Self { enabled: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fades {
    #[serde(rename = "fadeInDuration")]
    pub fade_in_duration_ms: u32,
    #[serde(rename = "crossfadeDuration")]
    pub crossfade_duration_ms: u32,
}

impl Default for Fades {
    fn default() -> Self {
        Self {
            fade_in_duration_ms: 1000,
            crossfade_duration_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighPass {
    pub frequency: f32,
}

impl Default for HighPass {
    fn default() -> Self {
        Self { frequency: 0.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowPass {
    pub frequency: f32,
}

impl Default for LowPass {
    fn default() -> Self {
        Self { frequency: 20_000.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DampenSpeechRange {
    pub amount: f32,
}

impl Default for DampenSpeechRange {
    fn default() -> Self {
        Self { amount: 0.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Filters {
    #[serde(rename = "highPass", default)]
    pub high_pass: HighPass,
    #[serde(rename = "lowPass", default)]
    pub low_pass: LowPass,
    #[serde(rename = "dampenSpeechRange", default)]
    pub dampen_speech_range: DampenSpeechRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compressor {
    #[serde(rename = "lowThreshold")]
    pub low_threshold_db: f32,
    #[serde(rename = "highThreshold")]
    pub high_threshold_db: f32,
    pub ratio: f32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self {
            low_threshold_db: -40.0,
            high_threshold_db: 0.0,
            ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Effects {
    #[serde(default)]
    pub normalize: Normalize,
    #[serde(default)]
    pub fades: Fades,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub compressor: Compressor,
}

/// The entire persisted/control-plane workspace document (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    pub environments: Vec<Environment>,
    #[serde(rename = "masterVolume")]
    pub master_volume: f32,
    pub soundboard: Vec<String>,
    #[serde(default)]
    pub effects: Effects,
    #[serde(default)]
    pub files: Vec<SoundFileMeta>,
}

impl AppState {
    /// Force every environment's `play_state` to `STOPPED`. Called once
    /// on load, per spec §6 ("fresh process = nothing playing").
    pub fn force_all_stopped(&mut self) {
        for env in &mut self.environments {
            env.play_state = PlayState::Stopped;
        }
    }

    pub fn environment(&self, id: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.id == id)
    }

    pub fn environment_mut(&mut self, id: &str) -> Option<&mut Environment> {
        self.environments.iter_mut().find(|e| e.id == id)
    }

    pub fn sound_file(&self, id: &str) -> Option<&SoundFileMeta> {
        self.files.iter().find(|f| f.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_length_zero_normalizes_to_none() {
        let json = r#"{"id":"l1","name":"L","sounds":[],"chance":1.0,"cooldownCycles":0,
            "loopLengthMs":0,"weight":1.0,"volume":1.0,"mode":"SINGLE","selectedSoundIndex":0}"#;
        let layer: Layer = serde_json::from_str(json).unwrap();
        assert_eq!(layer.loop_length_ms, None);
    }

    #[test]
    fn loop_length_missing_is_none() {
        let json = r#"{"id":"l1","name":"L","sounds":[],"chance":1.0,
            "weight":1.0,"volume":1.0,"mode":"SINGLE"}"#;
        let layer: Layer = serde_json::from_str(json).unwrap();
        assert_eq!(layer.loop_length_ms, None);
    }

    #[test]
    fn loop_length_positive_roundtrips() {
        let json = r#"{"id":"l1","name":"L","sounds":[],"chance":1.0,"cooldownCycles":0,
            "loopLengthMs":1000,"weight":1.0,"volume":1.0,"mode":"SINGLE","selectedSoundIndex":0}"#;
        let layer: Layer = serde_json::from_str(json).unwrap();
        assert_eq!(layer.loop_length_ms.map(|v| v.get()), Some(1000));
        let back = serde_json::to_string(&layer).unwrap();
        assert!(back.contains("\"loopLengthMs\":1000"));
    }

    #[test]
    fn selected_sound_index_clamps() {
        let layer = Layer {
            id: "l".into(),
            name: "L".into(),
            sounds: vec![LayerSound {
                id: "s1".into(),
                file_id: "f1".into(),
                frequency: 1.0,
                volume: 1.0,
            }],
            chance: 1.0,
            cooldown_cycles: 0,
            loop_length_ms: None,
            weight: 1.0,
            volume: 1.0,
            mode: LayerMode::Single,
            selected_sound_index: 99,
        };
        assert_eq!(layer.clamped_selected_sound_index(), 0);
    }
}
