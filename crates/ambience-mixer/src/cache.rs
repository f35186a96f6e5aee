//! The mixer's runtime cache: every [`LayerRuntime`], per-sound fade
//! window, and environment fade window that outlives a single frame.
//!
//! Keyed by plain ids rather than the spec's literal
//! `"{layer_id}_{file_id}"` composite (see `DESIGN.md`): this
//! implementation resolves a runtime's base `Layer` by id lookup into
//! the current snapshot rather than through a back-reference, so the
//! active-file suffix the spec uses to re-derive that link is
//! unnecessary here. Soundboard one-shots keep the spec's literal
//! `"soundboard_{file_id}"` key since nothing else identifies them.

use std::collections::HashMap;

use ambience_model::{FadeWindow, Layer, PlayState};
use ambience_runtime::LayerRuntime;

use crate::env_fade::EnvFade;

/// Everything the mixer must remember across frames and across
/// reconciles: in-flight runtimes and fades, plus the previous frame's
/// play-state map used to detect STOPPED->PLAYING edges (spec §4.4
/// step 4).
#[derive(Debug, Default)]
pub struct RuntimeCache {
    layer_runtimes: HashMap<String, LayerRuntime>,
    soundboard_runtimes: HashMap<String, LayerRuntime>,
    /// The synthesized one-shot `Layer` backing each soundboard runtime
    /// (spec §4.4 `play_soundboard`), keyed the same way. Kept here
    /// rather than reconstructed per frame since it never changes over
    /// a one-shot's lifetime.
    soundboard_layers: HashMap<String, Layer>,
    sound_fades: HashMap<String, FadeWindow>,
    env_fades: HashMap<String, EnvFade>,
    prev_play_states: HashMap<String, PlayState>,
}

impl RuntimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer_runtime(&self, layer_id: &str) -> Option<&LayerRuntime> {
        self.layer_runtimes.get(layer_id)
    }

    pub fn layer_runtime_mut(&mut self, layer_id: &str) -> Option<&mut LayerRuntime> {
        self.layer_runtimes.get_mut(layer_id)
    }

    pub fn insert_layer_runtime(&mut self, layer_id: String, runtime: LayerRuntime) {
        self.layer_runtimes.insert(layer_id, runtime);
    }

    pub fn remove_layer_runtime(&mut self, layer_id: &str) {
        self.layer_runtimes.remove(layer_id);
        self.sound_fades.remove(layer_id);
    }

    /// Drop every layer runtime belonging to `env_id`. Used when an
    /// environment transitions STOPPED->PLAYING: runtimes are always
    /// rebuilt fresh to guarantee a clean cycle (spec §3 lifecycles).
    pub fn evict_environment_layers(&mut self, layer_ids: &[String]) {
        for id in layer_ids {
            self.remove_layer_runtime(id);
        }
    }

    pub fn soundboard_runtime_mut(&mut self, key: &str) -> Option<&mut LayerRuntime> {
        self.soundboard_runtimes.get_mut(key)
    }

    pub fn soundboard_layer(&self, key: &str) -> Option<&Layer> {
        self.soundboard_layers.get(key)
    }

    pub fn insert_soundboard(&mut self, key: String, layer: Layer, runtime: LayerRuntime) {
        self.soundboard_layers.insert(key.clone(), layer);
        self.soundboard_runtimes.insert(key, runtime);
    }

    pub fn soundboard_keys(&self) -> Vec<String> {
        self.soundboard_runtimes.keys().cloned().collect()
    }

    pub fn remove_soundboard_runtime(&mut self, key: &str) {
        self.soundboard_runtimes.remove(key);
        self.soundboard_layers.remove(key);
    }

    pub fn soundboard_is_empty(&self) -> bool {
        self.soundboard_runtimes.is_empty()
    }

    pub fn sound_fade(&self, layer_id: &str) -> Option<&FadeWindow> {
        self.sound_fades.get(layer_id)
    }

    pub fn set_sound_fade(&mut self, layer_id: String, fade: FadeWindow) {
        self.sound_fades.insert(layer_id, fade);
    }

    /// Advance every in-flight per-sound fade by one frame and drop the
    /// ones that have fully elapsed.
    pub fn advance_sound_fades(&mut self, delta_ms: u32) {
        for fade in self.sound_fades.values_mut() {
            fade.advance(delta_ms);
        }
        self.sound_fades.retain(|_, f| !f.is_complete());
    }

    pub fn env_fade(&self, env_id: &str) -> Option<&EnvFade> {
        self.env_fades.get(env_id)
    }

    pub fn env_fades_mut(&mut self) -> &mut HashMap<String, EnvFade> {
        &mut self.env_fades
    }

    /// Advance every in-flight environment fade by one frame and drop
    /// the ones that have fully elapsed (spec §4.3 `update_fade_state`).
    pub fn advance_env_fades(&mut self, delta_ms: u32) {
        for fade in self.env_fades.values_mut() {
            fade.advance(delta_ms);
        }
        self.env_fades.retain(|_, f| f.is_fading());
    }

    pub fn prev_play_state(&self, env_id: &str) -> Option<PlayState> {
        self.prev_play_states.get(env_id).copied()
    }

    pub fn set_prev_play_states(&mut self, states: HashMap<String, PlayState>) {
        self.prev_play_states = states;
    }

    pub fn prev_play_states(&self) -> &HashMap<String, PlayState> {
        &self.prev_play_states
    }
}
