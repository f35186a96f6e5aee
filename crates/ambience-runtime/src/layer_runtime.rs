//! [`LayerRuntime`]: the mutable playback state machine for one layer
//! instance within an environment's mix.
//!
//! A `LayerRuntime` never touches PCM — it only tracks where in the
//! loop it is, which sound is active, and whether the layer's
//! chance/cooldown/weight gate currently passes. The mixer drives it
//! forward frame-by-frame and asks it for the active sound index and
//! gating decision each cycle.

use ambience_model::{eff_cooldown_cycles, eff_weight, Layer, LayerMode, PresetLayer};

use crate::rng::ChanceRng;

/// Loop length used when a layer has no explicit `loop_length_ms`
/// (one-shot layers loop at their active sound's own length instead —
/// see [`LayerRuntime::loop_length_samples`]). Matches the reference
/// server's fallback for a layer whose active sound duration is
/// unknown.
pub const DEFAULT_LOOP_LENGTH_MS: u32 = 8000;

/// Playback state for a single layer instance.
#[derive(Debug, Clone)]
pub struct LayerRuntime {
    /// Position within the current loop iteration, in samples.
    position_in_loop: u64,
    /// Read position within the active sound's own PCM buffer, in
    /// frames. Wraps independently of `position_in_loop` once the
    /// sound is shorter than the loop.
    audio_position: u64,
    active_sound_index: usize,
    chance_roll: f64,
    cooldown_cycles_elapsed: u32,
    has_played: bool,
    was_playing: bool,
    previous_volume: f32,
    finished: bool,
}

impl LayerRuntime {
    /// Create a fresh runtime for `layer`, rolling the first chance
    /// check and starting at the layer's configured selected sound.
    pub fn new(layer: &Layer, initial_volume: f32, rng: &mut dyn ChanceRng) -> Self {
        Self {
            position_in_loop: 0,
            audio_position: 0,
            active_sound_index: layer.clamped_selected_sound_index(),
            chance_roll: rng.f64_below_one(),
            cooldown_cycles_elapsed: 0,
            has_played: false,
            was_playing: true,
            previous_volume: initial_volume,
            finished: false,
        }
    }

    pub fn active_sound_index(&self) -> usize {
        self.active_sound_index
    }

    pub fn position_in_loop(&self) -> u64 {
        self.position_in_loop
    }

    pub fn audio_position(&self) -> u64 {
        self.audio_position
    }

    pub fn has_played(&self) -> bool {
        self.has_played
    }

    pub fn was_playing(&self) -> bool {
        self.was_playing
    }

    pub fn previous_volume(&self) -> f32 {
        self.previous_volume
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn mark_finished(&mut self) {
        self.finished = true;
    }

    pub fn set_has_played(&mut self) {
        self.has_played = true;
    }

    pub fn set_was_playing(&mut self, playing: bool) {
        self.was_playing = playing;
    }

    /// Snapshot the steady effective volume for next frame's edge
    /// detection (spec §4.4: "refresh `previous_volume` = `effective_volume`").
    pub fn set_previous_volume(&mut self, volume: f32) {
        self.previous_volume = volume;
    }

    /// Loop length in samples: the layer's explicit `loop_length_ms` if
    /// set, otherwise the active sound's own duration (one-shot mode).
    pub fn loop_length_samples(
        &self,
        layer: &Layer,
        active_sound_duration_ms: Option<u32>,
        sample_rate: u32,
    ) -> u64 {
        let ms = layer
            .loop_length_ms
            .map(std::num::NonZeroU32::get)
            .or(active_sound_duration_ms)
            .unwrap_or(DEFAULT_LOOP_LENGTH_MS);
        (u64::from(sample_rate) * u64::from(ms)) / 1000
    }

    /// Advance the loop-relative clock by `frames`. Returns `true` if
    /// the loop boundary was crossed and the caller should invoke
    /// [`Self::end_of_loop`].
    pub fn advance(&mut self, frames: u64, loop_length_samples: u64) -> bool {
        self.position_in_loop += frames;
        self.position_in_loop >= loop_length_samples.max(1)
    }

    /// Advance the per-sound read cursor, wrapping at `sound_len_frames`.
    pub fn advance_audio_position(&mut self, frames: u64, sound_len_frames: u64) {
        if sound_len_frames == 0 {
            self.audio_position = 0;
            return;
        }
        self.audio_position = (self.audio_position + frames) % sound_len_frames;
    }

    /// Handle a loop boundary crossing: reset the clocks, possibly
    /// advance the active sound (per layer mode), roll a fresh chance
    /// value, and update the cooldown counter.
    pub fn end_of_loop(
        &mut self,
        layer: &Layer,
        preset_layer: Option<&PresetLayer>,
        sound_frequencies: &[f32],
        rng: &mut dyn ChanceRng,
        volume_after: f32,
    ) {
        self.position_in_loop = 0;
        self.audio_position = 0;

        if self.has_played {
            self.update_active_sound_index(layer, sound_frequencies, rng);
        }

        self.chance_roll = rng.f64_below_one();

        let cooldown_target = eff_cooldown_cycles(layer, preset_layer);
        if self.cooldown_cycles_elapsed >= cooldown_target {
            self.cooldown_cycles_elapsed = 0;
        } else if self.has_played || self.cooldown_cycles_elapsed > 0 {
            self.cooldown_cycles_elapsed += 1;
        }

        self.has_played = false;
        self.was_playing = true;
        self.previous_volume = volume_after;
    }

    /// Choose the next active sound index per the layer's mode.
    /// `sound_frequencies` must be the effective frequencies (preset
    /// overrides already applied) for `layer.sounds`, in order.
    pub fn update_active_sound_index(
        &mut self,
        layer: &Layer,
        sound_frequencies: &[f32],
        rng: &mut dyn ChanceRng,
    ) {
        if layer.sounds.is_empty() {
            return;
        }

        self.active_sound_index = match layer.mode {
            LayerMode::Single => layer.clamped_selected_sound_index(),
            LayerMode::Sequence => (self.active_sound_index + 1) % layer.sounds.len(),
            LayerMode::Shuffle => {
                let weights: Vec<f64> = sound_frequencies.iter().map(|&f| f as f64).collect();
                rng.weighted_choice(&weights)
            }
        };

        if self.active_sound_index >= layer.sounds.len() {
            self.active_sound_index = 0;
        }
    }

    /// Reset to the start of playback, e.g. when an environment
    /// transitions from STOPPED back to PLAYING.
    pub fn reset_position(&mut self, layer: &Layer, initial_volume: f32, rng: &mut dyn ChanceRng) {
        self.position_in_loop = 0;
        self.audio_position = 0;
        self.active_sound_index = layer.clamped_selected_sound_index();
        self.cooldown_cycles_elapsed = 0;
        self.chance_roll = rng.f64_below_one();
        self.was_playing = true;
        self.finished = false;
        self.previous_volume = initial_volume;
    }

    /// Whether this layer's gate currently passes: the rolled chance is
    /// under the effective chance threshold, the cooldown has elapsed,
    /// and the layer's effective weight still fits in the environment's
    /// remaining weight budget.
    pub fn should_play(
        &self,
        layer: &Layer,
        preset_layer: Option<&PresetLayer>,
        free_weight: f32,
    ) -> bool {
        let chance = ambience_model::eff_chance(layer, preset_layer);
        let cooldown_target = eff_cooldown_cycles(layer, preset_layer);
        let weight = eff_weight(layer, preset_layer);

        (self.chance_roll as f32) < chance
            && (self.cooldown_cycles_elapsed == 0 || self.cooldown_cycles_elapsed > cooldown_target)
            && weight <= free_weight
    }
}

/// Weight already claimed by layers ordered before this one in the
/// environment, subtracted from the environment's effective max weight.
pub fn free_weight(effective_max_weight: f32, used_weight: f32) -> f32 {
    effective_max_weight - used_weight
}

/// One contiguous copy instruction produced by [`LayerRuntime::advance_chunk`]:
/// copy `len` frames from the active sound's PCM starting at `src_frame`
/// into the destination chunk starting at `dest_frame`. Destination
/// frames outside every span stay at the caller's zero-initialized
/// silence — this is how a sound shorter than its loop naturally trails
/// off instead of restarting mid-loop (spec §4.2 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopySpan {
    pub dest_frame: usize,
    pub src_frame: usize,
    pub len: usize,
}

/// Outcome of advancing a [`LayerRuntime`] through one `n`-frame chunk
/// (spec §4.2 `get_next_chunk`).
#[derive(Debug, Clone, Default)]
pub struct ChunkAdvance {
    pub spans: Vec<CopySpan>,
    /// Set once a one-shot layer has exhausted its audio; the caller
    /// should tear the runtime down.
    pub finished: bool,
}

impl LayerRuntime {
    /// Advance this runtime through `n` destination frames, producing the
    /// PCM copy instructions the mixer should apply against the active
    /// sound's buffer (spec §4.2, steps 1-3).
    ///
    /// `on_loop_boundary` is invoked every time `position_in_loop` reaches
    /// `loop_length_samples`; it must run the runtime's [`Self::end_of_loop`]
    /// (which resets both clocks to zero and may change the active sound)
    /// and return the `(loop_length_samples, audio_length_samples)` that
    /// apply to whatever sound is active afterward.
    ///
    /// One-shots (`is_one_shot`) never call `on_loop_boundary`: reaching
    /// `audio_length_samples` instead sets `finished` and stops early,
    /// matching spec §4.2 step 1.
    pub fn advance_chunk(
        &mut self,
        n: usize,
        is_one_shot: bool,
        mut loop_length_samples: u64,
        mut audio_length_samples: u64,
        mut on_loop_boundary: impl FnMut(&mut Self) -> (u64, u64),
    ) -> ChunkAdvance {
        let mut advance = ChunkAdvance::default();
        let mut dest = 0usize;
        let mut remaining = n;
        // Bounds the number of zero-length-loop/segment iterations a
        // single call can perform; real loop lengths vastly exceed one
        // chunk, so this only guards against a pathological 0-length loop.
        let mut guard = n as u32 + 4;

        while remaining > 0 && guard > 0 {
            guard -= 1;

            if is_one_shot && self.audio_position >= audio_length_samples {
                self.finished = true;
                advance.finished = true;
                break;
            }

            if self.position_in_loop >= loop_length_samples.max(1) {
                let (next_loop, next_audio) = on_loop_boundary(self);
                loop_length_samples = next_loop;
                audio_length_samples = next_audio;
                continue;
            }

            let loop_room = (loop_length_samples - self.position_in_loop) as usize;
            let audio_room = audio_length_samples.saturating_sub(self.audio_position) as usize;
            let copy_len = remaining.min(loop_room).min(audio_room);

            if copy_len > 0 {
                advance.spans.push(CopySpan {
                    dest_frame: dest,
                    src_frame: self.audio_position as usize,
                    len: copy_len,
                });
                self.audio_position += copy_len as u64;
                self.position_in_loop += copy_len as u64;
                dest += copy_len;
                remaining -= copy_len;
            } else {
                // Audio exhausted before the loop boundary: silence for
                // the rest of the loop window rather than replaying.
                let silent_len = remaining.min(loop_room.max(1));
                self.position_in_loop += silent_len as u64;
                dest += silent_len;
                remaining -= silent_len;
            }
        }

        advance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FixedRng;
    use ambience_model::{Layer, LayerSound};
    use proptest::prelude::*;

    fn layer(mode: LayerMode) -> Layer {
        Layer {
            id: "l1".into(),
            name: "Birds".into(),
            sounds: vec![
                LayerSound {
                    id: "s1".into(),
                    file_id: "f1".into(),
                    frequency: 1.0,
                    volume: 1.0,
                },
                LayerSound {
                    id: "s2".into(),
                    file_id: "f2".into(),
                    frequency: 3.0,
                    volume: 1.0,
                },
            ],
            chance: 0.9,
            cooldown_cycles: 1,
            loop_length_ms: None,
            weight: 1.0,
            volume: 1.0,
            mode,
            selected_sound_index: 0,
        }
    }

    #[test]
    fn sequence_mode_advances_round_robin() {
        let layer = layer(LayerMode::Sequence);
        let mut rng = FixedRng::always(0.1, 0);
        let mut rt = LayerRuntime::new(&layer, 1.0, &mut rng);
        assert_eq!(rt.active_sound_index(), 0);
        rt.set_has_played();
        rt.update_active_sound_index(&layer, &[1.0, 3.0], &mut rng);
        assert_eq!(rt.active_sound_index(), 1);
        rt.update_active_sound_index(&layer, &[1.0, 3.0], &mut rng);
        assert_eq!(rt.active_sound_index(), 0);
    }

    #[test]
    fn single_mode_always_returns_to_selected() {
        let mut layer = layer(LayerMode::Single);
        layer.selected_sound_index = 1;
        let mut rng = FixedRng::always(0.1, 0);
        let mut rt = LayerRuntime::new(&layer, 1.0, &mut rng);
        assert_eq!(rt.active_sound_index(), 1);
        rt.update_active_sound_index(&layer, &[1.0, 3.0], &mut rng);
        assert_eq!(rt.active_sound_index(), 1);
    }

    #[test]
    fn shuffle_mode_delegates_to_rng_weighted_choice() {
        let layer = layer(LayerMode::Shuffle);
        let mut rng = FixedRng::new(vec![0.1], vec![1]);
        let mut rt = LayerRuntime::new(&layer, 1.0, &mut rng);
        rt.update_active_sound_index(&layer, &[1.0, 3.0], &mut rng);
        assert_eq!(rt.active_sound_index(), 1);
    }

    #[test]
    fn loop_length_falls_back_to_sound_duration_then_default() {
        let layer = layer(LayerMode::Single);
        let mut rng = FixedRng::always(0.1, 0);
        let rt = LayerRuntime::new(&layer, 1.0, &mut rng);
        assert_eq!(rt.loop_length_samples(&layer, Some(2000), 48_000), 96_000);
        assert_eq!(
            rt.loop_length_samples(&layer, None, 48_000),
            48_000 * u64::from(DEFAULT_LOOP_LENGTH_MS) / 1000
        );
    }

    #[test]
    fn cooldown_blocks_the_cycle_right_after_playing_then_releases() {
        let layer = layer(LayerMode::Single); // cooldown_cycles == 1
        let mut rng = FixedRng::always(0.0, 0); // always passes chance 0.9
        let mut rt = LayerRuntime::new(&layer, 1.0, &mut rng);

        // Fresh runtime: cooldown elapsed is 0, ready to play immediately.
        assert!(rt.should_play(&layer, None, 10.0));

        // Play this cycle, then cross the loop boundary.
        rt.set_has_played();
        rt.end_of_loop(&layer, None, &[1.0, 3.0], &mut rng, 1.0);
        // Elapsed == target: blocked for exactly this one cycle (spec S3).
        assert!(!rt.should_play(&layer, None, 10.0));

        // The next boundary crossing resets the cooldown counter.
        rt.end_of_loop(&layer, None, &[1.0, 3.0], &mut rng, 1.0);
        assert!(rt.should_play(&layer, None, 10.0));
    }

    #[test]
    fn weight_over_budget_blocks_should_play() {
        let layer = layer(LayerMode::Single);
        let mut rng = FixedRng::always(0.0, 0);
        let mut rt = LayerRuntime::new(&layer, 1.0, &mut rng);
        rt.cooldown_cycles_elapsed = 5;
        assert!(!rt.should_play(&layer, None, 0.5)); // weight 1.0 > free 0.5
        assert!(rt.should_play(&layer, None, 2.0));
    }

    #[test]
    fn end_of_loop_resets_clocks_and_rerolls_chance() {
        let layer = layer(LayerMode::Sequence);
        let mut rng = FixedRng::always(0.2, 0);
        let mut rt = LayerRuntime::new(&layer, 1.0, &mut rng);
        rt.position_in_loop = 1000;
        rt.audio_position = 500;
        rt.set_has_played();
        rt.end_of_loop(&layer, None, &[1.0, 3.0], &mut rng, 0.8);
        assert_eq!(rt.position_in_loop(), 0);
        assert_eq!(rt.audio_position(), 0);
        assert!(!rt.has_played());
        assert!(rt.was_playing());
        assert_eq!(rt.previous_volume(), 0.8);
    }

    #[test]
    fn advance_chunk_copies_within_loop_without_crossing_boundary() {
        let layer = layer(LayerMode::Single);
        let mut rng = FixedRng::always(0.2, 0);
        let mut rt = LayerRuntime::new(&layer, 1.0, &mut rng);
        let advance = rt.advance_chunk(100, false, 1000, 500, |_| (1000, 500));
        assert_eq!(advance.spans, vec![CopySpan { dest_frame: 0, src_frame: 0, len: 100 }]);
        assert_eq!(rt.position_in_loop(), 100);
        assert_eq!(rt.audio_position(), 100);
        assert!(!advance.finished);
    }

    #[test]
    fn advance_chunk_leaves_silence_once_audio_shorter_than_loop() {
        let layer = layer(LayerMode::Single);
        let mut rng = FixedRng::always(0.2, 0);
        let mut rt = LayerRuntime::new(&layer, 1.0, &mut rng);
        // Loop is 100 samples, audio only has 40: the chunk should copy
        // 40 frames and leave the rest silent without replaying.
        let advance = rt.advance_chunk(100, false, 100, 40, |_| (100, 40));
        assert_eq!(advance.spans, vec![CopySpan { dest_frame: 0, src_frame: 0, len: 40 }]);
        assert_eq!(rt.position_in_loop(), 100);
        assert_eq!(rt.audio_position(), 40);
    }

    #[test]
    fn advance_chunk_crosses_loop_boundary_and_resumes_from_zero() {
        let layer = layer(LayerMode::Single);
        let mut rng = FixedRng::always(0.2, 0);
        let mut rt = LayerRuntime::new(&layer, 1.0, &mut rng);
        let mut boundary_hits = 0;
        let advance = rt.advance_chunk(150, false, 100, 100, |rt| {
            boundary_hits += 1;
            rt.end_of_loop(&layer, None, &[1.0, 3.0], &mut FixedRng::always(0.2, 0), 1.0);
            (100, 100)
        });
        assert_eq!(boundary_hits, 1);
        assert_eq!(
            advance.spans,
            vec![
                CopySpan { dest_frame: 0, src_frame: 0, len: 100 },
                CopySpan { dest_frame: 100, src_frame: 0, len: 50 },
            ]
        );
        assert_eq!(rt.position_in_loop(), 50);
    }

    #[test]
    fn advance_chunk_marks_one_shot_finished_at_end_of_audio() {
        let layer = layer(LayerMode::Single);
        let mut rng = FixedRng::always(0.2, 0);
        let mut rt = LayerRuntime::new(&layer, 1.0, &mut rng);
        let advance = rt.advance_chunk(150, true, 100, 100, |_| panic!("one-shots never loop"));
        assert_eq!(advance.spans, vec![CopySpan { dest_frame: 0, src_frame: 0, len: 100 }]);
        assert!(advance.finished);
        assert!(rt.is_finished());
    }

    proptest! {
        /// Spec §8 property 1: `position_in_loop` after one `advance_chunk`
        /// call equals `(position_in_loop before + chunk_samples) mod
        /// loop_length_samples` — it never skips forward past the boundary.
        #[test]
        fn position_in_loop_never_skips_forward(
            loop_len in 1u64..2000,
            audio_len in 0u64..2000,
            chunk in 1usize..500,
        ) {
            let layer = layer(LayerMode::Sequence);
            let mut rng = FixedRng::always(0.2, 0);
            let mut rt = LayerRuntime::new(&layer, 1.0, &mut rng);
            let mut boundary_rng = FixedRng::always(0.2, 0);

            for _ in 0..5 {
                let before = rt.position_in_loop();
                let advance = rt.advance_chunk(chunk, false, loop_len, audio_len, |rt| {
                    rt.end_of_loop(&layer, None, &[1.0, 3.0], &mut boundary_rng, 1.0);
                    (loop_len, audio_len)
                });
                let expected = (before + chunk as u64) % loop_len;
                prop_assert_eq!(rt.position_in_loop(), expected);
                prop_assert!(!advance.finished);
            }
        }
    }
}
