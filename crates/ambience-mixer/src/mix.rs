//! The per-frame mix (spec §4.4 steps 1-11): layer scheduling, fade
//! injection, PCM accumulation, the DSP chain, and transport submission.

use std::collections::HashMap;

use ambience_model::{
    eff_max_weight, eff_sound_frequency, eff_weight, effective_volume, effective_volume_including_fade,
    preset_layer_for, preset_sound_for, AppState, Environment, FadeWindow, Layer, PlayState, PresetLayer,
};
use ambience_registry::SoundFileRegistry;
use ambience_runtime::{ChanceRng, ChunkAdvance, LayerRuntime};
use tracing::trace;

use crate::cache::RuntimeCache;
use crate::env_fade::EnvFade;
use crate::mixer::{Inner, CHUNK_SAMPLES, FRAME_MS, SAMPLE_RATE, TARGET_BUFFER_CHUNKS};

/// Run one 40 ms frame end to end. Returns `false` when there is nothing
/// left to do and the caller should stop the audio thread (spec §4.4
/// step 6); `true` otherwise, including every "skip this frame" path.
pub(crate) fn run_one_frame(inner: &mut Inner) -> bool {
    if !inner.transport.is_connected() {
        inner.transport.ensure_connected();
        return still_active(inner);
    }

    if inner.transport.buffered_frames() >= TARGET_BUFFER_CHUNKS {
        return still_active(inner);
    }

    let Some(snapshot) = inner.snapshot.clone() else {
        return !inner.cache.soundboard_is_empty();
    };

    detect_restart_edges(&mut inner.cache, &snapshot);

    let active_env_ids: Vec<String> = snapshot
        .environments
        .iter()
        .filter(|e| e.play_state == PlayState::Playing || inner.cache.env_fade(&e.id).is_some())
        .map(|e| e.id.clone())
        .collect();

    if active_env_ids.is_empty() && inner.cache.soundboard_is_empty() {
        return false;
    }

    let mut main_l = vec![0.0f32; CHUNK_SAMPLES];
    let mut main_r = vec![0.0f32; CHUNK_SAMPLES];
    let fade_in_ms = snapshot.effects.fades.fade_in_duration_ms;
    let normalize_enabled = snapshot.effects.normalize.enabled;

    for env_id in &active_env_ids {
        if let Some(env) = snapshot.environment(env_id) {
            mix_environment(
                &mut inner.cache,
                inner.rng.as_mut(),
                inner.registry.as_ref(),
                env,
                normalize_enabled,
                fade_in_ms,
                &mut main_l,
                &mut main_r,
            );
        }
    }

    mix_soundboard(
        &mut inner.cache,
        inner.registry.as_ref(),
        normalize_enabled,
        &mut main_l,
        &mut main_r,
    );

    let dampen_amount = snapshot.effects.filters.dampen_speech_range.amount;
    let voice_activity = inner.transport.has_voice_activity();
    inner
        .dsp
        .process_stereo(&mut main_l, &mut main_r, dampen_amount, voice_activity);

    let master_volume = snapshot.master_volume;
    let mut bytes = Vec::with_capacity(CHUNK_SAMPLES * 2 * 2);
    for i in 0..CHUNK_SAMPLES {
        let l = clip_to_i16(main_l[i] * master_volume);
        let r = clip_to_i16(main_r[i] * master_volume);
        bytes.extend_from_slice(&l.to_le_bytes());
        bytes.extend_from_slice(&r.to_le_bytes());
    }

    if !inner.transport.queue_frame(&bytes) {
        trace!("transport dropped a frame");
    }

    inner.cache.advance_sound_fades(FRAME_MS);
    inner.cache.advance_env_fades(FRAME_MS);

    true
}

fn clip_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Whether there is still something worth waking up for, used on the
/// "skip this frame" paths (disconnected transport, backpressure) so the
/// loop can still exit cleanly instead of spinning forever against a dead
/// transport with no active work.
fn still_active(inner: &Inner) -> bool {
    if !inner.cache.soundboard_is_empty() {
        return true;
    }
    match &inner.snapshot {
        Some(snapshot) => snapshot
            .environments
            .iter()
            .any(|e| e.play_state == PlayState::Playing || inner.cache.env_fade(&e.id).is_some()),
        None => false,
    }
}

/// Detect STOPPED->PLAYING edges against the previous frame's play-state
/// map and evict the affected environment's layer runtimes so they
/// restart with fresh state (spec §4.4 step 4).
fn detect_restart_edges(cache: &mut RuntimeCache, snapshot: &AppState) {
    let mut next_states = HashMap::new();
    for env in &snapshot.environments {
        let was = cache.prev_play_state(&env.id);
        if was != Some(PlayState::Playing) && env.play_state == PlayState::Playing {
            let layer_ids: Vec<String> = env.layers.iter().map(|l| l.id.clone()).collect();
            cache.evict_environment_layers(&layer_ids);
        }
        next_states.insert(env.id.clone(), env.play_state);
    }
    cache.set_prev_play_states(next_states);
}

fn sound_frequencies(layer: &Layer, preset_layer: Option<&PresetLayer>) -> Vec<f32> {
    layer
        .sounds
        .iter()
        .map(|s| eff_sound_frequency(s, preset_sound_for(preset_layer, s)))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn mix_environment(
    cache: &mut RuntimeCache,
    rng: &mut dyn ChanceRng,
    registry: &SoundFileRegistry,
    env: &Environment,
    normalize_enabled: bool,
    fade_in_ms: u32,
    main_l: &mut [f32],
    main_r: &mut [f32],
) {
    let preset = env.active_preset();
    let effective_max_weight = eff_max_weight(env, preset);

    let mut env_l = vec![0.0f32; CHUNK_SAMPLES];
    let mut env_r = vec![0.0f32; CHUNK_SAMPLES];
    let mut used_weight = 0.0f32;

    for layer in &env.layers {
        if layer.sounds.is_empty() {
            continue;
        }
        let preset_layer = preset_layer_for(preset, layer);
        let free = effective_max_weight - used_weight;

        if cache.layer_runtime(&layer.id).is_none() {
            let initial_volume =
                layer_effective_volume(registry, layer, preset_layer, normalize_enabled);
            let runtime = LayerRuntime::new(layer, initial_volume, rng);
            cache.insert_layer_runtime(layer.id.clone(), runtime);
        }

        process_layer(
            cache,
            rng,
            registry,
            layer,
            preset_layer,
            free,
            normalize_enabled,
            fade_in_ms,
            &mut env_l,
            &mut env_r,
        );

        // Spec §4.2 `free_weight`: every earlier layer with a cached
        // runtime consumes its effective weight from the budget,
        // regardless of whether its gate happened to pass this frame
        // (examples/original_source/audio_processing/models/layer_info.py
        // `_free_weight` adds `effective_weight` unconditionally for each
        // earlier layer). A closed chance gate must not free up budget
        // for a later layer.
        used_weight += eff_weight(layer, preset_layer);
    }

    let progress = cache.env_fade(&env.id).map(EnvFade::fade_progress).unwrap_or(1.0);
    for i in 0..CHUNK_SAMPLES {
        main_l[i] += env_l[i] * progress;
        main_r[i] += env_r[i] * progress;
    }
}

fn layer_effective_volume(
    registry: &SoundFileRegistry,
    layer: &Layer,
    preset_layer: Option<&PresetLayer>,
    normalize_enabled: bool,
) -> f32 {
    let idx = layer.clamped_selected_sound_index();
    let Some(sound) = layer.sounds.get(idx) else {
        return 0.0;
    };
    let preset_sound = preset_sound_for(preset_layer, sound);
    let peak = registry
        .lookup(&sound.file_id)
        .map(|f| f.peak_volume())
        .unwrap_or(0.0);
    effective_volume(layer, preset_layer, sound, preset_sound, peak, normalize_enabled)
}

/// Process one layer for one frame: advance its runtime, run edge
/// detection, and copy its PCM (scaled by volume and any in-flight fade)
/// into the environment accumulator. Returns whether the layer's gate
/// passed this frame (used by `playing_layer_ids`/tests; weight
/// admission is charged unconditionally per layer by the caller, not
/// gated on this return value — see spec §4.2 `free_weight`).
#[allow(clippy::too_many_arguments)]
fn process_layer(
    cache: &mut RuntimeCache,
    rng: &mut dyn ChanceRng,
    registry: &SoundFileRegistry,
    layer: &Layer,
    preset_layer: Option<&PresetLayer>,
    free_weight: f32,
    normalize_enabled: bool,
    fade_in_ms: u32,
    env_l: &mut [f32],
    env_r: &mut [f32],
) -> bool {
    let runtime = cache.layer_runtime(&layer.id).expect("just inserted");
    let active_index = runtime.active_sound_index().min(layer.sounds.len() - 1);
    let sound = &layer.sounds[active_index];
    let preset_sound = preset_sound_for(preset_layer, sound);

    let file = registry.lookup(&sound.file_id);
    let peak = file.map(|f| f.peak_volume()).unwrap_or(0.0);
    let current_volume =
        effective_volume(layer, preset_layer, sound, preset_sound, peak, normalize_enabled);

    let runtime = cache.layer_runtime(&layer.id).expect("just inserted");
    let should_play = runtime.should_play(layer, preset_layer, free_weight);
    let previous_volume = runtime.previous_volume();
    let was_playing = runtime.was_playing();
    let has_played = runtime.has_played();
    let is_fading_already = cache.sound_fade(&layer.id).is_some();

    // Edge detection (spec §4.4 "Edge detection").
    if (previous_volume - current_volume).abs() > f32::EPSILON {
        let start = cache
            .sound_fade(&layer.id)
            .map(FadeWindow::value)
            .unwrap_or(previous_volume);
        cache.set_sound_fade(layer.id.clone(), FadeWindow::fade_in(start, current_volume, fade_in_ms));
    } else if should_play && !was_playing {
        cache.set_sound_fade(layer.id.clone(), FadeWindow::fade_in(0.0, current_volume, fade_in_ms));
    } else if !should_play && was_playing && has_played && !is_fading_already {
        cache.set_sound_fade(layer.id.clone(), FadeWindow::fade_out(current_volume, fade_in_ms));
    }

    let is_fading = cache.sound_fade(&layer.id).is_some();
    let audio_length_samples = file.map(|f| f.num_frames() as u64).unwrap_or(0);
    let is_one_shot = layer.loop_length_ms.is_none();

    let runtime = cache.layer_runtime(&layer.id).expect("just inserted");
    let loop_length_samples =
        runtime.loop_length_samples(layer, file.map(|f| f.duration_ms()), SAMPLE_RATE);

    let runtime = cache.layer_runtime_mut(&layer.id).expect("just inserted");
    let advance: ChunkAdvance = runtime.advance_chunk(
        CHUNK_SAMPLES,
        is_one_shot,
        loop_length_samples.max(1),
        audio_length_samples,
        |rt| {
            let selects_new_sound = rt.has_played();
            let freqs = sound_frequencies(layer, preset_layer);
            rt.end_of_loop(layer, preset_layer, &freqs, &mut *rng, current_volume);
            let idx = rt.active_sound_index().min(layer.sounds.len() - 1);
            let next_sound = &layer.sounds[idx];
            let next_file = registry.lookup(&next_sound.file_id);
            // SPEC_FULL.md §2 "usage_count": bumped once per layer-sound
            // selection event, i.e. every end_of_loop that actually chose a
            // new active sound rather than just resetting the clocks.
            if selects_new_sound {
                if let Some(f) = next_file {
                    f.bump_usage();
                }
            }
            let next_audio_len = next_file.map(|f| f.num_frames() as u64).unwrap_or(0);
            let next_loop_len =
                rt.loop_length_samples(layer, next_file.map(|f| f.duration_ms()), SAMPLE_RATE);
            (next_loop_len.max(1), next_audio_len)
        },
    );

    let mut copied_samples = false;
    if should_play || is_fading {
        if let Some(f) = file {
            let gain = effective_volume_including_fade(current_volume, cache.sound_fade(&layer.id));
            copy_spans_into(&advance, f.pcm(), gain, env_l, env_r);
            copied_samples = !advance.spans.is_empty();
        }
    }

    let runtime = cache.layer_runtime_mut(&layer.id).expect("just inserted");
    if copied_samples {
        runtime.set_has_played();
    }
    runtime.set_was_playing(should_play);
    runtime.set_previous_volume(current_volume);
    if advance.finished {
        runtime.mark_finished();
    }

    should_play
}

fn copy_spans_into(advance: &ChunkAdvance, pcm: &[f32], gain: f32, dest_l: &mut [f32], dest_r: &mut [f32]) {
    let num_frames = pcm.len() / 2;
    for span in &advance.spans {
        for i in 0..span.len {
            let src = span.src_frame + i;
            if src >= num_frames {
                break;
            }
            let dest = span.dest_frame + i;
            if dest >= dest_l.len() {
                break;
            }
            dest_l[dest] += pcm[src * 2] * gain;
            dest_r[dest] += pcm[src * 2 + 1] * gain;
        }
    }
}

fn mix_soundboard(
    cache: &mut RuntimeCache,
    registry: &SoundFileRegistry,
    normalize_enabled: bool,
    main_l: &mut [f32],
    main_r: &mut [f32],
) {
    let keys = cache.soundboard_keys();
    let mut finished_keys = Vec::new();

    for key in keys {
        let Some(layer) = cache.soundboard_layer(&key).cloned() else {
            continue;
        };
        let sound = &layer.sounds[0];
        let file = registry.lookup(&sound.file_id);
        let peak = file.map(|f| f.peak_volume()).unwrap_or(0.0);
        let volume = effective_volume(&layer, None, sound, None, peak, normalize_enabled);
        let audio_length_samples = file.map(|f| f.num_frames() as u64).unwrap_or(0);

        let Some(runtime) = cache.soundboard_runtime_mut(&key) else {
            continue;
        };
        let advance = runtime.advance_chunk(
            CHUNK_SAMPLES,
            true,
            audio_length_samples.max(1),
            audio_length_samples,
            |_| (1, 0),
        );

        if let Some(f) = file {
            copy_spans_into(&advance, f.pcm(), volume, main_l, main_r);
            f.bump_usage();
        }

        if advance.finished {
            finished_keys.push(key);
        }
    }

    for key in finished_keys {
        cache.remove_soundboard_runtime(&key);
    }
}
