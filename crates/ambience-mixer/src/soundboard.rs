//! `play_soundboard`: trigger a one-shot sound outside any environment's
//! layer schedule (spec §4.4).

use ambience_model::{Layer, LayerMode, LayerSound};
use ambience_runtime::LayerRuntime;
use tracing::warn;

use crate::mixer::Inner;

/// Create (if absent) a runtime for `file_id` keyed `"soundboard_{file_id}"`
/// with a synthesized non-looping layer: weight 0 (never competes for an
/// environment's weight budget), chance 1 (always gated open), SINGLE
/// mode, one sound. Re-triggering an id already playing restarts it from
/// the beginning rather than layering a second instance, matching a
/// soundboard button's usual press-to-restart behavior.
///
/// Returns `false` without creating anything if no app-state snapshot has
/// ever been published: `run_one_frame`'s no-snapshot branch never reaches
/// `mix_soundboard`, so a runtime inserted here would be advanced and
/// finished by nothing, spinning the audio thread forever on an id that
/// can never play (examples/original_source/audio_processing/models/mixer.py
/// `play_soundboard_sound`: "Cannot play soundboard sound - no app state").
pub fn play_soundboard(inner: &mut Inner, file_id: &str) -> bool {
    if inner.snapshot.is_none() {
        warn!("cannot play soundboard sound {file_id} - no app state published yet");
        return false;
    }

    let key = format!("soundboard_{file_id}");
    let layer = Layer {
        id: key.clone(),
        name: format!("soundboard:{file_id}"),
        sounds: vec![LayerSound {
            id: format!("{file_id}-sound"),
            file_id: file_id.to_string(),
            frequency: 1.0,
            volume: 1.0,
        }],
        chance: 1.0,
        cooldown_cycles: 0,
        loop_length_ms: None,
        weight: 0.0,
        volume: 1.0,
        mode: LayerMode::Single,
        selected_sound_index: 0,
    };
    let runtime = LayerRuntime::new(&layer, 1.0, inner.rng.as_mut());
    inner.cache.insert_soundboard(key, layer, runtime);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::Mixer;
    use ambience_model::{AppState, Effects};
    use ambience_registry::SoundFileRegistry;
    use ambience_transport::MockTransport;
    use std::sync::Arc;

    fn empty_app_state() -> AppState {
        AppState {
            environments: vec![],
            master_volume: 1.0,
            soundboard: vec![],
            effects: Effects::default(),
            files: vec![],
        }
    }

    #[test]
    fn play_soundboard_creates_a_runtime_once_a_snapshot_exists() {
        let mixer = Mixer::new(Arc::new(SoundFileRegistry::new()), Box::new(MockTransport::new()));
        mixer.publish(empty_app_state());
        mixer.play_soundboard("clip-1");
        assert!(mixer.is_running());
        mixer.stop().unwrap();
    }

    #[test]
    fn play_soundboard_without_a_published_snapshot_does_not_start_the_thread() {
        let mixer = Mixer::new(Arc::new(SoundFileRegistry::new()), Box::new(MockTransport::new()));
        mixer.play_soundboard("clip-1");
        assert!(!mixer.is_running());
    }
}
