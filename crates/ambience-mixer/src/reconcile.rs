//! State reconciliation (spec §4.6, component C6): diffs the previous
//! and next declarative app-states, starts/stops environment fades, and
//! recovers an orphaned preset reference.
//!
//! Preserving an in-progress fade across a reconcile (spec §4.6 step 1)
//! needs no explicit timestamp copy here: an environment's [`EnvFade`]
//! lives in the mixer's runtime cache keyed by environment id, entirely
//! off the declarative tree, so a reconcile that doesn't touch that
//! environment's play_state leaves its fade untouched automatically.
//! This function only starts or clears fades for environments whose
//! `play_state` actually changed.

use ambience_model::{AppState, Environment, PlayState};
use tracing::warn;

use crate::env_fade::EnvFade;
use crate::mixer::Inner;

/// Apply `next` on top of `inner`'s current snapshot (`prev`), starting
/// or clearing environment fades as needed, and publish the result.
/// Returns whether the caller should start the audio thread.
pub(crate) fn apply(inner: &mut Inner, prev: Option<&AppState>, mut next: AppState) -> bool {
    for env in &mut next.environments {
        recover_orphan_preset(env, prev);
    }

    let crossfade_ms = next.effects.fades.crossfade_duration_ms;
    let transitions = compute_transitions(prev, &next.environments);
    let is_crossfade = transitions.iter().any(|(_, s)| *s == PlayState::Stopped)
        && transitions.iter().any(|(_, s)| *s == PlayState::Playing)
        && transitions.len() == 2;

    for (env_id, new_state) in &transitions {
        match new_state {
            PlayState::Stopped => {
                inner
                    .cache
                    .env_fades_mut()
                    .insert(env_id.clone(), EnvFade::start(PlayState::Stopped, crossfade_ms));
            }
            PlayState::Playing => {
                let another_active = is_crossfade
                    || next.environments.iter().any(|e| {
                        &e.id != env_id
                            && (e.play_state == PlayState::Playing || inner.cache.env_fade(&e.id).is_some())
                    });
                if another_active {
                    inner
                        .cache
                        .env_fades_mut()
                        .insert(env_id.clone(), EnvFade::start(PlayState::Playing, crossfade_ms));
                } else {
                    // Instant-on: no other environment is audible, so the
                    // newly playing one needs no crossfade window.
                    inner.cache.env_fades_mut().remove(env_id);
                }
            }
        }
    }

    inner.dsp.set_filter_cutoffs(
        next.effects.filters.high_pass.frequency,
        next.effects.filters.low_pass.frequency,
    );
    inner.dsp.set_compressor(
        next.effects.compressor.low_threshold_db,
        next.effects.compressor.high_threshold_db,
        next.effects.compressor.ratio,
    );

    let wants_playback = next
        .environments
        .iter()
        .any(|e| e.play_state == PlayState::Playing || inner.cache.env_fade(&e.id).is_some());

    inner.snapshot = Some(next);
    wants_playback && !inner.running
}

/// Per-environment `(id, new_play_state)` for every environment whose
/// play_state actually changed between `prev` and `next`. An environment
/// absent from `prev` is treated as having been STOPPED.
fn compute_transitions(prev: Option<&AppState>, next_envs: &[Environment]) -> Vec<(String, PlayState)> {
    next_envs
        .iter()
        .filter_map(|env| {
            let prev_state = prev
                .and_then(|p| p.environment(&env.id))
                .map(|e| e.play_state)
                .unwrap_or(PlayState::Stopped);
            if prev_state != env.play_state {
                Some((env.id.clone(), env.play_state))
            } else {
                None
            }
        })
        .collect()
}

/// Recover an `active_preset_id` that no longer matches any preset on
/// `env` (spec §7 "Reconciler preset orphan"): fall back to the
/// previous snapshot's active preset for this environment if it is
/// still valid, otherwise clear it and warn. Never an error.
fn recover_orphan_preset(env: &mut Environment, prev: Option<&AppState>) {
    let Some(active_id) = env.active_preset_id.clone() else {
        return;
    };
    if env.presets.iter().any(|p| p.id == active_id) {
        return;
    }

    let recovered = prev
        .and_then(|p| p.environment(&env.id))
        .and_then(|prev_env| prev_env.active_preset_id.as_ref())
        .filter(|id| env.presets.iter().any(|p| &p.id == *id))
        .cloned();

    match recovered {
        Some(id) => {
            warn!(
                env = %env.id,
                orphaned = %active_id,
                recovered = %id,
                "recovered orphaned active preset from previous snapshot"
            );
            env.active_preset_id = Some(id);
        }
        None => {
            warn!(
                env = %env.id,
                orphaned = %active_id,
                "active preset not found in either snapshot; clearing"
            );
            env.active_preset_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambience_model::Effects;
    use ambience_model::Preset;
    use proptest::prelude::*;

    fn test_inner() -> Inner {
        use ambience_dsp::{DspChain, DspConfig};
        use ambience_registry::SoundFileRegistry;
        use ambience_runtime::FixedRng;
        use ambience_transport::MockTransport;
        use std::sync::Arc;

        Inner {
            snapshot: None,
            cache: crate::cache::RuntimeCache::new(),
            dsp: DspChain::new(48_000.0, DspConfig::default()),
            rng: Box::new(FixedRng::always(0.0, 0)),
            transport: Box::new(MockTransport::new()),
            registry: Arc::new(SoundFileRegistry::new()),
            running: false,
        }
    }

    fn env(id: &str, state: PlayState) -> Environment {
        Environment {
            id: id.into(),
            name: id.into(),
            max_weight: 1.0,
            background_image: None,
            soundboard: vec![],
            layers: vec![],
            presets: vec![],
            active_preset_id: None,
            play_state: state,
        }
    }

    fn state(envs: Vec<Environment>) -> AppState {
        AppState {
            environments: envs,
            master_volume: 1.0,
            soundboard: vec![],
            effects: Effects::default(),
            files: vec![],
        }
    }

    #[test]
    fn transitions_detect_state_changes_only() {
        let prev = state(vec![env("a", PlayState::Playing), env("b", PlayState::Stopped)]);
        let next = vec![env("a", PlayState::Playing), env("b", PlayState::Playing)];
        let transitions = compute_transitions(Some(&prev), &next);
        assert_eq!(transitions, vec![("b".to_string(), PlayState::Playing)]);
    }

    #[test]
    fn missing_prev_environment_treated_as_stopped() {
        let next = vec![env("new", PlayState::Playing)];
        let transitions = compute_transitions(None, &next);
        assert_eq!(transitions, vec![("new".to_string(), PlayState::Playing)]);
    }

    #[test]
    fn orphaned_preset_recovers_from_prev_snapshot() {
        let mut prev_env = env("a", PlayState::Playing);
        prev_env.presets.push(Preset {
            id: "p1".into(),
            name: "Calm".into(),
            max_weight: None,
            layers: vec![],
            is_default: false,
        });
        prev_env.active_preset_id = Some("p1".into());
        let prev = state(vec![prev_env]);

        let mut next_env = env("a", PlayState::Playing);
        next_env.presets.push(Preset {
            id: "p1".into(),
            name: "Calm".into(),
            max_weight: None,
            layers: vec![],
            is_default: false,
        });
        next_env.active_preset_id = Some("stale-id".into());

        recover_orphan_preset(&mut next_env, Some(&prev));
        assert_eq!(next_env.active_preset_id, Some("p1".into()));
    }

    #[test]
    fn unrecoverable_orphan_preset_is_cleared() {
        let mut next_env = env("a", PlayState::Playing);
        next_env.active_preset_id = Some("missing".into());
        recover_orphan_preset(&mut next_env, None);
        assert_eq!(next_env.active_preset_id, None);
    }

    proptest! {
        /// Spec §8 property 6: a reconcile that leaves a fading
        /// environment's play_state untouched preserves its in-progress
        /// fade exactly (same progress before and after `apply`).
        #[test]
        fn reconcile_preserves_an_unrelated_in_progress_fade(
            crossfade_ms in 100u32..5000,
            elapsed_ms in 0u32..5000,
        ) {
            let mut inner = test_inner();
            let mut fade = EnvFade::start(PlayState::Playing, crossfade_ms);
            fade.advance(elapsed_ms);
            let progress_before = fade.fade_progress();
            inner.cache.env_fades_mut().insert("a".to_string(), fade);

            let prev = state(vec![env("a", PlayState::Playing)]);
            let next = state(vec![env("a", PlayState::Playing)]);
            apply(&mut inner, Some(&prev), next);

            let progress_after = inner
                .cache
                .env_fade("a")
                .expect("untouched environment keeps its fade")
                .fade_progress();
            prop_assert!((progress_before - progress_after).abs() < 1e-6);
        }

        /// Spec §8 property 7: when env A goes PLAYING->STOPPED and env B
        /// goes STOPPED->PLAYING in one reconcile, both fades are present
        /// immediately after and share the same duration (both complete
        /// together after `crossfade_duration` elapses).
        #[test]
        fn crossfade_gives_both_environments_equal_duration_fades(
            crossfade_ms in 100u32..5000,
        ) {
            let mut inner = test_inner();
            let prev = state(vec![env("a", PlayState::Playing), env("b", PlayState::Stopped)]);
            let mut next = state(vec![env("a", PlayState::Stopped), env("b", PlayState::Playing)]);
            next.effects.fades.crossfade_duration_ms = crossfade_ms;

            apply(&mut inner, Some(&prev), next);

            prop_assert!(inner.cache.env_fade("a").is_some());
            prop_assert!(inner.cache.env_fade("b").is_some());

            inner.cache.advance_env_fades(crossfade_ms / 2);
            prop_assert!(inner.cache.env_fade("a").is_some());
            prop_assert!(inner.cache.env_fade("b").is_some());

            inner.cache.advance_env_fades(crossfade_ms - crossfade_ms / 2);
            prop_assert!(inner.cache.env_fade("a").is_none());
            prop_assert!(inner.cache.env_fade("b").is_none());
        }
    }
}
