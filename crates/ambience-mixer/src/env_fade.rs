//! Environment-level fade windows (spec §4.3).
//!
//! Unlike per-sound fades (`ambience_model::FadeWindow`, ridden directly
//! by a steady volume), an environment's fade is directional: the same
//! ramp reads as rising progress while fading in and falling progress
//! while fading out. [`EnvFade`] wraps one `FadeWindow` and flips its
//! reading based on which transition started it.

use ambience_model::{FadeWindow, PlayState};

/// An in-progress environment crossfade or fade-out, keyed by
/// environment id in the mixer's runtime cache. Lives independently of
/// the declarative `AppState` tree, so a reconcile that leaves an
/// environment's id unchanged automatically preserves its in-progress
/// fade (spec §4.6 step 1) — there is no `(fade_start, fade_end)` pair
/// to copy between trees because this state was never on the tree to
/// begin with.
#[derive(Debug, Clone)]
pub struct EnvFade {
    window: FadeWindow,
    target: PlayState,
}

impl EnvFade {
    /// Start a fade toward `target` over `duration_ms`. `target ==
    /// Playing` ramps progress 0 -> 1 (fade-in); `target == Stopped`
    /// ramps 1 -> 0 (fade-out).
    pub fn start(target: PlayState, duration_ms: u32) -> Self {
        Self {
            window: FadeWindow::new(0.0, 1.0, duration_ms),
            target,
        }
    }

    pub fn advance(&mut self, delta_ms: u32) {
        self.window.advance(delta_ms);
    }

    /// `raw` for a fade-in, `1 - raw` for a fade-out (spec §4.3).
    pub fn fade_progress(&self) -> f32 {
        let raw = self.window.value();
        match self.target {
            PlayState::Playing => raw,
            PlayState::Stopped => 1.0 - raw,
        }
    }

    /// True while the window has not yet fully elapsed.
    pub fn is_fading(&self) -> bool {
        !self.window.is_complete()
    }

    pub fn target(&self) -> PlayState {
        self.target
    }
}
