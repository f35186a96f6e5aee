//! Fade windows (spec §4.2/§4.3): every parameter change that the mixer
//! applies audibly — a layer-sound starting or stopping, a sound's own
//! volume changing, or a whole environment crossfading in or out — rides
//! a linear ramp instead of jumping. [`FadeWindow`] is the one ramp
//! primitive shared by all of them: a `(v_start, v_end)` pair advanced
//! over a fixed duration, mirroring spec §4.2's `(t0, t1, v0, v1)` tuple
//! (the mixer advances `elapsed_ms` by real frame time rather than
//! comparing against wall-clock timestamps, which is equivalent and
//! keeps the ramp replayable in tests).

use ambience_core::lerp;

/// A linear ramp between two volumes over a fixed duration.
/// `duration_ms == 0` completes instantly on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeWindow {
    v_start: f32,
    v_end: f32,
    duration_ms: u32,
    elapsed_ms: u32,
}

impl FadeWindow {
    /// A ramp from `v_start` to `v_end` over `duration_ms`.
    pub fn new(v_start: f32, v_end: f32, duration_ms: u32) -> Self {
        Self {
            v_start,
            v_end,
            duration_ms,
            elapsed_ms: 0,
        }
    }

    /// `start_fade_in(v_start)` (spec §4.2): ramps from `v_start` up to
    /// `target` (the layer-sound's steady effective volume).
    pub fn fade_in(v_start: f32, target: f32, duration_ms: u32) -> Self {
        Self::new(v_start, target, duration_ms)
    }

    /// `start_fade_out()` (spec §4.2): ramps from the current effective
    /// volume down to silence.
    pub fn fade_out(current: f32, duration_ms: u32) -> Self {
        Self::new(current, 0.0, duration_ms)
    }

    /// Advance the ramp by `delta_ms` of (frame-accounted) time.
    pub fn advance(&mut self, delta_ms: u32) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
    }

    /// `0.0` at the start of the ramp, `1.0` once it has fully elapsed.
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            1.0
        } else {
            (self.elapsed_ms as f32 / self.duration_ms as f32).min(1.0)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }

    /// The interpolated volume this ramp currently holds.
    pub fn value(&self) -> f32 {
        lerp(self.v_start, self.v_end, self.progress())
    }
}

/// Apply an in-flight fade (if any) on top of an already-resolved
/// effective volume. A completed or absent fade leaves `base` untouched.
pub fn effective_volume_including_fade(base: f32, fade: Option<&FadeWindow>) -> f32 {
    match fade {
        Some(f) => f.value(),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fade_in_ramps_from_start_to_target() {
        let mut f = FadeWindow::fade_in(0.2, 0.8, 1000);
        assert!((f.value() - 0.2).abs() < 1e-6);
        f.advance(500);
        assert!((f.value() - 0.5).abs() < 1e-6);
        f.advance(500);
        assert!((f.value() - 0.8).abs() < 1e-6);
        assert!(f.is_complete());
    }

    #[test]
    fn fade_out_ramps_to_zero() {
        let mut f = FadeWindow::fade_out(0.6, 200);
        assert!((f.value() - 0.6).abs() < 1e-6);
        f.advance(200);
        assert_eq!(f.value(), 0.0);
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let f = FadeWindow::fade_in(0.0, 1.0, 0);
        assert_eq!(f.value(), 1.0);
        assert!(f.is_complete());
    }

    #[test]
    fn overshoot_clamps_at_target() {
        let mut f = FadeWindow::fade_out(0.9, 100);
        f.advance(10_000);
        assert_eq!(f.value(), 0.0);
    }

    #[test]
    fn monotonic_fade_in_never_decreases() {
        let mut f = FadeWindow::fade_in(0.1, 0.9, 1000);
        let mut last = f.value();
        for _ in 0..20 {
            f.advance(50);
            let v = f.value();
            assert!(v >= last - 1e-6);
            last = v;
        }
    }

    #[test]
    fn effective_volume_passthrough_without_fade() {
        assert_eq!(effective_volume_including_fade(0.8, None), 0.8);
    }

    proptest! {
        /// Spec §8 property 5: for a pure fade-in over `d` ms advanced in
        /// fixed frame-sized steps, `value()` is monotonically
        /// non-decreasing and reaches the target within `d` ± one frame.
        #[test]
        fn fade_in_is_monotonic_and_reaches_target(
            v_start in 0.0f32..1.0,
            spread in 0.0f32..1.0,
            duration_ms in 40u32..10_000,
        ) {
            let target = v_start + spread;
            let mut f = FadeWindow::fade_in(v_start, target, duration_ms);
            let mut last = f.value();
            let frame_ms = 40;
            let mut elapsed = 0u32;
            while elapsed < duration_ms + frame_ms {
                f.advance(frame_ms);
                elapsed += frame_ms;
                let v = f.value();
                prop_assert!(v >= last - 1e-5, "fade value decreased: {} -> {}", last, v);
                last = v;
            }
            prop_assert!((f.value() - target).abs() < 1e-4);
        }
    }
}
