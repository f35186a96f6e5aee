//! Two-sided peak-following compressor.
//!
//! Unlike a conventional attack/release envelope-follower compressor, this
//! section evaluates gain once per frame from the frame's peak level and
//! smooths the *gain* itself across frames — matching the behavior of the
//! system this engine replaces exactly, including its two-sided threshold
//! region (an "upward" zone below `low_threshold_db` and a "downward" zone
//! above `high_threshold_db`, with a dead zone of unity gain between them).

use ambience_core::math::{clamp, db_to_linear, linear_to_db};

/// Gain smoothing factor applied each frame: `gain = 0.9*prev + 0.1*target`.
const SMOOTHING_PREV_WEIGHT: f32 = 0.9;
const SMOOTHING_TARGET_WEIGHT: f32 = 0.1;

/// Per-channel peak-following compressor state.
#[derive(Debug, Clone, Copy)]
struct ChannelState {
    gain: f32,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self { gain: 1.0 }
    }
}

/// Two-sided threshold compressor, stereo, operating on whole frames.
///
/// `ratio == 1.0` disables the compressor entirely (the frame passes
/// through unchanged, gain state untouched) — the ratio-of-1 skip matches
/// the reference mixer's `_apply_compressor` behavior.
#[derive(Debug, Clone)]
pub struct Compressor {
    low_threshold_db: f32,
    high_threshold_db: f32,
    ratio: f32,
    channels: [ChannelState; 2],
}

impl Compressor {
    /// Create a compressor with the given two-sided threshold region and
    /// ratio (`ratio >= 1.0`; `1.0` disables processing).
    pub fn new(low_threshold_db: f32, high_threshold_db: f32, ratio: f32) -> Self {
        Self {
            low_threshold_db,
            high_threshold_db,
            ratio: ratio.max(1.0),
            channels: [ChannelState::default(); 2],
        }
    }

    /// Update the threshold/ratio configuration in place. Gain state is
    /// preserved across the change (no click).
    pub fn set_params(&mut self, low_threshold_db: f32, high_threshold_db: f32, ratio: f32) {
        self.low_threshold_db = low_threshold_db;
        self.high_threshold_db = high_threshold_db;
        self.ratio = ratio.max(1.0);
    }

    /// Reset gain state to unity on both channels.
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            *channel = ChannelState::default();
        }
    }

    fn target_gain_db(&self, peak_db: f32) -> f32 {
        if peak_db <= self.low_threshold_db {
            (self.low_threshold_db - peak_db) / self.ratio
        } else if peak_db >= self.high_threshold_db {
            -(peak_db - self.high_threshold_db) * (1.0 - 1.0 / self.ratio)
        } else {
            0.0
        }
    }

    /// Apply the compressor to one stereo frame in place.
    pub fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        if self.ratio <= 1.0 {
            return;
        }
        for (channel_idx, buf) in [&mut *left, &mut *right].into_iter().enumerate() {
            let peak = buf.iter().fold(0.0_f32, |acc, &s| acc.max(s.abs()));
            let peak_db = linear_to_db(peak);
            let target_gain_db = self.target_gain_db(peak_db);
            let target_gain = db_to_linear(target_gain_db);

            let state = &mut self.channels[channel_idx];
            state.gain = SMOOTHING_PREV_WEIGHT * state.gain + SMOOTHING_TARGET_WEIGHT * target_gain;

            for sample in buf.iter_mut() {
                *sample = clamp(*sample * state.gain, -1.0, 1.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_ratio_disables_processing() {
        let mut comp = Compressor::new(-10.0, 0.0, 1.0);
        let mut left = vec![0.5; 16];
        let mut right = vec![0.5; 16];
        comp.process_stereo(&mut left, &mut right);
        assert!(left.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn inside_dead_zone_converges_to_unity_gain() {
        let mut comp = Compressor::new(-40.0, -1.0, 2.0);
        let mut left = vec![0.1; 4096];
        let mut right = vec![0.1; 4096];
        for _ in 0..4096 / 64 {
            let l = &mut left[..64];
            let r = &mut right[..64];
            comp.process_stereo(l, r);
        }
        assert!((comp.channels[0].gain - 1.0).abs() < 0.05);
    }

    #[test]
    fn upward_compression_below_low_threshold() {
        // peak at -20 dBFS ~ 0.1, low=-10, high=0, ratio=2
        // expected steady gain_db = (low - peak)/ratio = (-10 - (-20))/2 = 5 dB
        let mut comp = Compressor::new(-10.0, 0.0, 2.0);
        let frame_len = 1920;
        for _ in 0..200 {
            let mut left = vec![0.1_f32; frame_len];
            let mut right = vec![0.1_f32; frame_len];
            comp.process_stereo(&mut left, &mut right);
        }
        let expected_gain = db_to_linear(5.0);
        assert!(
            (comp.channels[0].gain - expected_gain).abs() / expected_gain < 0.1,
            "gain {} expected {}",
            comp.channels[0].gain,
            expected_gain
        );
    }

    #[test]
    fn output_stays_within_clip_bounds() {
        let mut comp = Compressor::new(-40.0, -20.0, 4.0);
        let mut left = vec![1.0; 64];
        let mut right = vec![-1.0; 64];
        for _ in 0..50 {
            comp.process_stereo(&mut left, &mut right);
        }
        assert!(left.iter().all(|&s| (-1.0..=1.0).contains(&s)));
        assert!(right.iter().all(|&s| (-1.0..=1.0).contains(&s)));
    }
}
