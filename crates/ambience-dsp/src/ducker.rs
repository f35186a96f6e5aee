//! Speech-band ducker: attenuates the mix while another voice-chat
//! participant is speaking, by isolating and subtracting speech-range
//! energy rather than gating the whole signal.

use ambience_core::biquad::{Biquad, bandpass_coefficients};

/// Center bands and their relative weights in the isolated speech signal.
const BANDS_HZ: [(f32, f32); 3] = [(100.0, 600.0), (600.0, 2000.0), (2000.0, 4000.0)];
const BAND_WEIGHTS: [f32; 3] = [1.0, 1.5, 0.5];

fn band_q(low_hz: f32, high_hz: f32) -> (f32, f32) {
    let center = (low_hz * high_hz).sqrt();
    let bandwidth = high_hz - low_hz;
    (center, center / bandwidth)
}

/// Stereo 3-band speech-range ducker.
///
/// Bypassed entirely (by the caller) when `amount == 0` or no participant
/// is currently speaking. If the isolated signal or the result ever goes
/// non-finite, the filter state is reset and the chunk is passed through
/// unchanged for that frame — this mirrors the reference mixer's NaN
/// recovery, which otherwise would latch a NaN into the IIR state forever.
#[derive(Debug, Clone)]
pub struct SpeechDucker {
    sample_rate: f32,
    // [channel][band]
    sections: [[Biquad; 3]; 2],
}

impl SpeechDucker {
    /// Build a new ducker at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let mut ducker = Self {
            sample_rate,
            sections: [
                [Biquad::new(), Biquad::new(), Biquad::new()],
                [Biquad::new(), Biquad::new(), Biquad::new()],
            ],
        };
        ducker.recompute();
        ducker
    }

    fn recompute(&mut self) {
        for (band_idx, &(low, high)) in BANDS_HZ.iter().enumerate() {
            let (center, q) = band_q(low, high);
            let (b0, b1, b2, a0, a1, a2) = bandpass_coefficients(center, q, self.sample_rate);
            for channel in &mut self.sections {
                channel[band_idx].set_coefficients(b0, b1, b2, a0, a1, a2);
            }
        }
    }

    /// Reset all band-filter state on both channels.
    pub fn reset(&mut self) {
        for channel in &mut self.sections {
            for section in channel {
                section.clear();
            }
        }
    }

    fn isolate_speech(&mut self, channel: usize, sample: f32) -> f32 {
        let bands = &mut self.sections[channel];
        let mut isolated = 0.0;
        for (band_idx, &weight) in BAND_WEIGHTS.iter().enumerate() {
            isolated += bands[band_idx].process(sample) * weight;
        }
        isolated
    }

    /// Apply the ducker in place. `amount` is the duck strength in
    /// `[0, 1]`; `attenuation_db = -24 * amount`, matching the reference
    /// mixer's fixed 24 dB-per-unit-amount curve.
    ///
    /// Results are staged into scratch buffers first: if any sample goes
    /// non-finite, the filter state resets and the *entire* chunk passes
    /// through untouched, rather than leaving the samples processed before
    /// the fault in place (spec §4.5 / §7: "pass the chunk through
    /// unchanged").
    pub fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32], amount: f32) {
        debug_assert_eq!(left.len(), right.len());
        if amount <= 0.0 {
            return;
        }
        let attenuation_db = -24.0 * amount;
        let subtract_fraction = 1.0 - ambience_core::math::db_to_linear(attenuation_db);

        let mut staged: [Vec<f32>; 2] = [Vec::with_capacity(left.len()), Vec::with_capacity(right.len())];
        let mut went_nonfinite = false;
        for (channel_idx, buf) in [&*left, &*right].into_iter().enumerate() {
            for &sample in buf {
                let speech = self.isolate_speech(channel_idx, sample);
                let result = sample - speech * subtract_fraction;
                if !result.is_finite() || !speech.is_finite() {
                    went_nonfinite = true;
                    break;
                }
                staged[channel_idx].push(result);
            }
            if went_nonfinite {
                break;
            }
        }

        if went_nonfinite {
            self.reset();
            return;
        }

        left.copy_from_slice(&staged[0]);
        right.copy_from_slice(&staged[1]);
    }
}
