//! Stereo 4th-order Butterworth high-pass / low-pass filter.
//!
//! A 4th-order Butterworth response is built from two cascaded 2nd-order
//! sections (`ambience_core::Biquad`) whose Q factors come from the
//! standard even-order Butterworth pole-pair decomposition:
//!
//! ```text
//! Q_k = 1 / (2 * cos((2k - 1) * pi / (2 * n))),  k = 1..=n/2, n = 4
//! ```
//!
//! which gives `Q1 ≈ 0.541196` and `Q2 ≈ 1.306563`. Each channel gets its
//! own pair of sections so left/right filter state never cross-talks.

use ambience_core::biquad::{Biquad, highpass_coefficients, lowpass_coefficients};

/// Q factors for a 4th-order Butterworth cascade (two 2nd-order sections).
const BUTTERWORTH_4_Q: [f32; 2] = [0.541_196, 1.306_563];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    HighPass,
    LowPass,
}

/// A stereo 4th-order Butterworth filter (high-pass or low-pass).
///
/// State is persistent across frames per channel, as required by the
/// mixer's DSP chain: coefficients are recomputed only when the cutoff
/// changes, never on every frame, and `reset` never runs implicitly.
#[derive(Debug, Clone)]
pub struct ButterworthFilter {
    kind: Kind,
    cutoff_hz: f32,
    sample_rate: f32,
    // [channel][section]
    sections: [[Biquad; 2]; 2],
}

impl ButterworthFilter {
    fn new(kind: Kind, cutoff_hz: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            kind,
            cutoff_hz,
            sample_rate,
            sections: [[Biquad::new(), Biquad::new()], [Biquad::new(), Biquad::new()]],
        };
        filter.recompute();
        filter
    }

    /// Construct a high-pass section. `cutoff_hz == 0.0` still computes
    /// valid coefficients; callers skip invoking the filter entirely for
    /// the "disabled" case per spec (hpf == 0) — this type does not know
    /// about that convention.
    pub fn high_pass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(Kind::HighPass, cutoff_hz, sample_rate)
    }

    /// Construct a low-pass section.
    pub fn low_pass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(Kind::LowPass, cutoff_hz, sample_rate)
    }

    /// Current cutoff frequency in Hz.
    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    /// Change the cutoff frequency, recomputing coefficients without
    /// touching the delay-line state.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff_hz = cutoff_hz;
        self.recompute();
    }

    fn recompute(&mut self) {
        let freq = self.cutoff_hz.max(1.0).min(self.sample_rate * 0.49);
        for (section_idx, &q) in BUTTERWORTH_4_Q.iter().enumerate() {
            let (b0, b1, b2, a0, a1, a2) = match self.kind {
                Kind::HighPass => highpass_coefficients(freq, q, self.sample_rate),
                Kind::LowPass => lowpass_coefficients(freq, q, self.sample_rate),
            };
            for channel in &mut self.sections {
                channel[section_idx].set_coefficients(b0, b1, b2, a0, a1, a2);
            }
        }
    }

    /// Process one stereo frame in place.
    pub fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        for sample in left.iter_mut() {
            let mut x = *sample;
            for section in &mut self.sections[0] {
                x = section.process(x);
            }
            *sample = x;
        }
        for sample in right.iter_mut() {
            let mut x = *sample;
            for section in &mut self.sections[1] {
                x = section.process(x);
            }
            *sample = x;
        }
    }

    /// Clear delay-line state on both channels without changing the
    /// cutoff. Used only on explicit reset (environment restart), never
    /// implicitly mid-stream, per spec §4.5.
    pub fn reset(&mut self) {
        for channel in &mut self.sections {
            for section in channel {
                section.clear();
            }
        }
    }
}
