//! Fixed-order DSP chain applied to the final stereo mix each frame.
//!
//! Order is HPF -> LPF -> compressor -> speech ducker, per spec. The two
//! filters are skipped as a pair (not independently) exactly when
//! `high_pass_hz == 0.0 AND low_pass_hz == nyquist`; this is the only
//! "disabled" fast path. State for every stage persists across frames and
//! is never reset implicitly.

use crate::compressor::Compressor;
use crate::ducker::SpeechDucker;
use crate::filter::ButterworthFilter;

/// Static configuration for one frame's DSP pass. Recomputing coefficients
/// every frame would be wasteful; callers only call the `set_*` methods
/// on [`DspChain`] when a value actually changed.
#[derive(Debug, Clone, Copy)]
pub struct DspConfig {
    pub high_pass_hz: f32,
    pub low_pass_hz: f32,
    pub compressor_low_threshold_db: f32,
    pub compressor_high_threshold_db: f32,
    pub compressor_ratio: f32,
    pub dampen_speech_amount: f32,
}

impl Default for DspConfig {
    fn default() -> Self {
        Self {
            high_pass_hz: 0.0,
            low_pass_hz: 20_000.0,
            compressor_low_threshold_db: -40.0,
            compressor_high_threshold_db: 0.0,
            compressor_ratio: 2.0,
            dampen_speech_amount: 0.0,
        }
    }
}

/// The mixer's fixed-order DSP chain: HPF -> LPF -> compressor -> ducker.
#[derive(Debug, Clone)]
pub struct DspChain {
    sample_rate: f32,
    high_pass_hz: f32,
    low_pass_hz: f32,
    hpf: ButterworthFilter,
    lpf: ButterworthFilter,
    compressor: Compressor,
    ducker: SpeechDucker,
}

impl DspChain {
    /// Build a new chain at the given sample rate and initial config.
    pub fn new(sample_rate: f32, config: DspConfig) -> Self {
        Self {
            sample_rate,
            high_pass_hz: config.high_pass_hz,
            low_pass_hz: config.low_pass_hz,
            hpf: ButterworthFilter::high_pass(config.high_pass_hz.max(1.0), sample_rate),
            lpf: ButterworthFilter::low_pass(config.low_pass_hz, sample_rate),
            compressor: Compressor::new(
                config.compressor_low_threshold_db,
                config.compressor_high_threshold_db,
                config.compressor_ratio,
            ),
            ducker: SpeechDucker::new(sample_rate),
        }
    }

    fn nyquist(&self) -> f32 {
        self.sample_rate * 0.5
    }

    fn filters_disabled(&self) -> bool {
        self.high_pass_hz == 0.0 && self.low_pass_hz >= self.nyquist()
    }

    /// Update filter cutoffs. A no-op when the value is unchanged, so the
    /// mixer can call this unconditionally every frame.
    pub fn set_filter_cutoffs(&mut self, high_pass_hz: f32, low_pass_hz: f32) {
        if self.high_pass_hz != high_pass_hz {
            self.high_pass_hz = high_pass_hz;
            self.hpf.set_cutoff(high_pass_hz.max(1.0));
        }
        if self.low_pass_hz != low_pass_hz {
            self.low_pass_hz = low_pass_hz;
            self.lpf.set_cutoff(low_pass_hz.min(self.nyquist()));
        }
    }

    /// Update compressor threshold/ratio.
    pub fn set_compressor(&mut self, low_threshold_db: f32, high_threshold_db: f32, ratio: f32) {
        self.compressor.set_params(low_threshold_db, high_threshold_db, ratio);
    }

    /// Reset all persistent filter/compressor/ducker state. Used only on
    /// an explicit mixer-level reset, never mid-stream.
    pub fn reset(&mut self) {
        self.hpf.reset();
        self.lpf.reset();
        self.compressor.reset();
        self.ducker.reset();
    }

    /// Run the fixed-order chain over one stereo frame in place.
    ///
    /// `dampen_speech_amount` and `voice_activity` gate the ducker: it
    /// only runs when `dampen_speech_amount > 0.0 && voice_activity`.
    pub fn process_stereo(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        dampen_speech_amount: f32,
        voice_activity: bool,
    ) {
        if !self.filters_disabled() {
            self.hpf.process_stereo(left, right);
            self.lpf.process_stereo(left, right);
        }
        self.compressor.process_stereo(left, right);
        if dampen_speech_amount > 0.0 && voice_activity {
            self.ducker.process_stereo(left, right, dampen_speech_amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_filters_skip_processing() {
        let config = DspConfig {
            compressor_ratio: 1.0,
            ..Default::default()
        };
        let mut chain = DspChain::new(48000.0, config);
        let mut left = vec![0.4; 16];
        let mut right = vec![0.4; 16];
        chain.process_stereo(&mut left, &mut right, 0.0, false);
        assert!(left.iter().all(|&s| s == 0.4));
    }

    #[test]
    fn nonzero_high_pass_enables_filtering() {
        let config = DspConfig {
            high_pass_hz: 500.0,
            compressor_ratio: 1.0,
            ..Default::default()
        };
        let mut chain = DspChain::new(48000.0, config);
        let mut left = vec![1.0; 4096];
        let mut right = vec![1.0; 4096];
        chain.process_stereo(&mut left, &mut right, 0.0, false);
        assert!(left[4095].abs() < 0.1);
    }
}
