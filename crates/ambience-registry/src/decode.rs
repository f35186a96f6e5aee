//! Sound-file decoding: on-disk audio -> 48 kHz stereo float32 PCM.
//!
//! The decoder is a pluggable boundary (MP3/WAV/OGG support can vary by
//! build), per the engine's external-collaborator contract for file-format
//! decoding. Only WAV is implemented here since it's the one input format
//! representable with the corpus's existing `hound` dependency; MP3/OGG
//! support plugs in against the same [`Decoder`] trait.

use crate::error::{Error, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;

pub const TARGET_SAMPLE_RATE: u32 = 48_000;

/// Decoded audio: 48 kHz stereo float32 PCM, interleaved `[L, R, L, R, ...]`.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub interleaved: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Number of stereo frames.
    pub fn num_frames(&self) -> usize {
        self.interleaved.len() / 2
    }
}

/// A pluggable audio-file decoder.
pub trait Decoder: Send + Sync {
    /// File extensions this decoder claims, lowercase, without a dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Decode the file at `path` into 48 kHz stereo float32 PCM.
    fn decode(&self, path: &Path) -> Result<DecodedAudio>;
}

/// WAV decoder built on `hound`. Handles any channel count (mono is
/// duplicated to stereo, other channel counts are downmixed by averaging)
/// and any sample rate (resampled to 48 kHz via linear interpolation --
/// adequate for ambience loops; not a DAW-quality resampler, per the
/// engine's stated non-goals).
#[derive(Debug, Default)]
pub struct WavDecoder;

impl Decoder for WavDecoder {
    fn extensions(&self) -> &'static [&'static str] {
        &["wav", "wave"]
    }

    fn decode(&self, path: &Path) -> Result<DecodedAudio> {
        let reader =
            WavReader::open(path).map_err(|e| Error::decode(path, format!("open: {e}")))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            return Err(Error::decode(path, "zero channels"));
        }

        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::decode(path, format!("read float samples: {e}")))?,
            SampleFormat::Int => {
                let bits = spec.bits_per_sample;
                let max_val = (1i64 << (bits - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| Error::decode(path, format!("read int samples: {e}")))?
            }
        };

        if samples.is_empty() {
            return Err(Error::EmptyAudio {
                path: path.to_path_buf(),
            });
        }

        let stereo = to_stereo(&samples, channels);
        let resampled = if spec.sample_rate == TARGET_SAMPLE_RATE {
            stereo
        } else {
            resample_linear(&stereo, spec.sample_rate, TARGET_SAMPLE_RATE)
        };

        Ok(DecodedAudio {
            interleaved: resampled,
            sample_rate: TARGET_SAMPLE_RATE,
        })
    }
}

/// Convert an interleaved multi-channel buffer to interleaved stereo.
/// Mono is duplicated to both channels; anything else is downmixed by
/// averaging all channels into a single value duplicated to both.
fn to_stereo(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels == 2 {
        return samples.to_vec();
    }
    if channels == 1 {
        let mut out = Vec::with_capacity(samples.len() * 2);
        for &s in samples {
            out.push(s);
            out.push(s);
        }
        return out;
    }
    let mut out = Vec::with_capacity((samples.len() / channels) * 2);
    for frame in samples.chunks(channels) {
        let avg = frame.iter().sum::<f32>() / channels as f32;
        out.push(avg);
        out.push(avg);
    }
    out
}

/// Linear-interpolation resample of interleaved stereo audio.
fn resample_linear(stereo: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let in_frames = stereo.len() / 2;
    if in_frames == 0 {
        return Vec::new();
    }
    let ratio = to_rate as f64 / from_rate as f64;
    let out_frames = ((in_frames as f64) * ratio).round().max(1.0) as usize;
    let mut out = Vec::with_capacity(out_frames * 2);

    for i in 0..out_frames {
        let src_pos = i as f64 / ratio;
        let idx0 = src_pos.floor() as usize;
        let idx1 = (idx0 + 1).min(in_frames - 1);
        let frac = (src_pos - idx0 as f64) as f32;
        let idx0 = idx0.min(in_frames - 1);

        for ch in 0..2 {
            let a = stereo[idx0 * 2 + ch];
            let b = stereo[idx1 * 2 + ch];
            out.push(a + (b - a) * frac);
        }
    }
    out
}
