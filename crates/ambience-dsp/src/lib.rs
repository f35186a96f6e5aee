//! Ambience DSP - the mixer's fixed-order stereo processing chain.
//!
//! This crate provides the three stages applied to the final mix every
//! frame, plus a [`DspChain`] that composes them in the required order:
//!
//! - [`ButterworthFilter`] - 4th-order Butterworth high-pass/low-pass
//! - [`Compressor`] - two-sided peak-following dynamics
//! - [`SpeechDucker`] - 3-band speech-range attenuation
//!
//! ## Example
//!
//! ```rust,ignore
//! use ambience_dsp::{DspChain, DspConfig};
//!
//! let mut chain = DspChain::new(48000.0, DspConfig::default());
//! chain.process_stereo(&mut left, &mut right, 0.0, false);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod chain;
pub mod compressor;
pub mod ducker;
pub mod filter;

pub use chain::{DspChain, DspConfig};
pub use compressor::Compressor;
pub use ducker::SpeechDucker;
pub use filter::ButterworthFilter;
