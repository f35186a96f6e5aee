//! Ambience Core - DSP primitives shared by the ambience engine's filters.
//!
//! This crate provides the foundational building blocks the DSP chain in
//! `ambience-dsp` is built from: the biquad section used for every IIR
//! filter in the chain (high-pass, low-pass, and the speech-ducker's
//! bandpass trio), and a handful of level-conversion helpers.
//!
//! # Core Abstractions
//!
//! - [`Biquad`] - second-order IIR filter section with RBJ cookbook
//!   coefficients; cascaded in pairs to build the 4th-order Butterworth
//!   high-pass/low-pass stages
//!
//! # no_std support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature
//! in your `Cargo.toml` to build without it.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod biquad;
pub mod math;

pub use biquad::{
    Biquad, bandpass_coefficients, highpass_coefficients, lowpass_coefficients, notch_coefficients,
    peaking_eq_coefficients,
};
pub use math::{clamp, db_to_linear, lerp, linear_to_db, ms_to_samples};
