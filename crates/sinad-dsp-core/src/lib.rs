//! SINAD DSP Core Library
//!
//! Streaming signal conditioning for automated SINAD measurement.
//! Every processor owns its state and is fed successive sample batches in
//! arrival order; chunked processing matches processing the whole signal.
//! This crate is `no_std` compatible (with `alloc`) when built without the
//! default `std` feature.
//!
//! # Modules
//!
//! - [`types`] - Batch helpers: mean-square power, RMS, channel extraction
//! - [`filter`] - Streaming FIR filter and moving average
//! - [`filter_design`] - Windowed-sinc FIR design (low/high/band-pass)
//! - [`agc`] - Batch automatic gain control toward a target RMS
//! - [`oscillator`] - Test-tone NCO
//! - [`error`] - Error types

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod agc;
pub mod error;
pub mod filter;
pub mod filter_design;
pub mod oscillator;
pub mod types;

// Re-export commonly used types
pub use agc::{Agc, AgcConfig};
pub use error::{DspError, ErrorKind};
pub use filter::{MovingAverage, StreamingFilter};
pub use filter_design::{
    design_bandpass, design_highpass, design_lowpass, make_bandpass_filter, make_highpass_filter,
    make_lowpass_filter, FirDesign, Window, DEFAULT_NUM_TAPS,
};
pub use oscillator::Nco;
pub use types::{extract_channel, mean_square, mean_square_f64, rms, to_db};
