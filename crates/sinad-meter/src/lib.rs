//! SINAD Meter
//!
//! Measurement-side plumbing around the conditioning core: capture sources
//! behind a common trait, an explicit source registry, scoped acquisition,
//! the filter/AGC conditioning chain and the generator power sweep.
//!
//! # Modules
//!
//! - [`source`] - Source trait, arguments and the scoped [`ActiveSource`] guard
//! - [`registry`] - Name to source factory map built by the caller
//! - [`tone`] - Simulated tone-plus-noise source
//! - [`conditioning`] - Filter selection and filter/AGC chain
//! - [`sweep`] - Power sweep over a signal generator
//! - [`config`] - TOML configuration
//! - [`error`] - Error types

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod conditioning;
pub mod config;
pub mod error;
pub mod registry;
pub mod source;
pub mod sweep;
pub mod tone;

pub use conditioning::{ChainOrder, Conditioner, ConditioningConfig};
pub use config::{MeterConfig, SourceConfig};
pub use error::MeterError;
pub use registry::{SourceFactory, SourceInfo, SourceRegistry};
pub use source::{ActiveSource, Source, SourceArgs, SourceError};
pub use sweep::{run_measurement, BatchSink, SignalGenerator, StepSummary, Sweep, SweepConfig};
pub use tone::{ToneSource, ToneSourceFactory};
