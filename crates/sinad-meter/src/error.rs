//! Error types for measurement plumbing.

use sinad_dsp_core::DspError;
use thiserror::Error;

use crate::source::SourceError;

/// Measurement error.
#[derive(Error, Debug)]
pub enum MeterError {
    /// Invalid filter or AGC parameters.
    #[error(transparent)]
    Dsp(#[from] DspError),

    /// Source failed to open, start, read or shut down.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// No factory registered under this name.
    #[error("unknown source '{0}'")]
    UnknownSource(String),

    /// A factory with this name is already registered.
    #[error("source '{0}' is already registered")]
    DuplicateSource(String),

    /// A read returned the wrong number of samples.
    #[error("expected {expected} samples per read, got {actual}")]
    ShortRead {
        /// Samples per read implied by sample frequency and record length
        expected: usize,
        /// Samples actually returned
        actual: usize,
    },

    /// Configuration value out of range.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// What is wrong
        message: String,
    },

    /// Configuration file did not parse.
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Signal generator rejected a command.
    #[error("signal generator: {0}")]
    Generator(String),

    /// Downstream consumer rejected a batch.
    #[error("sink: {0}")]
    Sink(String),
}

impl MeterError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        MeterError::InvalidConfiguration {
            message: message.into(),
        }
    }
}
