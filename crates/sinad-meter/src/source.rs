//! Capture sources.
//!
//! A [`Source`] delivers fixed-size batches of samples once started. Sources
//! are only ever driven through [`ActiveSource`], which starts them on
//! acquisition and stops and closes them when released or dropped, so a
//! failing measurement never leaves a capture stream running.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The device or stream could not be opened.
    #[error("failed to open source: {0}")]
    Open(String),

    /// Source-specific setting missing or of the wrong type.
    #[error("invalid setting '{key}': {message}")]
    Setting {
        /// Setting name
        key: String,
        /// What is wrong with it
        message: String,
    },

    /// `read` called while the stream is stopped.
    #[error("source is not started")]
    NotStarted,

    /// Operation on a closed source.
    #[error("source is closed")]
    Closed,

    /// Device-level failure while running.
    #[error("device error: {0}")]
    Device(String),
}

/// Capture parameters handed to a source factory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceArgs {
    /// Sample frequency in Hz
    pub sample_frequency: f32,
    /// Duration of one read in seconds
    pub record_length: f32,
    /// Device name or index, for sources that need one
    pub device: Option<String>,
    /// Source-specific settings
    #[serde(default)]
    pub settings: toml::Table,
}

impl SourceArgs {
    /// Arguments without a device or extra settings.
    #[must_use]
    pub fn new(sample_frequency: f32, record_length: f32) -> Self {
        Self {
            sample_frequency,
            record_length,
            device: None,
            settings: toml::Table::new(),
        }
    }

    /// Samples per read.
    #[must_use]
    pub fn num_samples(&self) -> usize {
        (self.sample_frequency * self.record_length).round().max(0.0) as usize
    }
}

/// A stream of sample batches.
///
/// Lifecycle: `start` -> `read`* -> `stop` -> `close`. Implementations must
/// tolerate `stop` and `close` being called after a failed `start`.
pub trait Source {
    /// Begin streaming.
    fn start(&mut self) -> Result<(), SourceError>;

    /// Stop streaming; the source may be started again.
    fn stop(&mut self) -> Result<(), SourceError>;

    /// Release the underlying device. Terminal.
    fn close(&mut self) -> Result<(), SourceError>;

    /// Block until the next batch is available and return it.
    fn read(&mut self) -> Result<Vec<f32>, SourceError>;

    /// Full-scale sample range `(min, max)`.
    fn sample_range(&self) -> (f32, f32);

    /// Unit of the samples, e.g. "AU" or "V".
    fn sample_unit(&self) -> &str;
}

/// A started source that is stopped and closed when it goes out of scope.
pub struct ActiveSource {
    source: Option<Box<dyn Source>>,
}

impl ActiveSource {
    /// Start `source` and take ownership of it.
    ///
    /// # Errors
    /// The error from `start`. The source is closed before returning.
    pub fn acquire(mut source: Box<dyn Source>) -> Result<Self, SourceError> {
        if let Err(err) = source.start() {
            if let Err(close_err) = source.close() {
                log::warn!("closing source after failed start: {}", close_err);
            }
            return Err(err);
        }
        log::debug!("source started");
        Ok(Self {
            source: Some(source),
        })
    }

    fn source(&self) -> Result<&dyn Source, SourceError> {
        self.source.as_deref().ok_or(SourceError::Closed)
    }

    /// Read the next batch.
    ///
    /// # Errors
    /// Whatever the underlying source reports.
    pub fn read(&mut self) -> Result<Vec<f32>, SourceError> {
        self.source
            .as_deref_mut()
            .ok_or(SourceError::Closed)?
            .read()
    }

    /// Full-scale sample range of the underlying source.
    ///
    /// # Errors
    /// [`SourceError::Closed`] after release.
    pub fn sample_range(&self) -> Result<(f32, f32), SourceError> {
        Ok(self.source()?.sample_range())
    }

    /// Sample unit of the underlying source.
    ///
    /// # Errors
    /// [`SourceError::Closed`] after release.
    pub fn sample_unit(&self) -> Result<&str, SourceError> {
        Ok(self.source()?.sample_unit())
    }

    /// Stop and close the source, reporting the first failure.
    ///
    /// `close` runs even when `stop` fails.
    ///
    /// # Errors
    /// The `stop` error if any, else the `close` error.
    pub fn release(mut self) -> Result<(), SourceError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), SourceError> {
        let Some(mut source) = self.source.take() else {
            return Ok(());
        };
        let stopped = source.stop();
        let closed = source.close();
        log::debug!("source released");
        stopped.and(closed)
    }
}

impl Drop for ActiveSource {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::warn!("releasing source: {}", err);
        }
    }
}
