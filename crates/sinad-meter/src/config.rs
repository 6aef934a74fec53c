//! TOML configuration for a measurement run.
//!
//! ```toml
//! [source]
//! name = "tone"
//! sample_frequency = 48000.0
//! record_length = 0.25
//!
//! [source.settings]
//! frequency = 1000.0
//! noise_rms = 0.01
//!
//! [sweep]
//! start_dbm = -125.0
//! stop_dbm = -95.0
//! steps = 51
//! reads_per_step = 128
//!
//! [conditioning]
//! low_cutoff = 200.0
//! high_cutoff = 4000.0
//!
//! [conditioning.agc]
//! target_rms = 0.5
//! smoothing_factor = 0.01
//! ```
//!
//! Every section and field is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::conditioning::ConditioningConfig;
use crate::error::MeterError;
use crate::registry::SourceRegistry;
use crate::source::SourceArgs;
use crate::sweep::SweepConfig;

/// Which source to open and how.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Registry name of the source
    pub name: String,
    /// Sample frequency in Hz; the source default when unset
    pub sample_frequency: Option<f32>,
    /// Seconds per read; the source default when unset
    pub record_length: Option<f32>,
    /// Device name or index
    pub device: Option<String>,
    /// Source-specific settings
    pub settings: toml::Table,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: "tone".to_string(),
            sample_frequency: None,
            record_length: None,
            device: None,
            settings: toml::Table::new(),
        }
    }
}

/// Complete measurement configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    /// Capture source
    pub source: SourceConfig,
    /// Generator sweep
    pub sweep: SweepConfig,
    /// Filter and AGC chain
    pub conditioning: ConditioningConfig,
}

impl MeterConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    /// [`MeterError::Toml`] for malformed input or unknown enum values.
    pub fn from_toml_str(text: &str) -> Result<Self, MeterError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    /// [`MeterError::Io`] if the file cannot be read, otherwise as
    /// [`MeterConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MeterError> {
        let path = path.as_ref();
        log::debug!("loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the sweep and conditioning sections.
    ///
    /// The source section is checked when arguments are resolved against a
    /// registry.
    ///
    /// # Errors
    /// [`MeterError::InvalidConfiguration`].
    pub fn validate(&self) -> Result<(), MeterError> {
        self.sweep.validate()?;
        self.conditioning.validate()
    }

    /// Capture arguments for the configured source, filling unset fields
    /// from the source's defaults.
    ///
    /// # Errors
    /// [`MeterError::UnknownSource`] if the name is not registered,
    /// [`MeterError::InvalidConfiguration`] for a non-positive sample
    /// frequency or a record length shorter than one sample.
    pub fn source_args(&self, registry: &SourceRegistry) -> Result<SourceArgs, MeterError> {
        let source = &self.source;
        let info = registry
            .info(&source.name)
            .ok_or_else(|| MeterError::UnknownSource(source.name.clone()))?;

        let mut args = info.default_args();
        if let Some(fs) = source.sample_frequency {
            args.sample_frequency = fs;
        }
        if let Some(length) = source.record_length {
            args.record_length = length;
        }
        args.device = source.device.clone();
        args.settings = source.settings.clone();

        if !(args.sample_frequency > 0.0) || !args.sample_frequency.is_finite() {
            return Err(MeterError::config(format!(
                "sample_frequency must be positive, got {}",
                args.sample_frequency
            )));
        }
        if args.num_samples() == 0 {
            return Err(MeterError::config(format!(
                "record_length {} s is shorter than one sample",
                args.record_length
            )));
        }
        Ok(args)
    }
}
