//! Generator power sweep.
//!
//! For each power level the generator is retuned, a source is acquired for
//! the duration of the step, a fixed number of batches is read, conditioned
//! and handed to a [`BatchSink`]. Spectral analysis and reporting happen in
//! the sink.

use serde::{Deserialize, Serialize};
use sinad_dsp_core::{rms, to_db, MovingAverage};

use crate::conditioning::Conditioner;
use crate::config::MeterConfig;
use crate::error::MeterError;
use crate::registry::SourceRegistry;
use crate::source::{ActiveSource, SourceArgs};

/// Window of the per-step level smoother, in batches.
const LEVEL_WINDOW: usize = 16;

/// RF signal generator driven by the sweep.
pub trait SignalGenerator {
    /// Switch the RF output on or off.
    fn set_output(&mut self, enabled: bool) -> Result<(), MeterError>;

    /// Set the output power in dBm.
    fn set_power(&mut self, power_dbm: f32) -> Result<(), MeterError>;
}

/// Consumer of conditioned batches.
pub trait BatchSink {
    /// Take one conditioned batch captured at `power_dbm`.
    fn accept(&mut self, power_dbm: f32, batch: &[f32]) -> Result<(), MeterError>;
}

impl<F> BatchSink for F
where
    F: FnMut(f32, &[f32]) -> Result<(), MeterError>,
{
    fn accept(&mut self, power_dbm: f32, batch: &[f32]) -> Result<(), MeterError> {
        self(power_dbm, batch)
    }
}

/// Sweep parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// First power level in dBm
    pub start_dbm: f32,
    /// Last power level in dBm (inclusive)
    pub stop_dbm: f32,
    /// Number of power levels
    pub steps: usize,
    /// Batches captured per power level
    pub reads_per_step: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start_dbm: -125.0,
            stop_dbm: -95.0,
            steps: 51,
            reads_per_step: 128,
        }
    }
}

impl SweepConfig {
    /// Evenly spaced power levels from `start_dbm` to `stop_dbm` inclusive.
    #[must_use]
    pub fn power_levels(&self) -> Vec<f32> {
        match self.steps {
            0 => Vec::new(),
            1 => vec![self.start_dbm],
            steps => {
                let step = (self.stop_dbm - self.start_dbm) / (steps - 1) as f32;
                (0..steps)
                    .map(|n| {
                        if n == steps - 1 {
                            self.stop_dbm
                        } else {
                            self.start_dbm + step * n as f32
                        }
                    })
                    .collect()
            }
        }
    }

    /// Check the step counts and level range.
    ///
    /// # Errors
    /// [`MeterError::InvalidConfiguration`] for zero steps or reads, or
    /// non-finite levels.
    pub fn validate(&self) -> Result<(), MeterError> {
        if self.steps == 0 {
            return Err(MeterError::config("sweep needs at least one step"));
        }
        if self.reads_per_step == 0 {
            return Err(MeterError::config("reads_per_step must be at least 1"));
        }
        if !self.start_dbm.is_finite() || !self.stop_dbm.is_finite() {
            return Err(MeterError::config("sweep levels must be finite"));
        }
        Ok(())
    }
}

/// Level statistics of the conditioned batches of one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepSummary {
    /// Generator power in dBm
    pub power_dbm: f32,
    /// Batches captured
    pub batches: usize,
    /// Mean batch RMS level in dB
    pub level_mean_db: f32,
    /// Population standard deviation of the batch levels in dB
    pub level_std_db: f32,
    /// Moving average over the last batches of the step, in dB
    pub smoothed_level_db: f32,
}

/// A power sweep.
#[derive(Clone, Copy, Debug)]
pub struct Sweep {
    config: SweepConfig,
}

impl Sweep {
    /// Create a sweep.
    ///
    /// # Errors
    /// See [`SweepConfig::validate`].
    pub fn new(config: SweepConfig) -> Result<Self, MeterError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Sweep parameters.
    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run every step of the sweep.
    ///
    /// The generator output is switched off before the first step and after
    /// the last one, also when a step fails.
    ///
    /// # Errors
    /// The first generator, source, short-read or sink error.
    pub fn run(
        &self,
        generator: &mut dyn SignalGenerator,
        registry: &SourceRegistry,
        source_name: &str,
        args: &SourceArgs,
        conditioner: &mut Conditioner,
        sink: &mut dyn BatchSink,
    ) -> Result<Vec<StepSummary>, MeterError> {
        generator.set_output(false)?;
        let mut summaries = Vec::with_capacity(self.config.steps);
        let mut result = Ok(());
        for power_dbm in self.config.power_levels() {
            match self.run_step(power_dbm, generator, registry, source_name, args, conditioner, sink) {
                Ok(summary) => summaries.push(summary),
                Err(err) => {
                    log::error!("step at {} dBm failed: {}", power_dbm, err);
                    result = Err(err);
                    break;
                }
            }
        }
        let off = generator.set_output(false);
        result?;
        off?;
        Ok(summaries)
    }

    /// Run a single power level.
    ///
    /// # Errors
    /// The first generator, source, short-read or sink error. The source is
    /// stopped and closed in every case.
    #[allow(clippy::too_many_arguments)]
    pub fn run_step(
        &self,
        power_dbm: f32,
        generator: &mut dyn SignalGenerator,
        registry: &SourceRegistry,
        source_name: &str,
        args: &SourceArgs,
        conditioner: &mut Conditioner,
        sink: &mut dyn BatchSink,
    ) -> Result<StepSummary, MeterError> {
        generator.set_power(power_dbm)?;
        generator.set_output(true)?;

        let expected = args.num_samples();
        let mut active = ActiveSource::acquire(registry.open(source_name, args)?)?;
        let mut levels = Vec::with_capacity(self.config.reads_per_step);
        let mut smoothed = MovingAverage::<LEVEL_WINDOW>::new();

        for _ in 0..self.config.reads_per_step {
            let mut batch = active.read()?;
            if batch.len() != expected {
                return Err(MeterError::ShortRead {
                    expected,
                    actual: batch.len(),
                });
            }
            conditioner.process(&mut batch);

            let level_db = to_db(rms(&batch));
            levels.push(level_db);
            smoothed.update(level_db);
            log::trace!("{:8.3} dBm: batch level {:8.3} dB", power_dbm, level_db);

            sink.accept(power_dbm, &batch)?;
        }
        active.release()?;

        let (level_mean_db, level_std_db) = mean_std(&levels);
        log::info!(
            "{:8.3} dBm: level={:8.3} dB std={:8.3} dB",
            power_dbm,
            level_mean_db,
            level_std_db
        );
        Ok(StepSummary {
            power_dbm,
            batches: levels.len(),
            level_mean_db,
            level_std_db,
            smoothed_level_db: smoothed.value(),
        })
    }
}

fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (f32::NAN, f32::NAN);
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    (mean, variance.sqrt())
}

/// Run a full measurement described by `config`.
///
/// Resolves the source through `registry`, builds the conditioning chain
/// once for the whole sweep and runs it.
///
/// # Errors
/// Configuration errors, then anything [`Sweep::run`] reports.
pub fn run_measurement(
    config: &MeterConfig,
    registry: &SourceRegistry,
    generator: &mut dyn SignalGenerator,
    sink: &mut dyn BatchSink,
) -> Result<Vec<StepSummary>, MeterError> {
    let args = config.source_args(registry)?;
    let mut conditioner = Conditioner::new(&config.conditioning, args.sample_frequency)?;
    let sweep = Sweep::new(config.sweep)?;
    log::info!(
        "sweep {} -> {} dBm in {} steps using '{}'",
        config.sweep.start_dbm,
        config.sweep.stop_dbm,
        config.sweep.steps,
        config.source.name
    );
    sweep.run(generator, registry, &config.source.name, &args, &mut conditioner, sink)
}
