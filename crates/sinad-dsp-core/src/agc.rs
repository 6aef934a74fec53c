//! Automatic Gain Control (AGC) over sample batches.
//!
//! Tracks a smoothed mean-square power estimate across batches and scales
//! each batch toward a target RMS. A single exponential smoothing constant
//! drives both the power estimate and the applied gain, which gives a
//! first-order attack/release response.

use alloc::vec::Vec;

use crate::error::DspError;
use crate::types::mean_square_f64;
#[allow(unused_imports)]
use micromath::F32Ext;

/// Lower bound on the power estimate before taking its square root.
///
/// Silent input therefore drives the gain toward `target_rms / sqrt(POWER_FLOOR)`
/// (1e5 × `target_rms`), which is large but finite.
pub const POWER_FLOOR: f32 = 1e-10;

/// 2^128 and its square root, used to keep `power_sqrt` inside the `f32` range.
#[cfg(not(feature = "std"))]
const POWER_SHIFT: (f64, f64) = (3.402_823_669_209_385e38, 1.844_674_407_370_955_2e19);

/// Square root of a power estimate that may exceed the `f32` range.
#[cfg(feature = "std")]
fn power_sqrt(power: f64) -> f64 {
    power.sqrt()
}

/// Square root of a power estimate that may exceed the `f32` range.
///
/// Without std only the `f32` square root is available, so the result has
/// `f32` precision.
#[cfg(not(feature = "std"))]
fn power_sqrt(power: f64) -> f64 {
    let (shift, root) = POWER_SHIFT;
    let mut power = power;
    let mut scale = 1.0f64;
    while power > f64::from(f32::MAX) {
        power /= shift;
        scale *= root;
    }
    f64::from((power as f32).sqrt()) * scale
}

/// AGC configuration parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AgcConfig {
    /// Desired output RMS level (> 0)
    pub target_rms: f32,
    /// Smoothing factor for power and gain, in `[0, 1]`.
    /// 0 freezes the state, 1 corrects instantly.
    pub smoothing_factor: f32,
    /// Gain applied before the first batch (> 0)
    pub initial_gain: f32,
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self {
            target_rms: 1.0,
            smoothing_factor: 0.01,
            initial_gain: 1.0,
        }
    }
}

impl AgcConfig {
    /// Config with the given target and default smoothing/initial gain.
    #[must_use]
    pub fn new(target_rms: f32) -> Self {
        Self {
            target_rms,
            ..Self::default()
        }
    }

    /// Unsmoothed preset: every batch is corrected to the target on its own.
    #[must_use]
    pub const fn instant(target_rms: f32) -> Self {
        Self {
            target_rms,
            smoothing_factor: 1.0,
            initial_gain: 1.0,
        }
    }

    /// Slow preset for long sweeps where pumping must be avoided.
    #[must_use]
    pub const fn slow(target_rms: f32) -> Self {
        Self {
            target_rms,
            smoothing_factor: 0.001,
            initial_gain: 1.0,
        }
    }

    /// Check every parameter against its allowed range.
    ///
    /// # Errors
    /// Returns the first violated constraint. NaN fails every check.
    pub fn validate(&self) -> Result<(), DspError> {
        if !(0.0..=1.0).contains(&self.smoothing_factor) {
            return Err(DspError::SmoothingFactor(self.smoothing_factor));
        }
        if !(self.target_rms > 0.0) {
            return Err(DspError::TargetRms(self.target_rms));
        }
        if !(self.initial_gain > 0.0) {
            return Err(DspError::InitialGain(self.initial_gain));
        }
        Ok(())
    }
}

/// Batch Automatic Gain Control.
///
/// ```
/// use sinad_dsp_core::{Agc, AgcConfig};
///
/// let mut agc = Agc::new(AgcConfig::instant(0.5)).unwrap();
/// let mut batch = [0.1_f32; 64];
/// agc.process(&mut batch);
/// assert!((batch[0] - 0.5).abs() < 1e-4);
/// ```
#[derive(Clone, Debug)]
pub struct Agc {
    config: AgcConfig,
    /// Smoothed gain applied to the last batch
    gain: f64,
    /// Smoothed mean-square power estimate
    power_estimate: f64,
}

impl Agc {
    /// Create a new AGC.
    ///
    /// # Errors
    /// Any out-of-range parameter in `config`, see [`AgcConfig::validate`].
    pub fn new(config: AgcConfig) -> Result<Self, DspError> {
        config.validate()?;
        let power_estimate = Self::initial_power(&config);
        log::debug!(
            "agc: target_rms={} smoothing={} initial_gain={}",
            config.target_rms,
            config.smoothing_factor,
            config.initial_gain
        );
        Ok(Self {
            config,
            gain: f64::from(config.initial_gain),
            power_estimate,
        })
    }

    fn initial_power(config: &AgcConfig) -> f64 {
        let rms = f64::from(config.target_rms / config.initial_gain);
        rms * rms
    }

    /// Apply gain control to a batch in place.
    ///
    /// An empty batch leaves the state untouched.
    pub fn process(&mut self, batch: &mut [f32]) {
        if batch.is_empty() {
            return;
        }
        // f64 state: the power of any finite f32 batch stays finite.
        let alpha = f64::from(self.config.smoothing_factor);
        let batch_power = mean_square_f64(batch);

        self.power_estimate = alpha * batch_power + (1.0 - alpha) * self.power_estimate;

        let estimated_rms = power_sqrt(self.power_estimate.max(f64::from(POWER_FLOOR)));
        let target_gain = f64::from(self.config.target_rms) / estimated_rms;

        self.gain = alpha * target_gain + (1.0 - alpha) * self.gain;
        log::trace!(
            "agc: batch_power={} estimate={} gain={}",
            batch_power,
            self.power_estimate,
            self.gain
        );

        let gain = self.gain as f32;
        for sample in batch.iter_mut() {
            *sample *= gain;
        }
    }

    /// Apply gain control to a copy of `batch`.
    #[must_use]
    pub fn process_to_vec(&mut self, batch: &[f32]) -> Vec<f32> {
        let mut output = batch.to_vec();
        self.process(&mut output);
        output
    }

    /// Gain applied to the most recently processed batch.
    #[must_use]
    pub fn current_gain(&self) -> f32 {
        self.gain as f32
    }

    /// Smoothed power estimate after the most recent batch.
    #[must_use]
    pub fn current_power_estimate(&self) -> f32 {
        self.power_estimate as f32
    }

    /// Target output RMS.
    #[must_use]
    pub fn target_rms(&self) -> f32 {
        self.config.target_rms
    }

    /// Smoothing factor shared by power and gain tracking.
    #[must_use]
    pub fn smoothing_factor(&self) -> f32 {
        self.config.smoothing_factor
    }

    /// Configuration this AGC was built from.
    #[must_use]
    pub fn config(&self) -> &AgcConfig {
        &self.config
    }

    /// Reset AGC state to its initial gain and power estimate.
    pub fn reset(&mut self) {
        self.gain = f64::from(self.config.initial_gain);
        self.power_estimate = Self::initial_power(&self.config);
    }
}
