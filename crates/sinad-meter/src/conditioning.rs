//! Conditioning chain: band-limiting filter and AGC.

use serde::{Deserialize, Serialize};
use sinad_dsp_core::{Agc, AgcConfig, FirDesign, StreamingFilter, Window, DEFAULT_NUM_TAPS};

use crate::error::MeterError;

/// Lowest band edge the reference meter accepts, in Hz.
pub const MIN_LOW_CUTOFF: f32 = 20.0;

/// Highest band edge the reference meter accepts, in Hz.
pub const MAX_HIGH_CUTOFF: f32 = 50_000.0;

/// Order in which the filter and the AGC see each batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainOrder {
    /// Band-limit first, then level the filtered signal
    #[default]
    FilterThenAgc,
    /// Level first, then band-limit
    AgcThenFilter,
}

/// Conditioning parameters.
///
/// The band edges mirror the reference meter's low/high cutoff settings:
/// both set gives a band-pass, only `low_cutoff` a high-pass, only
/// `high_cutoff` a low-pass.
///
/// Older bench scripts built a low-pass at the low edge when only that edge
/// was set. Here a lone low edge always removes content below it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditioningConfig {
    /// Lower band edge in Hz
    pub low_cutoff: Option<f32>,
    /// Upper band edge in Hz
    pub high_cutoff: Option<f32>,
    /// FIR length (odd)
    pub num_taps: usize,
    /// FIR design window
    pub window: Window,
    /// AGC parameters; `None` disables gain control
    pub agc: Option<AgcConfig>,
    /// Filter/AGC ordering
    pub order: ChainOrder,
}

impl Default for ConditioningConfig {
    fn default() -> Self {
        Self {
            low_cutoff: Some(200.0),
            high_cutoff: Some(4000.0),
            num_taps: DEFAULT_NUM_TAPS,
            window: Window::Hamming,
            agc: None,
            order: ChainOrder::FilterThenAgc,
        }
    }
}

impl ConditioningConfig {
    /// No filtering, no AGC.
    #[must_use]
    pub fn passthrough() -> Self {
        Self {
            low_cutoff: None,
            high_cutoff: None,
            agc: None,
            ..Self::default()
        }
    }

    /// Check the band edges against the reference meter's limits.
    ///
    /// # Errors
    /// [`MeterError::InvalidConfiguration`] for an edge outside
    /// `[20 Hz, 50 kHz]` or edges out of order.
    pub fn validate(&self) -> Result<(), MeterError> {
        if let Some(low) = self.low_cutoff {
            if !(low >= MIN_LOW_CUTOFF) {
                return Err(MeterError::config(format!(
                    "low_cutoff {low} Hz is below {MIN_LOW_CUTOFF} Hz"
                )));
            }
        }
        if let Some(high) = self.high_cutoff {
            if !(high <= MAX_HIGH_CUTOFF) {
                return Err(MeterError::config(format!(
                    "high_cutoff {high} Hz is above {MAX_HIGH_CUTOFF} Hz"
                )));
            }
        }
        if let (Some(low), Some(high)) = (self.low_cutoff, self.high_cutoff) {
            if low >= high {
                return Err(MeterError::config(format!(
                    "low_cutoff {low} Hz must be below high_cutoff {high} Hz"
                )));
            }
        }
        Ok(())
    }

    fn design(&self, sample_frequency: f32) -> Option<FirDesign> {
        let design = match (self.low_cutoff, self.high_cutoff) {
            (Some(low), Some(high)) => FirDesign::bandpass(sample_frequency, low, high),
            (Some(low), None) => FirDesign::highpass(sample_frequency, low),
            (None, Some(high)) => FirDesign::lowpass(sample_frequency, high),
            (None, None) => return None,
        };
        Some(design.num_taps(self.num_taps).window(self.window))
    }
}

/// Filter and AGC applied to every captured batch, in arrival order.
#[derive(Clone, Debug)]
pub struct Conditioner {
    filter: Option<StreamingFilter>,
    agc: Option<Agc>,
    order: ChainOrder,
}

impl Conditioner {
    /// Build the chain for a capture at `sample_frequency`.
    ///
    /// # Errors
    /// Configuration limits, filter design or AGC parameter errors.
    pub fn new(config: &ConditioningConfig, sample_frequency: f32) -> Result<Self, MeterError> {
        config.validate()?;
        let filter = config
            .design(sample_frequency)
            .map(|design| design.build())
            .transpose()?;
        let agc = config.agc.map(Agc::new).transpose()?;
        log::info!(
            "conditioning: filter={} taps, agc={}, order={:?}",
            filter.as_ref().map_or(0, StreamingFilter::num_taps),
            agc.is_some(),
            config.order
        );
        Ok(Self {
            filter,
            agc,
            order: config.order,
        })
    }

    /// Condition a batch in place.
    pub fn process(&mut self, batch: &mut [f32]) {
        match self.order {
            ChainOrder::FilterThenAgc => {
                self.apply_filter(batch);
                self.apply_agc(batch);
            }
            ChainOrder::AgcThenFilter => {
                self.apply_agc(batch);
                self.apply_filter(batch);
            }
        }
    }

    fn apply_filter(&mut self, batch: &mut [f32]) {
        if let Some(filter) = &mut self.filter {
            filter.apply(batch);
        }
    }

    fn apply_agc(&mut self, batch: &mut [f32]) {
        if let Some(agc) = &mut self.agc {
            agc.process(batch);
        }
    }

    /// The band-limiting filter, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&StreamingFilter> {
        self.filter.as_ref()
    }

    /// The AGC, if any.
    #[must_use]
    pub fn agc(&self) -> Option<&Agc> {
        self.agc.as_ref()
    }

    /// Clear filter history and restore the AGC to its initial state.
    pub fn reset(&mut self) {
        if let Some(filter) = &mut self.filter {
            filter.reset();
        }
        if let Some(agc) = &mut self.agc {
            agc.reset();
        }
    }
}
