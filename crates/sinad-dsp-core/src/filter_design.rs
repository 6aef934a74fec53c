//! FIR Filter Design Module
//!
//! Computes linear-phase FIR coefficients with the windowed-sinc method and
//! hands them out pre-loaded in a [`StreamingFilter`]. Design runs once per
//! measurement run, never per batch.
//!
//! # Supported Filter Types
//!
//! - Low-pass: passes DC up to the cutoff
//! - High-pass: passes the cutoff up to Nyquist (odd tap counts only)
//! - Band-pass: passes the band between two cutoffs
//!
//! Passbands are scaled to unit gain at DC, at Nyquist, or at the band
//! centre respectively.

use alloc::vec::Vec;
use core::f32::consts::PI;

use crate::error::DspError;
use crate::filter::StreamingFilter;
#[allow(unused_imports)]
use micromath::F32Ext;

/// Tap count used when the caller has no preference.
pub const DEFAULT_NUM_TAPS: usize = 101;

/// Window applied to the ideal sinc response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Window {
    /// No tapering (narrowest transition band, worst sidelobes)
    Rectangular,
    /// Hann (raised cosine)
    Hann,
    /// Hamming, about 53 dB stopband
    #[default]
    Hamming,
    /// Blackman, about 74 dB stopband at the cost of a wider transition
    Blackman,
}

impl Window {
    /// Window value at index `n` of `len`.
    #[must_use]
    pub fn value(self, n: usize, len: usize) -> f32 {
        if len <= 1 {
            return 1.0;
        }
        let x = 2.0 * PI * n as f32 / (len - 1) as f32;
        match self {
            Window::Rectangular => 1.0,
            Window::Hann => 0.5 - 0.5 * x.cos(),
            Window::Hamming => 0.54 - 0.46 * x.cos(),
            Window::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
        }
    }
}

/// Band shape with cutoffs in Hz.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Band {
    Lowpass(f32),
    Highpass(f32),
    Bandpass(f32, f32),
}

/// Windowed-sinc FIR design.
///
/// ```
/// use sinad_dsp_core::{FirDesign, Window};
///
/// let taps = FirDesign::lowpass(48000.0, 3000.0)
///     .num_taps(63)
///     .window(Window::Blackman)
///     .design()
///     .unwrap();
/// assert_eq!(taps.len(), 63);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FirDesign {
    sample_frequency: f32,
    band: Band,
    num_taps: usize,
    window: Window,
}

impl FirDesign {
    fn with_band(sample_frequency: f32, band: Band) -> Self {
        Self {
            sample_frequency,
            band,
            num_taps: DEFAULT_NUM_TAPS,
            window: Window::default(),
        }
    }

    /// Low-pass design with cutoff in Hz.
    #[must_use]
    pub fn lowpass(sample_frequency: f32, cutoff: f32) -> Self {
        Self::with_band(sample_frequency, Band::Lowpass(cutoff))
    }

    /// High-pass design with cutoff in Hz.
    #[must_use]
    pub fn highpass(sample_frequency: f32, cutoff: f32) -> Self {
        Self::with_band(sample_frequency, Band::Highpass(cutoff))
    }

    /// Band-pass design between `low_cutoff` and `high_cutoff` Hz.
    #[must_use]
    pub fn bandpass(sample_frequency: f32, low_cutoff: f32, high_cutoff: f32) -> Self {
        Self::with_band(sample_frequency, Band::Bandpass(low_cutoff, high_cutoff))
    }

    /// Set the tap count (must be odd).
    #[must_use]
    pub const fn num_taps(mut self, num_taps: usize) -> Self {
        self.num_taps = num_taps;
        self
    }

    /// Set the window.
    #[must_use]
    pub const fn window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Validated band edges normalized to Nyquist, as `(left, right)` in `[0, 1]`.
    fn normalized_band(&self) -> Result<(f32, f32), DspError> {
        if self.num_taps % 2 == 0 {
            return Err(DspError::EvenTapCount(self.num_taps));
        }
        if !(self.sample_frequency > 0.0) || !self.sample_frequency.is_finite() {
            return Err(DspError::SampleFrequency(self.sample_frequency));
        }
        let nyquist = self.sample_frequency / 2.0;
        let check = |cutoff: f32| {
            if cutoff > 0.0 && cutoff < nyquist {
                Ok(cutoff / nyquist)
            } else {
                Err(DspError::CutoffOutOfRange { cutoff, nyquist })
            }
        };

        match self.band {
            Band::Lowpass(cutoff) => Ok((0.0, check(cutoff)?)),
            Band::Highpass(cutoff) => Ok((check(cutoff)?, 1.0)),
            Band::Bandpass(low, high) => {
                let left = check(low)?;
                let right = check(high)?;
                if low >= high {
                    return Err(DspError::CutoffOrder { low, high });
                }
                Ok((left, right))
            }
        }
    }

    /// Compute the filter coefficients.
    ///
    /// # Errors
    /// Even tap count, non-positive sample frequency, a cutoff outside
    /// `(0, fs / 2)` or band-pass edges that are not increasing.
    pub fn design(&self) -> Result<Vec<f32>, DspError> {
        let (left, right) = self.normalized_band()?;
        let len = self.num_taps;
        let centre = (len - 1) as f32 / 2.0;

        let mut taps: Vec<f32> = (0..len)
            .map(|n| {
                let m = n as f32 - centre;
                let ideal = right * sinc(right * m) - left * sinc(left * m);
                ideal * self.window.value(n, len)
            })
            .collect();

        // Unit gain at the reference frequency of the passband.
        let reference = if left == 0.0 {
            0.0
        } else if right == 1.0 {
            1.0
        } else {
            0.5 * (left + right)
        };
        let gain: f32 = taps
            .iter()
            .enumerate()
            .map(|(n, h)| h * (PI * (n as f32 - centre) * reference).cos())
            .sum();
        for h in &mut taps {
            *h /= gain;
        }

        log::debug!(
            "fir design: {:?} fs={} taps={} window={:?}",
            self.band,
            self.sample_frequency,
            len,
            self.window
        );
        Ok(taps)
    }

    /// Compute the coefficients and wrap them in a fresh [`StreamingFilter`].
    ///
    /// # Errors
    /// See [`FirDesign::design`].
    pub fn build(&self) -> Result<StreamingFilter, DspError> {
        StreamingFilter::new(self.design()?)
    }
}

/// Normalized sinc, `sin(pi x) / (pi x)`.
#[inline]
fn sinc(x: f32) -> f32 {
    if x == 0.0 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

/// Low-pass coefficients.
///
/// Use [`FirDesign`] to get the default of [`DEFAULT_NUM_TAPS`] taps or a
/// different window.
///
/// # Errors
/// Even `num_taps`, `sample_frequency <= 0`, or `cutoff` outside `(0, fs / 2)`.
pub fn design_lowpass(
    sample_frequency: f32,
    cutoff: f32,
    num_taps: usize,
) -> Result<Vec<f32>, DspError> {
    FirDesign::lowpass(sample_frequency, cutoff).num_taps(num_taps).design()
}

/// High-pass coefficients.
///
/// # Errors
/// Even `num_taps`, `sample_frequency <= 0`, or `cutoff` outside `(0, fs / 2)`.
pub fn design_highpass(
    sample_frequency: f32,
    cutoff: f32,
    num_taps: usize,
) -> Result<Vec<f32>, DspError> {
    FirDesign::highpass(sample_frequency, cutoff).num_taps(num_taps).design()
}

/// Band-pass coefficients.
///
/// # Errors
/// Even `num_taps`, `sample_frequency <= 0`, a cutoff outside `(0, fs / 2)`,
/// or `low_cutoff >= high_cutoff`.
pub fn design_bandpass(
    sample_frequency: f32,
    low_cutoff: f32,
    high_cutoff: f32,
    num_taps: usize,
) -> Result<Vec<f32>, DspError> {
    FirDesign::bandpass(sample_frequency, low_cutoff, high_cutoff)
        .num_taps(num_taps)
        .design()
}

/// Linear-phase low-pass filter.
///
/// Pass [`DEFAULT_NUM_TAPS`] when the caller has no tap count of its own;
/// `FirDesign::lowpass(fs, cutoff).build()` does the same.
///
/// # Errors
/// Even `num_taps`, `sample_frequency <= 0`, or `cutoff` outside `(0, fs / 2)`.
pub fn make_lowpass_filter(
    sample_frequency: f32,
    cutoff: f32,
    num_taps: usize,
) -> Result<StreamingFilter, DspError> {
    StreamingFilter::new(design_lowpass(sample_frequency, cutoff, num_taps)?)
}

/// Linear-phase high-pass filter.
///
/// Pass [`DEFAULT_NUM_TAPS`] for the default length, or use
/// [`FirDesign::highpass`].
///
/// # Errors
/// Even `num_taps`, `sample_frequency <= 0`, or `cutoff` outside `(0, fs / 2)`.
pub fn make_highpass_filter(
    sample_frequency: f32,
    cutoff: f32,
    num_taps: usize,
) -> Result<StreamingFilter, DspError> {
    StreamingFilter::new(design_highpass(sample_frequency, cutoff, num_taps)?)
}

/// Linear-phase band-pass filter.
///
/// Pass [`DEFAULT_NUM_TAPS`] for the default length, or use
/// [`FirDesign::bandpass`].
///
/// # Errors
/// Even `num_taps`, `sample_frequency <= 0`, a cutoff outside `(0, fs / 2)`,
/// or `low_cutoff >= high_cutoff`.
pub fn make_bandpass_filter(
    sample_frequency: f32,
    low_cutoff: f32,
    high_cutoff: f32,
    num_taps: usize,
) -> Result<StreamingFilter, DspError> {
    StreamingFilter::new(design_bandpass(sample_frequency, low_cutoff, high_cutoff, num_taps)?)
}
