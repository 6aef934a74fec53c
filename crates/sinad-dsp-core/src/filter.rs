//! Stateful filters for batch processing.
//!
//! Provides a streaming FIR filter that carries its convolution state
//! across batches, and a fixed-window moving average.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::DspError;
#[allow(unused_imports)]
use micromath::F32Ext;

/// FIR filter applied to successive batches.
///
/// Realized in transposed direct form: `carry` holds the `N - 1` partial
/// sums still owed to future outputs, the same state a standard `lfilter`
/// exposes through its `zi`/`zf` arguments. Because every output sample is
/// computed identically no matter where batch boundaries fall, filtering a
/// signal in pieces gives exactly the output of filtering it in one call.
///
/// ```
/// use sinad_dsp_core::StreamingFilter;
///
/// let mut fir = StreamingFilter::new(vec![0.5, 0.5]).unwrap();
/// assert_eq!(fir.apply_to_vec(&[1.0, 1.0]), vec![0.5, 1.0]);
/// assert_eq!(fir.apply_to_vec(&[0.0]), vec![0.5]);
/// ```
#[derive(Clone, Debug)]
pub struct StreamingFilter {
    taps: Vec<f32>,
    /// Invariant: `carry.len() == taps.len() - 1`
    carry: Vec<f32>,
}

impl StreamingFilter {
    /// Create a filter from its coefficients with zeroed state.
    ///
    /// # Errors
    /// [`DspError::EmptyTaps`] if `taps` is empty.
    pub fn new(taps: Vec<f32>) -> Result<Self, DspError> {
        if taps.is_empty() {
            return Err(DspError::EmptyTaps);
        }
        let carry = vec![0.0; taps.len() - 1];
        Ok(Self { taps, carry })
    }

    /// Process a single sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.taps[0] * input + self.carry.first().copied().unwrap_or(0.0);

        let last = self.carry.len();
        for k in 0..last {
            let next = if k + 1 < last { self.carry[k + 1] } else { 0.0 };
            self.carry[k] = self.taps[k + 1] * input + next;
        }

        output
    }

    /// Filter a batch in place, continuing from the previous batch.
    ///
    /// An empty batch leaves the carried state untouched.
    pub fn apply(&mut self, batch: &mut [f32]) {
        for sample in batch.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Filter a copy of `batch`, continuing from the previous batch.
    #[must_use]
    pub fn apply_to_vec(&mut self, batch: &[f32]) -> Vec<f32> {
        let mut output = batch.to_vec();
        self.apply(&mut output);
        output
    }

    /// Filter coefficients.
    #[must_use]
    pub fn taps(&self) -> &[f32] {
        &self.taps
    }

    /// State carried into the next batch.
    #[must_use]
    pub fn carry(&self) -> &[f32] {
        &self.carry
    }

    /// Number of taps.
    #[must_use]
    pub fn num_taps(&self) -> usize {
        self.taps.len()
    }

    /// Group delay in samples of a linear-phase tap set.
    #[must_use]
    pub fn group_delay(&self) -> usize {
        (self.taps.len() - 1) / 2
    }

    /// Magnitude response at `freq` Hz for sample rate `fs`.
    #[must_use]
    pub fn magnitude_at(&self, freq: f32, fs: f32) -> f32 {
        let omega = 2.0 * core::f32::consts::PI * freq / fs;
        let (re, im) = self
            .taps
            .iter()
            .enumerate()
            .fold((0.0f32, 0.0f32), |(re, im), (n, &h)| {
                let phase = omega * n as f32;
                (re + h * phase.cos(), im - h * phase.sin())
            });
        (re * re + im * im).sqrt()
    }

    /// Reset filter state to zero.
    pub fn reset(&mut self) {
        self.carry.iter_mut().for_each(|z| *z = 0.0);
    }
}

/// Running mean over the last `N` values.
///
/// Used to smooth slowly varying readings, e.g. per-batch levels within a
/// sweep step. Reports 0.0 until the first value arrives.
#[derive(Clone, Debug, Default)]
pub struct MovingAverage<const N: usize> {
    window: heapless::Deque<f32, N>,
}

impl<const N: usize> MovingAverage<N> {
    /// Create an empty moving average.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            window: heapless::Deque::new(),
        }
    }

    /// Push a value, evicting the oldest once the window is full.
    pub fn update(&mut self, value: f32) {
        if self.window.is_full() {
            self.window.pop_front();
        }
        // Cannot fail: a slot was freed above when full.
        let _ = self.window.push_back(value);
    }

    /// Mean of the values in the window.
    #[must_use]
    pub fn value(&self) -> f32 {
        if self.window.is_empty() {
            0.0
        } else {
            self.window.iter().sum::<f32>() / self.window.len() as f32
        }
    }

    /// Number of values currently in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether no value has been pushed since creation or reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Drop all values.
    pub fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_unity_filter() {
        let mut filter = StreamingFilter::new(vec![1.0]).unwrap();
        assert!(filter.carry().is_empty());
        assert_eq!(filter.apply_to_vec(&[1.0, 0.5, -0.25]), vec![1.0, 0.5, -0.25]);
    }

    #[test]
    fn test_rejects_empty_taps() {
        assert_eq!(StreamingFilter::new(Vec::new()).unwrap_err(), DspError::EmptyTaps);
    }

    #[test]
    fn test_impulse_response_spans_batches() {
        let taps = vec![0.1, 0.2, 0.3, 0.4];
        let mut filter = StreamingFilter::new(taps.clone()).unwrap();

        let mut response = filter.apply_to_vec(&[1.0, 0.0]);
        response.extend(filter.apply_to_vec(&[0.0]));
        response.extend(filter.apply_to_vec(&[0.0, 0.0]));

        assert_eq!(&response[..4], taps.as_slice());
        assert_eq!(response[4], 0.0);
    }

    #[test]
    fn test_carry_length_is_stable() {
        let mut filter = StreamingFilter::new(vec![0.25; 5]).unwrap();
        for len in [0usize, 1, 3, 17, 0] {
            let mut batch = vec![1.0; len];
            filter.apply(&mut batch);
            assert_eq!(filter.carry().len(), 4);
        }
    }

    #[test]
    fn test_reset() {
        let mut filter = StreamingFilter::new(vec![0.5, 0.5]).unwrap();
        filter.apply(&mut [1.0, 1.0]);
        assert_eq!(filter.carry(), &[0.5]);
        filter.reset();
        assert_eq!(filter.carry(), &[0.0]);
    }

    #[test]
    fn test_magnitude_of_moving_sum() {
        let filter = StreamingFilter::new(vec![0.5, 0.5]).unwrap();
        assert!((filter.magnitude_at(0.0, 48000.0) - 1.0).abs() < 1e-6);
        assert!(filter.magnitude_at(24000.0, 48000.0) < 1e-3);
    }

    #[test]
    fn test_moving_average_window() {
        let mut avg = MovingAverage::<3>::new();
        assert_eq!(avg.value(), 0.0);
        assert!(avg.is_empty());

        avg.update(3.0);
        assert_eq!(avg.value(), 3.0);
        avg.update(6.0);
        avg.update(9.0);
        assert_eq!(avg.value(), 6.0);

        avg.update(12.0);
        assert_eq!(avg.len(), 3);
        assert_eq!(avg.value(), 9.0);

        avg.reset();
        assert!(avg.is_empty());
    }
}
