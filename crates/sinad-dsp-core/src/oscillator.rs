//! Numerically Controlled Oscillator (NCO) for test tones.
//!
//! Drives simulated sources and frequency-response checks with a pure
//! sinusoid at a programmable frequency.

use alloc::vec::Vec;
use core::f32::consts::PI;

#[allow(unused_imports)]
use micromath::F32Ext;

/// Numerically Controlled Oscillator.
///
/// Generates a sine output from a phase accumulator.
#[derive(Clone, Debug)]
pub struct Nco {
    /// Current phase in radians (-π to π)
    phase: f32,
    /// Phase increment per sample (frequency)
    phase_inc: f32,
    /// Sample rate in Hz
    sample_rate: f32,
}

impl Nco {
    /// Create a new NCO.
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `frequency` - Initial frequency in Hz
    #[must_use]
    pub fn new(sample_rate: f32, frequency: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: 2.0 * PI * frequency / sample_rate,
            sample_rate,
        }
    }

    /// Get current frequency in Hz.
    #[must_use]
    pub fn frequency(&self) -> f32 {
        self.phase_inc * self.sample_rate / (2.0 * PI)
    }

    /// Get current phase in radians.
    #[must_use]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Generate next sine sample and advance phase.
    #[inline]
    pub fn next_sin(&mut self) -> f32 {
        let output = self.phase.sin();
        self.advance();
        output
    }

    /// Overwrite `batch` with the next `batch.len()` sine samples scaled by `amplitude`.
    pub fn fill(&mut self, batch: &mut [f32], amplitude: f32) {
        for sample in batch.iter_mut() {
            *sample = amplitude * self.next_sin();
        }
    }

    /// Next `len` sine samples scaled by `amplitude`.
    #[must_use]
    pub fn tone(&mut self, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len).map(|_| amplitude * self.next_sin()).collect()
    }

    /// Advance phase without generating output.
    #[inline]
    pub fn advance(&mut self) {
        self.phase = wrap_phase(self.phase + self.phase_inc);
    }

    /// Reset phase to zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Wrap phase to range [-π, π].
#[inline]
fn wrap_phase(phase: f32) -> f32 {
    let mut p = phase;
    while p > PI {
        p -= 2.0 * PI;
    }
    while p < -PI {
        p += 2.0 * PI;
    }
    p
}
