//! Error types for the conditioning core.

use thiserror::Error;

/// Broad category of a [`DspError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A constructor or design parameter was out of range.
    InvalidArgument,
    /// A batch handed to a processing call had the wrong shape.
    InvalidInput,
}

/// Conditioning core error.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum DspError {
    /// Target RMS must be strictly positive.
    #[error("target_rms must be positive, got {0}")]
    TargetRms(f32),
    /// Smoothing factor must lie in `[0, 1]`.
    #[error("smoothing_factor must be between 0 and 1, got {0}")]
    SmoothingFactor(f32),
    /// Initial gain must be strictly positive.
    #[error("initial_gain must be positive, got {0}")]
    InitialGain(f32),
    /// A FIR filter needs at least one tap.
    #[error("filter needs at least one tap")]
    EmptyTaps,
    /// Linear-phase designs need an odd number of taps.
    #[error("number of taps must be odd, got {0}")]
    EvenTapCount(usize),
    /// Sample frequency must be strictly positive.
    #[error("sample frequency must be positive, got {0} Hz")]
    SampleFrequency(f32),
    /// Cutoff outside the open interval `(0, nyquist)`.
    #[error("cutoff {cutoff} Hz must lie strictly between 0 and {nyquist} Hz")]
    CutoffOutOfRange {
        /// Offending cutoff in Hz
        cutoff: f32,
        /// Nyquist frequency in Hz
        nyquist: f32,
    },
    /// Band edges must be strictly increasing.
    #[error("low cutoff {low} Hz must be below high cutoff {high} Hz")]
    CutoffOrder {
        /// Lower band edge in Hz
        low: f32,
        /// Upper band edge in Hz
        high: f32,
    },
    /// Interleaved frame length is not a multiple of the channel count.
    #[error("frame of {len} samples does not hold whole frames of {channels} channels")]
    FrameShape {
        /// Frame length in samples
        len: usize,
        /// Channel count
        channels: usize,
    },
    /// Requested channel does not exist in the frame.
    #[error("channel {channel} out of range for {channels} channels")]
    Channel {
        /// Requested channel
        channel: usize,
        /// Channel count
        channels: usize,
    },
}

impl DspError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            DspError::FrameShape { .. } | DspError::Channel { .. } => ErrorKind::InvalidInput,
            _ => ErrorKind::InvalidArgument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(DspError::EvenTapCount(100).kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            DspError::CutoffOrder { low: 4000.0, high: 200.0 }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            DspError::FrameShape { len: 5, channels: 2 }.kind(),
            ErrorKind::InvalidInput
        );
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_error_display() {
        let msg = std::format!("{}", DspError::EvenTapCount(100));
        assert_eq!(msg, "number of taps must be odd, got 100");
    }
}
