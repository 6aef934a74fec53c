//! Batch helpers shared by the conditioning processors.
//!
//! A batch is a plain `[f32]` slice; its sample rate is known to the caller
//! and never stored alongside the samples.

use alloc::vec::Vec;

use crate::error::DspError;
#[allow(unused_imports)]
use micromath::F32Ext;

/// Level reported by [`to_db`] for amplitudes at or below `1e-10`.
pub const FLOOR_DB: f32 = -200.0;

/// Mean-square power of a batch.
///
/// Returns 0.0 for an empty batch.
#[must_use]
pub fn mean_square(batch: &[f32]) -> f32 {
    mean_square_f64(batch) as f32
}

/// Mean-square power of a batch, accumulated in `f64`.
///
/// Finite for every finite batch, including samples whose square overflows
/// `f32`. Returns 0.0 for an empty batch.
#[must_use]
pub fn mean_square_f64(batch: &[f32]) -> f64 {
    if batch.is_empty() {
        return 0.0;
    }
    let sum: f64 = batch
        .iter()
        .map(|&s| {
            let s = f64::from(s);
            s * s
        })
        .sum();
    sum / batch.len() as f64
}

/// Root-mean-square amplitude of a batch.
#[must_use]
pub fn rms(batch: &[f32]) -> f32 {
    mean_square(batch).sqrt()
}

/// Convert an amplitude ratio to dB.
#[must_use]
pub fn to_db(amplitude: f32) -> f32 {
    if amplitude > 1e-10 {
        20.0 * amplitude.log10()
    } else {
        FLOOR_DB
    }
}

/// Pull one channel out of an interleaved multi-channel frame.
///
/// Capture devices deliver `[l0, r0, l1, r1, ...]`; the conditioning
/// processors expect a flat single-channel batch.
///
/// # Errors
/// [`DspError::FrameShape`] when `channels` is zero or `frame` does not hold a
/// whole number of frames, [`DspError::Channel`] when `channel >= channels`.
pub fn extract_channel(frame: &[f32], channels: usize, channel: usize) -> Result<Vec<f32>, DspError> {
    if channels == 0 || frame.len() % channels != 0 {
        return Err(DspError::FrameShape {
            len: frame.len(),
            channels,
        });
    }
    if channel >= channels {
        return Err(DspError::Channel { channel, channels });
    }
    Ok(frame.iter().skip(channel).step_by(channels).copied().collect())
}
