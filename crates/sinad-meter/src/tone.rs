//! Simulated tone source.
//!
//! Produces a sine tone with optional Gaussian noise, standing in for a
//! sound card when running without hardware. The simulated card can have
//! several interleaved inputs. The tone is wired to channel 0 and every
//! input picks up noise.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use sinad_dsp_core::{extract_channel, Nco};

use crate::registry::{SourceFactory, SourceInfo};
use crate::source::{Source, SourceArgs, SourceError};

/// Default test tone frequency in Hz.
pub const DEFAULT_TONE_HZ: f32 = 1000.0;

/// Default test tone peak amplitude.
pub const DEFAULT_AMPLITUDE: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Stopped,
    Running,
    Closed,
}

/// Sine tone plus white Gaussian noise.
pub struct ToneSource {
    nco: Nco,
    amplitude: f32,
    noise: Option<Normal<f32>>,
    rng: StdRng,
    num_samples: usize,
    channels: usize,
    channel: usize,
    state: State,
}

impl ToneSource {
    /// Create a stopped tone source.
    ///
    /// # Arguments
    /// * `sample_frequency` - Sample rate in Hz
    /// * `num_samples` - Samples per read
    /// * `frequency` - Tone frequency in Hz, below Nyquist
    /// * `amplitude` - Peak amplitude of the tone
    /// * `noise_rms` - Standard deviation of the added noise (0 disables it)
    /// * `seed` - Noise generator seed
    ///
    /// # Errors
    /// [`SourceError::Open`] for a tone at or above Nyquist or a negative
    /// noise level.
    pub fn new(
        sample_frequency: f32,
        num_samples: usize,
        frequency: f32,
        amplitude: f32,
        noise_rms: f32,
        seed: u64,
    ) -> Result<Self, SourceError> {
        if !(sample_frequency > 0.0) {
            return Err(SourceError::Open(format!(
                "sample frequency must be positive, got {sample_frequency} Hz"
            )));
        }
        if !(0.0..sample_frequency / 2.0).contains(&frequency) {
            return Err(SourceError::Open(format!(
                "tone {frequency} Hz must be below Nyquist ({} Hz)",
                sample_frequency / 2.0
            )));
        }
        if !(noise_rms >= 0.0) {
            return Err(SourceError::Open(format!(
                "noise_rms must be non-negative, got {noise_rms}"
            )));
        }
        let noise = if noise_rms == 0.0 {
            None
        } else {
            Some(
                Normal::new(0.0, noise_rms)
                    .map_err(|e| SourceError::Open(format!("noise_rms {noise_rms}: {e}")))?,
            )
        };

        Ok(Self {
            nco: Nco::new(sample_frequency, frequency),
            amplitude,
            noise,
            rng: StdRng::seed_from_u64(seed),
            num_samples,
            channels: 1,
            channel: 0,
            state: State::Stopped,
        })
    }

    /// Simulate a card with `channels` interleaved inputs and measure
    /// `channel`.
    ///
    /// # Errors
    /// [`SourceError::Setting`] when `channels` is zero or `channel` is not
    /// below it.
    pub fn with_channels(mut self, channels: usize, channel: usize) -> Result<Self, SourceError> {
        extract_channel(&[], channels, channel).map_err(|e| SourceError::Setting {
            key: "channel".to_string(),
            message: e.to_string(),
        })?;
        self.channels = channels;
        self.channel = channel;
        Ok(self)
    }

    /// One interleaved frame block as the simulated card delivers it.
    fn capture_frames(&mut self) -> Vec<f32> {
        let tone = self.nco.tone(self.num_samples, self.amplitude);
        let mut frames = vec![0.0; self.num_samples * self.channels];
        for (frame, sample) in frames.chunks_exact_mut(self.channels).zip(tone) {
            frame[0] = sample;
        }
        if let Some(noise) = &self.noise {
            for sample in &mut frames {
                *sample += noise.sample(&mut self.rng);
            }
        }
        frames
    }

    /// Create a tone source from capture arguments.
    ///
    /// Reads `frequency`, `amplitude`, `noise_rms`, `seed`, `channels` and
    /// `channel` from `args.settings`, falling back to a clean 1 kHz tone at
    /// half scale on a single-channel card.
    ///
    /// # Errors
    /// [`SourceError::Setting`] for a setting of the wrong type, otherwise as
    /// [`ToneSource::new`].
    pub fn from_args(args: &SourceArgs) -> Result<Self, SourceError> {
        let settings = &args.settings;
        Self::new(
            args.sample_frequency,
            args.num_samples(),
            float_setting(settings, "frequency", DEFAULT_TONE_HZ)?,
            float_setting(settings, "amplitude", DEFAULT_AMPLITUDE)?,
            float_setting(settings, "noise_rms", 0.0)?,
            uint_setting(settings, "seed", 0)?,
        )?
        .with_channels(
            uint_setting(settings, "channels", 1)? as usize,
            uint_setting(settings, "channel", 0)? as usize,
        )
    }
}

fn float_setting(settings: &toml::Table, key: &str, default: f32) -> Result<f32, SourceError> {
    match settings.get(key) {
        None => Ok(default),
        Some(toml::Value::Float(value)) => Ok(*value as f32),
        Some(toml::Value::Integer(value)) => Ok(*value as f32),
        Some(other) => Err(SourceError::Setting {
            key: key.to_string(),
            message: format!("expected a number, got {}", other.type_str()),
        }),
    }
}

fn uint_setting(settings: &toml::Table, key: &str, default: u64) -> Result<u64, SourceError> {
    match settings.get(key) {
        None => Ok(default),
        Some(toml::Value::Integer(value)) if *value >= 0 => Ok(*value as u64),
        Some(other) => Err(SourceError::Setting {
            key: key.to_string(),
            message: format!("expected a non-negative integer, got {other}"),
        }),
    }
}

impl Source for ToneSource {
    fn start(&mut self) -> Result<(), SourceError> {
        if self.state == State::Closed {
            return Err(SourceError::Closed);
        }
        self.state = State::Running;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SourceError> {
        if self.state == State::Running {
            self.state = State::Stopped;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.state = State::Closed;
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<f32>, SourceError> {
        match self.state {
            State::Closed => return Err(SourceError::Closed),
            State::Stopped => return Err(SourceError::NotStarted),
            State::Running => {}
        }
        let frames = self.capture_frames();
        extract_channel(&frames, self.channels, self.channel)
            .map_err(|e| SourceError::Device(e.to_string()))
    }

    fn sample_range(&self) -> (f32, f32) {
        (-1.0, 1.0)
    }

    fn sample_unit(&self) -> &str {
        "AU"
    }
}

/// Factory registered as `"tone"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ToneSourceFactory;

impl SourceFactory for ToneSourceFactory {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "tone",
            pretty_name: "Simulated Tone Source",
            default_sample_frequency: 48_000.0,
            default_record_length: 250e-3,
        }
    }

    fn open(&self, args: &SourceArgs) -> Result<Box<dyn Source>, SourceError> {
        Ok(Box::new(ToneSource::from_args(args)?))
    }
}
