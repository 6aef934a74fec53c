//! Integration tests for the power sweep
//!
//! Run with: cargo test -p sinad-meter --test sweep_tests

use std::sync::{Arc, Mutex};

use sinad_meter::{
    run_measurement, ActiveSource, ConditioningConfig, MeterConfig, MeterError, SignalGenerator,
    Source, SourceArgs, SourceError, SourceFactory, SourceInfo, SourceRegistry, SweepConfig,
};

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum Command {
    Output(bool),
    Power(f32),
}

#[derive(Default)]
struct RecordingGenerator {
    commands: Vec<Command>,
    fail_at_power: Option<f32>,
}

impl SignalGenerator for RecordingGenerator {
    fn set_output(&mut self, enabled: bool) -> Result<(), MeterError> {
        self.commands.push(Command::Output(enabled));
        Ok(())
    }

    fn set_power(&mut self, power_dbm: f32) -> Result<(), MeterError> {
        self.commands.push(Command::Power(power_dbm));
        if self.fail_at_power == Some(power_dbm) {
            return Err(MeterError::Generator(format!("{power_dbm} dBm out of range")));
        }
        Ok(())
    }
}

type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Source returning constant batches of a fixed length, whatever was asked.
struct FixedSource {
    log: CallLog,
    len: usize,
}

impl Source for FixedSource {
    fn start(&mut self) -> Result<(), SourceError> {
        self.log.lock().unwrap().push("start");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SourceError> {
        self.log.lock().unwrap().push("stop");
        Ok(())
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.log.lock().unwrap().push("close");
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<f32>, SourceError> {
        self.log.lock().unwrap().push("read");
        Ok(vec![0.1; self.len])
    }

    fn sample_range(&self) -> (f32, f32) {
        (-2.0, 2.0)
    }

    fn sample_unit(&self) -> &str {
        "V"
    }
}

struct FixedFactory {
    log: CallLog,
    len: usize,
}

impl SourceFactory for FixedFactory {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "fixed",
            pretty_name: "Fixed Length Source",
            default_sample_frequency: 8000.0,
            default_record_length: 0.01,
        }
    }

    fn open(&self, _args: &SourceArgs) -> Result<Box<dyn Source>, SourceError> {
        self.log.lock().unwrap().push("open");
        Ok(Box::new(FixedSource {
            log: Arc::clone(&self.log),
            len: self.len,
        }))
    }
}

fn fixed_registry(len: usize) -> (CallLog, SourceRegistry) {
    let log = CallLog::default();
    let mut registry = SourceRegistry::new();
    registry
        .register(FixedFactory {
            log: Arc::clone(&log),
            len,
        })
        .unwrap();
    (log, registry)
}

fn small_tone_config() -> MeterConfig {
    MeterConfig::from_toml_str(
        r#"
        [source]
        name = "tone"
        record_length = 0.01

        [source.settings]
        amplitude = 0.02

        [sweep]
        start_dbm = -120.0
        stop_dbm = -100.0
        steps = 3
        reads_per_step = 8

        [conditioning.agc]
        target_rms = 0.5
        smoothing_factor = 0.5
        "#,
    )
    .unwrap()
}

// ============================================================================
// Sweep sequencing
// ============================================================================

#[test]
fn test_tone_sweep_sequence() {
    let config = small_tone_config();
    let registry = SourceRegistry::with_builtin();
    let mut generator = RecordingGenerator::default();
    let mut batches: Vec<(f32, usize)> = Vec::new();
    let mut sink = |power: f32, batch: &[f32]| -> Result<(), MeterError> {
        batches.push((power, batch.len()));
        Ok(())
    };

    let summaries = run_measurement(&config, &registry, &mut generator, &mut sink).unwrap();

    assert_eq!(
        generator.commands,
        vec![
            Command::Output(false),
            Command::Power(-120.0),
            Command::Output(true),
            Command::Power(-110.0),
            Command::Output(true),
            Command::Power(-100.0),
            Command::Output(true),
            Command::Output(false),
        ]
    );

    assert_eq!(batches.len(), 24);
    assert!(batches.iter().all(|&(_, len)| len == 480));
    assert_eq!(batches.iter().filter(|&&(power, _)| power == -110.0).count(), 8);

    assert_eq!(summaries.len(), 3);
    assert!(summaries.iter().all(|s| s.batches == 8));
}

#[test]
fn test_agc_levels_across_steps() {
    let config = small_tone_config();
    let registry = SourceRegistry::with_builtin();
    let mut generator = RecordingGenerator::default();
    let mut sink = |_: f32, _: &[f32]| -> Result<(), MeterError> { Ok(()) };

    let summaries = run_measurement(&config, &registry, &mut generator, &mut sink).unwrap();

    // 0.5 RMS target is -6.02 dB; the chain keeps its state between steps
    let last = summaries.last().unwrap();
    assert!((last.level_mean_db + 6.02).abs() < 0.1, "level {}", last.level_mean_db);
    assert!(last.level_std_db < 0.1);
    assert!((last.smoothed_level_db + 6.02).abs() < 0.1);
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_short_read_releases_source_and_disables_output() {
    let (log, registry) = fixed_registry(79);
    let mut config = MeterConfig::default();
    config.source.name = "fixed".into();
    config.conditioning = ConditioningConfig::passthrough();
    config.sweep = SweepConfig {
        steps: 2,
        reads_per_step: 4,
        ..SweepConfig::default()
    };
    let mut generator = RecordingGenerator::default();
    let mut sink = |_: f32, _: &[f32]| -> Result<(), MeterError> { Ok(()) };

    let err = run_measurement(&config, &registry, &mut generator, &mut sink).unwrap_err();

    assert!(matches!(
        err,
        MeterError::ShortRead {
            expected: 80,
            actual: 79
        }
    ));
    assert_eq!(*log.lock().unwrap(), vec!["open", "start", "read", "stop", "close"]);
    assert_eq!(generator.commands.last(), Some(&Command::Output(false)));
}

#[test]
fn test_sink_error_stops_sweep() {
    let (log, registry) = fixed_registry(80);
    let mut config = MeterConfig::default();
    config.source.name = "fixed".into();
    config.conditioning = ConditioningConfig::passthrough();
    let mut generator = RecordingGenerator::default();
    let mut accepted = 0;
    let mut sink = |_: f32, batch: &[f32]| -> Result<(), MeterError> {
        assert_eq!(batch, &[0.1; 80][..]);
        accepted += 1;
        if accepted == 3 {
            return Err(MeterError::Sink("analyser disconnected".into()));
        }
        Ok(())
    };

    let err = run_measurement(&config, &registry, &mut generator, &mut sink).unwrap_err();

    assert!(matches!(err, MeterError::Sink(_)));
    assert_eq!(accepted, 3);
    let calls = log.lock().unwrap();
    assert_eq!(calls.iter().filter(|&&c| c == "read").count(), 3);
    assert_eq!(&calls[calls.len() - 2..], &["stop", "close"]);
    assert_eq!(generator.commands.last(), Some(&Command::Output(false)));
}

#[test]
fn test_generator_error_aborts_before_capture() {
    let (log, registry) = fixed_registry(80);
    let mut config = MeterConfig::default();
    config.source.name = "fixed".into();
    config.conditioning = ConditioningConfig::passthrough();
    let mut generator = RecordingGenerator {
        fail_at_power: Some(-125.0),
        ..RecordingGenerator::default()
    };
    let mut sink = |_: f32, _: &[f32]| -> Result<(), MeterError> { Ok(()) };

    let err = run_measurement(&config, &registry, &mut generator, &mut sink).unwrap_err();

    assert!(matches!(err, MeterError::Generator(_)));
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(
        generator.commands,
        vec![Command::Output(false), Command::Power(-125.0), Command::Output(false)]
    );
}

#[test]
fn test_configuration_checked_before_generator() {
    let registry = SourceRegistry::with_builtin();
    let mut config = MeterConfig::default();
    config.conditioning.low_cutoff = Some(5.0);
    let mut generator = RecordingGenerator::default();
    let mut sink = |_: f32, _: &[f32]| -> Result<(), MeterError> { Ok(()) };

    let err = run_measurement(&config, &registry, &mut generator, &mut sink).unwrap_err();

    assert!(matches!(err, MeterError::InvalidConfiguration { .. }));
    assert!(generator.commands.is_empty());
}

// ============================================================================
// Scoped acquisition through the registry
// ============================================================================

#[test]
fn test_active_source_from_registry() {
    let (log, registry) = fixed_registry(80);
    let args = registry.info("fixed").unwrap().default_args();
    {
        let mut active = ActiveSource::acquire(registry.open("fixed", &args).unwrap()).unwrap();
        assert_eq!(active.sample_range().unwrap(), (-2.0, 2.0));
        assert_eq!(active.sample_unit().unwrap(), "V");
        assert_eq!(active.read().unwrap().len(), args.num_samples());
    }
    assert_eq!(*log.lock().unwrap(), vec!["open", "start", "read", "stop", "close"]);
}
