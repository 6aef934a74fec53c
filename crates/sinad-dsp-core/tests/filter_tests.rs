//! Streaming FIR Tests
//!
//! Batch continuity and frequency response of designed filters
//! Run with: cargo test -p sinad-dsp-core --test filter_tests

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sinad_dsp_core::{
    make_bandpass_filter, make_highpass_filter, make_lowpass_filter, rms, to_db, ErrorKind, FirDesign,
    Nco, StreamingFilter, DEFAULT_NUM_TAPS,
};

const FS: f32 = 48000.0;

fn random_signal(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

fn lowpass_200() -> StreamingFilter {
    make_lowpass_filter(FS, 200.0, DEFAULT_NUM_TAPS).unwrap()
}

fn filter_in_batches(mut filter: StreamingFilter, signal: &[f32], sizes: &[usize]) -> Vec<f32> {
    let mut output = Vec::with_capacity(signal.len());
    let mut start = 0;
    for &size in sizes {
        output.extend(filter.apply_to_vec(&signal[start..start + size]));
        start += size;
    }
    assert_eq!(start, signal.len());
    output
}

/// Level of a tone after the filter has settled, in dB re. its input.
fn settled_gain_db(filter: &mut StreamingFilter, frequency: f32, amplitude: f32) -> f32 {
    let mut nco = Nco::new(FS, frequency);
    let signal = nco.tone(48_000, amplitude);
    let output: Vec<f32> = signal
        .chunks(1024)
        .flat_map(|batch| filter.apply_to_vec(batch))
        .collect();
    let settle = 4800;
    to_db(rms(&output[settle..]) / rms(&signal[settle..]))
}

// =============================================================================
// Continuity Tests
// =============================================================================

#[test]
fn test_batches_match_single_call() {
    let signal = random_signal(1000, 42);
    let whole = lowpass_200().apply_to_vec(&signal);

    let sevens: Vec<usize> = signal.chunks(7).map(<[f32]>::len).collect();
    for sizes in [vec![1, 1, 998], vec![500, 500], sevens] {
        let chunked = filter_in_batches(lowpass_200(), &signal, &sizes);
        assert_eq!(chunked.len(), whole.len());
        for (n, (a, b)) in chunked.iter().zip(&whole).enumerate() {
            assert!((a - b).abs() <= 1e-6, "sizes {:?} differ at {}: {} vs {}", sizes, n, a, b);
        }
    }
}

#[test]
fn test_empty_batches_leave_carry_untouched() {
    let signal = random_signal(300, 5);
    let mut filter = lowpass_200();
    let _ = filter.apply_to_vec(&signal[..150]);

    let before: Vec<u32> = filter.carry().iter().map(|z| z.to_bits()).collect();
    let mut empty: Vec<f32> = Vec::new();
    filter.apply(&mut empty);
    assert!(filter.apply_to_vec(&[]).is_empty());
    let after: Vec<u32> = filter.carry().iter().map(|z| z.to_bits()).collect();
    assert_eq!(before, after);
    assert_eq!(filter.carry().len(), DEFAULT_NUM_TAPS - 1);

    let whole = lowpass_200().apply_to_vec(&signal);
    assert_eq!(filter.apply_to_vec(&signal[150..]), whole[150..].to_vec());
}

#[test]
fn test_highpass_and_bandpass_continuity() {
    let signal = random_signal(777, 9);
    let designs = [
        FirDesign::highpass(FS, 4000.0),
        FirDesign::bandpass(FS, 200.0, 4000.0),
    ];
    for design in designs {
        let whole = design.build().unwrap().apply_to_vec(&signal);
        let chunked = filter_in_batches(design.build().unwrap(), &signal, &[100, 0, 333, 1, 343]);
        assert_eq!(chunked, whole);
    }
}

proptest! {
    #[test]
    fn prop_any_partition_matches_whole(
        signal in prop::collection::vec(-1.0f32..1.0, 0..400),
        cuts in prop::collection::vec(0usize..400, 0..12),
    ) {
        let design = FirDesign::lowpass(FS, 3000.0).num_taps(31);
        let whole = design.build().unwrap().apply_to_vec(&signal);

        let mut cuts: Vec<usize> = cuts.into_iter().map(|cut| cut.min(signal.len())).collect();
        cuts.sort_unstable();
        let mut sizes = Vec::new();
        let mut previous = 0;
        for cut in cuts {
            sizes.push(cut - previous);
            previous = cut;
        }
        sizes.push(signal.len() - previous);

        let chunked = filter_in_batches(design.build().unwrap(), &signal, &sizes);
        prop_assert_eq!(chunked, whole);
    }
}

// =============================================================================
// Frequency Response Tests
// =============================================================================

#[test]
fn test_lowpass_rejects_1khz_relative_to_50hz() {
    let pass = settled_gain_db(&mut lowpass_200(), 50.0, 0.5);
    let stop = settled_gain_db(&mut lowpass_200(), 1000.0, 0.5);
    assert!(pass.abs() < 1.0, "50 Hz gain {} dB", pass);
    assert!(pass - stop >= 15.0, "pass {} dB, stop {} dB", pass, stop);
}

#[test]
fn test_highpass_rejects_low_tone() {
    let mut filter = make_highpass_filter(FS, 4000.0, DEFAULT_NUM_TAPS).unwrap();
    assert!(settled_gain_db(&mut filter, 1000.0, 0.5) < -30.0);
    filter.reset();
    assert!(settled_gain_db(&mut filter, 10000.0, 0.5).abs() < 1.0);
}

#[test]
fn test_bandpass_passes_centre() {
    let mut filter = make_bandpass_filter(FS, 200.0, 4000.0, DEFAULT_NUM_TAPS).unwrap();
    assert!(settled_gain_db(&mut filter, 1000.0, 0.5).abs() < 1.0);
    filter.reset();
    assert!(settled_gain_db(&mut filter, 12000.0, 0.5) < -30.0);
}

// =============================================================================
// Design Validation Tests
// =============================================================================

#[test]
fn test_design_rejects_even_taps() {
    let err = make_lowpass_filter(FS, 200.0, 100).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_design_rejects_unordered_band() {
    for (low, high) in [(4000.0, 200.0), (1000.0, 1000.0)] {
        let err = make_bandpass_filter(FS, low, high, DEFAULT_NUM_TAPS).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_group_delay() {
    assert_eq!(lowpass_200().group_delay(), 50);
}
