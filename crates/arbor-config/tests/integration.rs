//! Integration tests for arbor-config.
//!
//! These load configurations from TOML and run the objects they build.

use arbor_config::{AnalysisConfig, ConfigError, ValidationError};
use std::f32::consts::TAU;

const TUNED: &str = r#"
[context]
sample_rate = 44100.0
pool_size = 262144
seed = 99

[envelope]
window_size = 512
hop_size = 128

[snac]
overlap = 2
bias = 0.25
min_rms = 0.002

[period]
frame_size = 128
buffer_size = 2048
hop_size = 128
window_size = 256
time_constant_ms = 80.0
pitch_ratio = 1.8
onset_db = 15.0
min_fidelity = 0.6
confirm_passes = 2
"#;

#[test]
fn tuned_file_loads_and_validates() {
    let config = AnalysisConfig::from_toml_str(TUNED).expect("parse");
    config.validate().expect("valid");

    assert_eq!(config.context.sample_rate, 44100.0);
    assert_eq!(config.context.seed, Some(99));
    assert_eq!(config.envelope.window_size, 512);
    assert_eq!(config.snac.overlap, 2);
    assert_eq!(config.period.buffer_size, 2048);
    assert_eq!(config.period.confirm_passes, 2);
}

#[test]
fn configured_detector_tracks_a_tone() {
    let config = AnalysisConfig::from_toml_str(TUNED).unwrap();
    let ctx = config.build_context();
    let (mut input, mut output) = config.period.buffers();
    assert_eq!(input.len(), 2048);

    let period = 44100.0 / 315.0;
    let mut detector = config
        .build_detector(&ctx, &mut input, &mut output)
        .expect("detector");
    for n in 0..8192 {
        detector.find_period(0.5 * (TAU * n as f32 / period).sin());
    }

    assert!((detector.period() - period).abs() < 0.01 * period);
    assert!((detector.frequency() - 315.0).abs() < 3.15);
    assert!(detector.fidelity() > 0.9);
}

#[test]
fn configured_envelope_reads_rms() {
    let config = AnalysisConfig::from_toml_str(TUNED).unwrap();
    let ctx = config.build_context();
    let mut env = config.envelope.build(&ctx, 64).expect("envelope");

    let signal: Vec<f32> = (0..4096).map(|n| if n % 64 < 32 { 0.25 } else { -0.25 }).collect();
    for block in signal.chunks(64) {
        env.process_block(block);
    }
    assert!((env.tick() - 0.25).abs() < 1e-4);
}

#[test]
fn detector_memory_comes_from_the_configured_pool() {
    let config = AnalysisConfig::from_toml_str(TUNED).unwrap();
    let ctx = config.build_context();
    let (mut input, mut output) = config.period.buffers();
    {
        let _detector = config.build_detector(&ctx, &mut input, &mut output).unwrap();
        assert!(ctx.pool().used() > 0);
    }
    assert_eq!(ctx.pool().used(), 0);
}

#[test]
fn undersized_pool_is_reported_not_panicked() {
    let mut config = AnalysisConfig::from_toml_str(TUNED).unwrap();
    config.context.pool_size = 4096;
    config.validate().expect("pool size is not range-checked beyond zero");

    let ctx = config.build_context();
    let (mut input, mut output) = config.period.buffers();
    let err = config
        .build_detector(&ctx, &mut input, &mut output)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Pool(_)));
    assert_eq!(ctx.pool().used(), 0);
}

#[test]
fn invalid_file_is_rejected_before_building() {
    let text = TUNED
        .replace("overlap = 2", "overlap = 6")
        .replace("pitch_ratio = 1.8", "pitch_ratio = 0.5");
    let config = AnalysisConfig::from_toml_str(&text).unwrap();
    let ctx = config.build_context();
    let (mut input, mut output) = config.period.buffers();

    match config.build_detector(&ctx, &mut input, &mut output) {
        Err(ConfigError::Validation(ValidationError::Multiple(errors))) => {
            assert_eq!(errors.len(), 2);
        }
        other => panic!("expected two validation errors, got {other:?}"),
    }
    assert_eq!(ctx.pool().peak(), 0);
}

#[test]
fn reapplying_a_config_retunes_a_live_detector() {
    let mut config = AnalysisConfig::default();
    let ctx = config.build_context();
    let (mut input, mut output) = config.period.buffers();
    let mut detector = config.build_detector(&ctx, &mut input, &mut output).unwrap();

    config.period.window_size = 1024;
    config.period.hop_size = 256;
    config.snac.overlap = 4;
    config.apply_to(&mut detector);

    assert_eq!(detector.window_size(), 1024);
    assert_eq!(detector.hop_size(), 256);
    assert_eq!(detector.snac_mut().overlap(), 4);
}

#[test]
fn saved_config_reloads_identically() {
    let config = AnalysisConfig::from_toml_str(TUNED).unwrap();
    let text = config.to_toml_string().unwrap();
    let reloaded = AnalysisConfig::from_toml_str(&text).unwrap();
    assert_eq!(reloaded, config);
}
