//! Criterion benchmarks for arbor-analysis detectors
//!
//! Run with: cargo bench -p arbor-analysis
#![allow(missing_docs)]

use arbor_analysis::{AttackDetection, EnvPd, EnvelopeFollower, PeriodDetection, PowerFollower, Snac};
use arbor_core::Context;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::f32::consts::TAU;

const SAMPLE_RATE: f32 = 48000.0;

/// A few harmonics of 220 Hz, the kind of material the period tracker sees.
fn generate_voice(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE;
            let f1 = (TAU * 220.0 * t).sin();
            let f2 = 0.5 * (TAU * 440.0 * t).sin();
            let f3 = 0.25 * (TAU * 660.0 * t).sin();
            (f1 + f2 + f3) * 0.4
        })
        .collect()
}

// ============================================================================
// Envelope
// ============================================================================

fn bench_env_pd(c: &mut Criterion) {
    let ctx = Context::new(SAMPLE_RATE);
    let signal = generate_voice(1 << 14);
    let mut group = c.benchmark_group("EnvPd");

    for &(window, hop) in &[(256usize, 128usize), (1024, 256), (1024, 64)] {
        let mut env = EnvPd::new(&ctx, window, hop, 64).unwrap();
        group.bench_with_input(
            BenchmarkId::new("window_hop", format!("{window}/{hop}")),
            &signal,
            |b, signal| {
                b.iter(|| {
                    for block in signal.chunks(64) {
                        env.process_block(black_box(block));
                    }
                    black_box(env.tick())
                })
            },
        );
    }
    group.finish();
}

fn bench_followers(c: &mut Criterion) {
    let signal = generate_voice(4096);
    let mut group = c.benchmark_group("Followers");

    let mut peak = EnvelopeFollower::new(0.0, 0.999);
    group.bench_function("EnvelopeFollower", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for &x in &signal {
                sum += peak.tick(black_box(x));
            }
            black_box(sum)
        })
    });

    let mut power = PowerFollower::new(0.01);
    group.bench_function("PowerFollower", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for &x in &signal {
                sum += power.tick(black_box(x));
            }
            black_box(sum)
        })
    });
    group.finish();
}

// ============================================================================
// Detection
// ============================================================================

fn bench_attack(c: &mut Criterion) {
    let ctx = Context::new(SAMPLE_RATE);
    let signal = generate_voice(4096);
    let mut group = c.benchmark_group("AttackDetection");

    for &block_size in &[256usize, 1024, 4096] {
        let mut detector = AttackDetection::new(&ctx, block_size);
        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &signal[..block_size],
            |b, block| b.iter(|| black_box(detector.detect(black_box(block)))),
        );
    }
    group.finish();
}

fn bench_snac(c: &mut Criterion) {
    let ctx = Context::new(SAMPLE_RATE);
    let signal = generate_voice(1 << 13);
    let mut output = vec![0.0f32; signal.len()];
    let mut group = c.benchmark_group("Snac");

    for &overlap in &[1usize, 2, 4, 8] {
        let mut snac = Snac::new(&ctx, overlap).unwrap();
        group.bench_with_input(BenchmarkId::new("overlap", overlap), &signal, |b, signal| {
            b.iter(|| {
                snac.io_samples(black_box(signal), &mut output);
                black_box(snac.period())
            })
        });
    }
    group.finish();
}

fn bench_period_detection(c: &mut Criterion) {
    let ctx = Context::new(SAMPLE_RATE);
    let signal = generate_voice(1 << 13);
    let mut group = c.benchmark_group("PeriodDetection");

    for &frame_size in &[64usize, 256, 1024] {
        let mut input = vec![0.0f32; 1024];
        let mut output = vec![0.0f32; 1024];
        let mut detector = PeriodDetection::new(&ctx, &mut input, &mut output, frame_size).unwrap();
        group.bench_with_input(
            BenchmarkId::new("frame", frame_size),
            &signal,
            |b, signal| {
                b.iter(|| {
                    let mut last = 0.0;
                    for &x in signal {
                        last = detector.find_period(black_box(x));
                    }
                    black_box(last)
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_env_pd,
    bench_followers,
    bench_attack,
    bench_snac,
    bench_period_detection,
);

criterion_main!(benches);
