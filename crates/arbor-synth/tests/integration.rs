//! Integration tests for arbor-synth.
//!
//! Every oscillator is driven at 375 Hz and 48 kHz, where the per-sample
//! increment is exactly 2^-7, so a cycle is exactly 128 samples long and
//! steady-state output must repeat with that period.

use arbor_core::{Context, Mempool};
use arbor_synth::{
    Cycle, MbPulse, MbSaw, MbTriangle, Neuron, Noise, NoiseType, Phasor, PolyPulse, PolySaw,
    PolyTri, Sawtooth, Square, Table, Triangle, Wavetable,
};

const SR: f32 = 48000.0;
const FREQ: f32 = 375.0;
const PERIOD: usize = 128;

fn assert_periodic(name: &str, out: &[f32], settle: usize, tol: f32) {
    for n in settle..out.len() - PERIOD {
        assert!(
            (out[n] - out[n + PERIOD]).abs() <= tol,
            "{name}: sample {n} = {} but {} one period later",
            out[n],
            out[n + PERIOD]
        );
    }
}

fn render(mut tick: impl FnMut() -> f32, len: usize) -> Vec<f32> {
    (0..len).map(|_| tick()).collect()
}

fn sine_table(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (core::f32::consts::TAU * i as f32 / len as f32).sin())
        .collect()
}

// ---------------------------------------------------------------------------
// Periodicity
// ---------------------------------------------------------------------------

#[test]
fn accumulator_oscillators_repeat_every_period() {
    let ctx = Context::new(SR);

    let mut phasor = Phasor::new(&ctx);
    phasor.set_freq(FREQ);
    assert_periodic("phasor", &render(|| phasor.tick(), 1024), 0, 0.0);

    let mut cycle = Cycle::new(&ctx);
    cycle.set_freq(FREQ);
    assert_periodic("cycle", &render(|| cycle.tick(), 1024), 0, 0.0);

    let table = sine_table(512);
    let mut lookup = Table::new(&ctx, &table);
    lookup.set_freq(FREQ);
    assert_periodic("table", &render(|| lookup.tick(), 1024), 0, 0.0);
}

#[test]
fn polyblep_oscillators_repeat_every_period() {
    let ctx = Context::new(SR);

    let mut tri = PolyTri::new(&ctx);
    tri.set_freq(FREQ);
    tri.set_skew(0.3);
    assert_periodic("poly tri", &render(|| tri.tick(), 1024), 0, 1e-6);

    let mut pulse = PolyPulse::new(&ctx);
    pulse.set_freq(FREQ);
    pulse.set_width(0.3);
    assert_periodic("poly pulse", &render(|| pulse.tick(), 1024), 0, 1e-6);

    let mut saw = PolySaw::new(&ctx);
    saw.set_freq(FREQ);
    assert_periodic("poly saw", &render(|| saw.tick(), 1024), 0, 1e-6);
}

#[test]
fn table_oscillators_repeat_every_period() {
    let ctx = Context::new(SR);

    let mut tri = Triangle::new(&ctx).unwrap();
    tri.set_freq(FREQ);
    assert_periodic("triangle", &render(|| tri.tick(), 1024), 0, 1e-6);

    let mut square = Square::new(&ctx).unwrap();
    square.set_freq(FREQ);
    assert_periodic("square", &render(|| square.tick(), 1024), 0, 1e-6);

    let mut saw = Sawtooth::new(&ctx).unwrap();
    saw.set_freq(FREQ);
    assert_periodic("sawtooth", &render(|| saw.tick(), 1024), 0, 1e-6);

    let table = sine_table(1024);
    let mut wt = Wavetable::new(&ctx, &table, 12000.0).unwrap();
    wt.set_freq(FREQ);
    assert_periodic("wavetable", &render(|| wt.tick(), 1024), 0, 1e-6);
}

#[test]
fn minblep_oscillators_repeat_every_period() {
    let ctx = Context::new(SR);

    let mut pulse = MbPulse::new(&ctx);
    pulse.set_freq(FREQ);
    pulse.set_width(0.2);
    assert_periodic("mb pulse", &render(|| pulse.tick(), 4096), 1024, 1e-4);

    let mut tri = MbTriangle::new(&ctx);
    tri.set_freq(FREQ);
    tri.set_width(-0.5);
    assert_periodic("mb triangle", &render(|| tri.tick(), 4096), 1024, 1e-4);

    let mut saw = MbSaw::new(&ctx);
    saw.set_freq(FREQ);
    assert_periodic("mb saw", &render(|| saw.tick(), 4096), 1024, 1e-4);
}

// ---------------------------------------------------------------------------
// Re-initialisation
// ---------------------------------------------------------------------------

fn assert_reproducible<O>(mut make: impl FnMut() -> O, mut tick: impl FnMut(&mut O) -> f32) {
    let mut a = make();
    let mut b = make();
    let first = render(|| tick(&mut a), 600);
    let second = render(|| tick(&mut b), 600);
    assert_eq!(first, second);
}

#[test]
fn fresh_instances_reproduce_the_same_waveform() {
    let ctx = Context::new(SR);
    let freq = 523.25;

    assert_reproducible(
        || {
            let mut osc = MbPulse::new(&ctx);
            osc.set_freq(freq);
            osc
        },
        MbPulse::tick,
    );
    assert_reproducible(
        || {
            let mut osc = MbTriangle::new(&ctx);
            osc.set_freq(freq);
            osc
        },
        MbTriangle::tick,
    );
    assert_reproducible(
        || {
            let mut osc = MbSaw::new(&ctx);
            osc.set_freq(freq);
            osc
        },
        MbSaw::tick,
    );
    assert_reproducible(
        || {
            let mut osc = PolyTri::new(&ctx);
            osc.set_freq(freq);
            osc
        },
        PolyTri::tick,
    );
    assert_reproducible(
        || {
            let mut osc = Square::new(&ctx).unwrap();
            osc.set_freq(freq);
            osc
        },
        Square::tick,
    );
    assert_reproducible(
        || {
            let mut cell = Neuron::new();
            cell.set_current(40.0);
            cell
        },
        Neuron::tick,
    );
}

#[test]
fn reset_after_sync_matches_fresh_state() {
    let ctx = Context::new(SR);
    let mut fresh = MbTriangle::new(&ctx);
    fresh.set_freq(300.0);
    let expected = render(|| fresh.tick(), 400);

    let mut used = MbTriangle::new(&ctx);
    used.set_freq(300.0);
    for n in 0..1000 {
        if n % 37 == 0 {
            used.sync_in(0.3);
        }
        used.tick();
    }
    used.reset();
    assert_eq!(render(|| used.tick(), 400), expected);
}

#[test]
fn seeded_noise_is_reproducible() {
    let a = Context::new(SR);
    let b = Context::new(SR);
    a.set_seed(7);
    b.set_seed(7);
    let mut na = Noise::new(&a, NoiseType::Pink);
    let mut nb = Noise::new(&b, NoiseType::Pink);
    assert_eq!(render(|| na.tick(), 256), render(|| nb.tick(), 256));
}

// ---------------------------------------------------------------------------
// Pools and sample rate
// ---------------------------------------------------------------------------

#[test]
fn caller_pool_and_default_pool_behave_alike() {
    let ctx = Context::new(SR);
    let pool = Mempool::new(1 << 20);
    let table = sine_table(256);

    let mut in_default = Wavetable::new(&ctx, &table, 8000.0).unwrap();
    let mut in_caller = Wavetable::new_in(&ctx, &pool, &table, 8000.0).unwrap();
    assert_eq!(ctx.pool().used(), pool.used());

    in_default.set_freq(1000.0);
    in_caller.set_freq(1000.0);
    assert_eq!(render(|| in_default.tick(), 256), render(|| in_caller.tick(), 256));
}

#[test]
fn undersized_pool_rejects_tables() {
    let ctx = Context::with_pool_size(SR, 1024);
    assert!(Sawtooth::new(&ctx).is_err());
    assert_eq!(ctx.pool().used(), 0);
}

#[test]
fn sample_rate_change_keeps_pitch() {
    let ctx = Context::new(SR);
    let mut saw = PolySaw::new(&ctx);
    saw.set_freq(FREQ);
    saw.set_sample_rate(96000.0);
    // Now 256 samples per cycle.
    let out = render(|| saw.tick(), 1024);
    for n in 0..512 {
        assert!((out[n] - out[n + 256]).abs() < 1e-6);
    }
}
