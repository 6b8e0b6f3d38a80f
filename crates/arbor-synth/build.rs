//! Generates the minBLEP correction tables compiled into `minblep.rs`.
//!
//! Blackman-windowed sinc -> real cepstrum -> minimum-phase impulse ->
//! integrated step. The step residual (band-limited step minus an ideal step
//! delayed by `SAMPLE_DELAY` samples) and its integral, the slope residual,
//! are written to `$OUT_DIR/minblep_tables.rs` as `f32` arrays.
//!
//! The minimum-phase filter delays a ramp by its centroid, not by
//! `SAMPLE_DELAY`, so the slope residual settles at `SAMPLE_DELAY - centroid`
//! rather than zero. The table stores the residual minus that tail (ending at
//! zero) and the tail itself is emitted as `SLOPE_TAIL`.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

/// Sub-sample resolution of the tables.
const PHASES: usize = 64;
/// Zero crossings on each side of the prototype sinc.
const ZERO_CROSSINGS: usize = 16;
/// Kernel length in output samples.
const PULSE_LENGTH: usize = 72;
/// Output delay of the naive waveform relative to the kernel start.
const SAMPLE_DELAY: usize = 4;
/// Cepstrum transform size. Large enough that the folded cepstrum does not alias.
const FFT_SIZE: usize = 1 << 15;

fn blackman(n: usize, len: usize) -> f64 {
    let x = 2.0 * std::f64::consts::PI * n as f64 / (len - 1) as f64;
    0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let px = std::f64::consts::PI * x;
        px.sin() / px
    }
}

/// Minimum-phase version of a windowed-sinc lowpass at `PHASES`x oversampling.
fn minimum_phase_impulse() -> Vec<f64> {
    let taps = 2 * ZERO_CROSSINGS * PHASES + 1;
    let center = (ZERO_CROSSINGS * PHASES) as f64;

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(FFT_SIZE);
    let inverse = planner.plan_fft_inverse(FFT_SIZE);
    let scale = 1.0 / FFT_SIZE as f64;

    let mut buf = vec![Complex::new(0.0, 0.0); FFT_SIZE];
    for (n, slot) in buf.iter_mut().take(taps).enumerate() {
        let t = (n as f64 - center) / PHASES as f64;
        slot.re = sinc(t) * blackman(n, taps);
    }

    // Real cepstrum of the magnitude response.
    forward.process(&mut buf);
    for bin in &mut buf {
        *bin = Complex::new(bin.norm().max(1e-9).ln(), 0.0);
    }
    inverse.process(&mut buf);
    for c in &mut buf {
        *c = Complex::new(c.re * scale, 0.0);
    }

    // Fold the anticausal half onto the causal half.
    let half = FFT_SIZE / 2;
    for n in 1..half {
        buf[n].re *= 2.0;
    }
    for c in &mut buf[half + 1..] {
        *c = Complex::new(0.0, 0.0);
    }

    forward.process(&mut buf);
    for bin in &mut buf {
        let mag = bin.re.exp();
        *bin = Complex::new(mag * bin.im.cos(), mag * bin.im.sin());
    }
    inverse.process(&mut buf);

    buf.iter().map(|c| c.re * scale).collect()
}

fn write_table(out: &mut String, name: &str, doc: &str, values: &[f64]) {
    let _ = writeln!(out, "/// {doc}");
    let _ = writeln!(out, "pub(crate) static {name}: [f32; {}] = [", values.len());
    for chunk in values.chunks(8) {
        out.push_str("   ");
        for v in chunk {
            let _ = write!(out, " {:?},", *v as f32);
        }
        out.push('\n');
    }
    out.push_str("];\n\n");
}

fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=build.rs");

    let impulse = minimum_phase_impulse();
    let len = PULSE_LENGTH * PHASES;

    // Integrated impulse, normalised so the step settles at exactly 1.
    let total: f64 = impulse[..FFT_SIZE / 2].iter().sum();
    let mut step = Vec::with_capacity(len + 2);
    let mut acc = 0.0;
    for &h in impulse.iter().take(len + 2) {
        acc += h;
        step.push(acc / total);
    }

    let delay = SAMPLE_DELAY * PHASES;
    let ideal = |k: usize| if k >= delay { 1.0 } else { 0.0 };

    let value: Vec<f64> = (0..len).map(|k| step[k] - ideal(k)).collect();
    let delta: Vec<f64> = (0..len).map(|k| step[k + 1] - step[k]).collect();

    // Ramp residual: running integral of the step residual, in samples.
    let mut ramp = Vec::with_capacity(len + 1);
    let mut integral = 0.0;
    for k in 0..=len {
        ramp.push(integral);
        integral += (step[k] - ideal(k)) / PHASES as f64;
    }
    let tail = ramp[len];
    let slope: Vec<f64> = ramp.iter().map(|r| r - tail).collect();

    let mut out = String::new();
    out.push_str("// Generated by build.rs. Do not edit.\n\n");
    write_table(
        &mut out,
        "STEP_DD_VALUE",
        "Band-limited step minus delayed ideal step, 64 phases per sample.",
        &value,
    );
    write_table(
        &mut out,
        "STEP_DD_DELTA",
        "Forward difference of the band-limited step for sub-phase interpolation.",
        &delta,
    );
    write_table(
        &mut out,
        "SLOPE_DD",
        "Band-limited ramp residual for unit slope changes, less its settled tail.",
        &slope,
    );
    let _ = writeln!(
        out,
        "/// Settled value of the ramp residual per unit slope: `SAMPLE_DELAY` minus the filter centroid."
    );
    let _ = writeln!(out, "pub(crate) const SLOPE_TAIL: f32 = {:?};", tail as f32);

    let dest = PathBuf::from(std::env::var_os("OUT_DIR").unwrap_or_default())
        .join("minblep_tables.rs");
    fs::write(dest, out)
}
