//! Hodgkin-Huxley neuron, run at audio rate as an oscillator.
//!
//! The membrane voltage is integrated with forward Euler from the three
//! classic gating variables (potassium activation, sodium activation, sodium
//! inactivation). A steady input current makes the cell fire periodically;
//! the spike train, scaled to `[-1, 1]` and DC blocked, is the output.
//!
//! Reference: Hodgkin & Huxley, "A quantitative description of membrane
//! current and its application to conduction and excitation in nerve",
//! J. Physiol. 1952.

use arbor_core::{Filter, PoleZero};
use libm::{expf, tanhf};

/// Optional waveshaping of the membrane voltage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeuronMode {
    /// Raw voltage.
    #[default]
    Normal,
    /// Soft saturation through `tanh`.
    Tanh,
    /// Polynomial shaper after the Aalto synthesizer.
    AaltoShaper,
}

const DEFAULT_TIME_STEP: f32 = 1.0 / 50.0;
const DEFAULT_GATES: [f32; 3] = [0.0, 0.0, 1.0];
const DEFAULT_REVERSAL: [f32; 3] = [-12.0, 115.0, 10.613];
const VOLTAGE_LIMIT: f32 = 100.0;

/// `a * x / (exp(x / 10) - 1)`, continuous through its removable
/// singularity at `x = 0`.
#[inline]
fn exp_ratio(a: f32, x: f32) -> f32 {
    if x.abs() < 1e-4 {
        10.0 * a
    } else {
        a * x / (expf(x / 10.0) - 1.0)
    }
}

/// Hodgkin-Huxley oscillator.
///
/// # Parameters
///
/// - `current`: injected current; around 10 or more makes the cell fire
/// - `k`, `n`, `l`: potassium, sodium and leak conductances
/// - `c`: membrane capacitance
/// - `v1`..`v3`: potassium, sodium and leak reversal potentials
/// - `time_step`: integration step per sample (ms of model time)
///
/// # Example
///
/// ```rust
/// use arbor_synth::{Neuron, NeuronMode};
///
/// let mut cell = Neuron::new();
/// cell.set_current(50.0);
/// cell.set_mode(NeuronMode::Tanh);
/// for _ in 0..4800 {
///     let y = cell.tick();
///     assert!(y.abs() <= 2.0);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Neuron {
    mode: NeuronMode,
    voltage: f32,
    current: f32,
    time_step: f32,
    gates: [f32; 3],
    reversal: [f32; 3],
    g_k: f32,
    g_n: f32,
    g_l: f32,
    c: f32,
    leak_rate: f32,
    blocker: PoleZero,
}

impl Default for Neuron {
    fn default() -> Self {
        Self::new()
    }
}

impl Neuron {
    /// Create a resting cell with the textbook squid-axon constants.
    pub fn new() -> Self {
        let mut cell = Self {
            mode: NeuronMode::Normal,
            voltage: 0.0,
            current: 0.0,
            time_step: DEFAULT_TIME_STEP,
            gates: DEFAULT_GATES,
            reversal: DEFAULT_REVERSAL,
            g_k: 36.0,
            g_n: 120.0,
            g_l: 0.3,
            c: 1.0,
            leak_rate: 0.0,
            blocker: PoleZero::dc_blocker(0.99),
        };
        cell.update_leak_rate();
        cell
    }

    /// Restore every constant and state variable to its initial value.
    /// The shaping mode is kept.
    pub fn reset(&mut self) {
        let mode = self.mode;
        *self = Self::new();
        self.mode = mode;
    }

    fn update_leak_rate(&mut self) {
        self.leak_rate = self.g_l / self.c;
    }

    /// Generate the next sample.
    pub fn tick(&mut self) -> f32 {
        let v = self.voltage;
        let dt = self.time_step;

        let alpha = [
            exp_ratio(0.01, 10.0 - v),
            exp_ratio(0.1, 25.0 - v),
            0.07 * expf(-v / 20.0),
        ];
        let beta = [
            0.125 * expf(-v / 80.0),
            4.0 * expf(-v / 18.0),
            1.0 / (expf((30.0 - v) / 10.0) + 1.0),
        ];
        for ((gate, a), b) in self.gates.iter_mut().zip(alpha).zip(beta) {
            let next = a * dt + (1.0 - (a + b) * dt) * *gate;
            *gate = if next.abs() > 1.0 || !next.is_finite() { 0.0 } else { next };
        }

        let [n, m, h] = self.gates;
        let k_rate = self.g_k * n * n * n * n / self.c;
        let na_rate = self.g_n * m * m * m * h / self.c;

        let mut next = v + dt * self.current / self.c
            - dt * (k_rate * (v - self.reversal[0])
                + na_rate * (v - self.reversal[1])
                + self.leak_rate * (v - self.reversal[2]));

        next = match self.mode {
            NeuronMode::Normal => next,
            NeuronMode::Tanh => 100.0 * tanhf(0.01 * next),
            NeuronMode::AaltoShaper => 100.0 * aalto_shape(0.01 * next),
        };
        if !next.is_finite() {
            next = 0.0;
        }
        self.voltage = next.clamp(-VOLTAGE_LIMIT, VOLTAGE_LIMIT);

        self.blocker.tick(self.voltage / VOLTAGE_LIMIT)
    }

    /// Membrane voltage after the last tick.
    pub fn voltage(&self) -> f32 {
        self.voltage
    }

    /// Select the voltage shaping.
    pub fn set_mode(&mut self, mode: NeuronMode) {
        self.mode = mode;
    }

    /// Injected current.
    pub fn set_current(&mut self, current: f32) {
        self.current = current;
    }

    /// Potassium conductance.
    pub fn set_k(&mut self, k: f32) {
        self.g_k = k;
    }

    /// Leak conductance.
    pub fn set_l(&mut self, l: f32) {
        self.g_l = l;
        self.update_leak_rate();
    }

    /// Sodium conductance.
    pub fn set_n(&mut self, n: f32) {
        self.g_n = n;
    }

    /// Membrane capacitance; non-positive values are ignored.
    pub fn set_c(&mut self, c: f32) {
        if c > 0.0 {
            self.c = c;
            self.update_leak_rate();
        }
    }

    /// Potassium reversal potential.
    pub fn set_v1(&mut self, v1: f32) {
        self.reversal[0] = v1;
    }

    /// Sodium reversal potential.
    pub fn set_v2(&mut self, v2: f32) {
        self.reversal[1] = v2;
    }

    /// Leak reversal potential.
    pub fn set_v3(&mut self, v3: f32) {
        self.reversal[2] = v3;
    }

    /// Integration step per sample.
    pub fn set_time_step(&mut self, time_step: f32) {
        self.time_step = time_step;
    }
}

fn aalto_shape(x: f32) -> f32 {
    const SQRT8: f32 = 2.828_427_1;
    const W_SCALE: f32 = 1.306_122_4;
    const DRIVE: f32 = 1.0;

    let xc = x.clamp(-SQRT8, SQRT8);
    let xc2 = xc * xc;
    let c = 0.5 * x * (3.0 - xc2);
    let xc4 = xc2 * xc2;
    let w = (1.0 - xc2 * 0.25 + xc4 * 0.015_625) * W_SCALE;
    w * (c + 0.05 * xc2) * (DRIVE + 0.75)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_cell_stays_quiet() {
        let mut cell = Neuron::new();
        // Let the gates relax from their initial values first.
        for _ in 0..48000 {
            cell.tick();
        }
        let mut peak = 0.0f32;
        for _ in 0..48000 {
            peak = peak.max(cell.tick().abs());
        }
        assert!(peak < 0.1, "peak {peak}");
    }

    #[test]
    fn driven_cell_spikes_repeatedly() {
        let mut cell = Neuron::new();
        cell.set_current(20.0);
        let mut spikes = 0;
        let mut above = false;
        for _ in 0..48000 {
            cell.tick();
            let v = cell.voltage();
            if !above && v > 50.0 {
                spikes += 1;
            }
            above = v > 50.0;
        }
        assert!(spikes > 10, "spikes {spikes}");
    }

    #[test]
    fn output_is_bounded_in_every_mode() {
        for mode in [NeuronMode::Normal, NeuronMode::Tanh, NeuronMode::AaltoShaper] {
            let mut cell = Neuron::new();
            cell.set_mode(mode);
            cell.set_current(200.0);
            for _ in 0..20000 {
                let y = cell.tick();
                assert!(y.is_finite() && y.abs() <= 2.0, "{mode:?}: {y}");
            }
        }
    }

    #[test]
    fn gate_singularities_are_finite() {
        assert!((exp_ratio(0.01, 0.0) - 0.1).abs() < 1e-6);
        assert!((exp_ratio(0.1, 1e-5) - 1.0).abs() < 1e-4);
        assert!((exp_ratio(0.01, 0.01) - 0.1).abs() < 1e-3);
    }

    #[test]
    fn reset_keeps_mode_and_restores_state() {
        let mut cell = Neuron::new();
        cell.set_mode(NeuronMode::Tanh);
        cell.set_current(30.0);
        let first: Vec<f32> = (0..256).map(|_| cell.tick()).collect();
        cell.reset();
        cell.set_current(30.0);
        let again: Vec<f32> = (0..256).map(|_| cell.tick()).collect();
        assert_eq!(first, again);
        assert_eq!(cell.mode, NeuronMode::Tanh);
    }
}
