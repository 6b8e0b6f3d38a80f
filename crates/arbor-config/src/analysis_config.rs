//! Parameter sets for the context and the analysis chain.

use arbor_analysis::env_pd::{ENV_HOP_SIZE, ENV_WINDOW_SIZE, MAX_OVERLAP};
use arbor_analysis::period::{
    DEF_CONFIRM_PASSES, DEF_HOP_SIZE, DEF_MIN_FIDELITY, DEF_PITCH_RATIO, DEF_TIME_CONSTANT,
    DEF_WINDOW_SIZE, FBA,
};
use arbor_analysis::snac::{DEF_BIAS, DEF_MIN_RMS, DEF_OVERLAP};
use arbor_analysis::{EnvPd, PeriodDetection, Snac};
use arbor_core::{Context, Mempool};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::{ValidationResult, Validator};

/// Highest sample rate accepted by validation.
pub const MAX_SAMPLE_RATE: f32 = 768_000.0;

/// Runtime context settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Pool budget in bytes.
    pub pool_size: usize,
    /// Seed for the context's random sources; left to the built-in seed
    /// when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            sample_rate: Context::DEFAULT_SAMPLE_RATE,
            pool_size: Mempool::DEFAULT_SIZE,
            seed: None,
        }
    }
}

impl ContextConfig {
    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the pool budget in bytes.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    fn check(&self, v: &mut Validator) {
        v.range("context.sample_rate", self.sample_rate, 1.0, MAX_SAMPLE_RATE);
        v.count("context.pool_size", self.pool_size, 1, usize::MAX);
    }

    /// Validate the settings.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut v = Validator::new();
        self.check(&mut v);
        v.finish()
    }

    /// Build a context with its own pool.
    pub fn build(&self) -> Context {
        let ctx = Context::with_pool_size(self.sample_rate, self.pool_size);
        if let Some(seed) = self.seed {
            ctx.set_seed(seed);
        }
        ctx
    }
}

/// Standalone [`EnvPd`] geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvConfig {
    /// Analysis window in samples.
    pub window_size: usize,
    /// Hop between analyses in samples; 0 means half the window.
    pub hop_size: usize,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            window_size: ENV_WINDOW_SIZE,
            hop_size: ENV_HOP_SIZE,
        }
    }
}

impl EnvConfig {
    fn check(&self, v: &mut Validator) {
        v.count("envelope.window_size", self.window_size, 1, usize::MAX);
        check_hop(v, "envelope.hop_size", self.hop_size, self.window_size);
    }

    /// Validate the settings.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut v = Validator::new();
        self.check(&mut v);
        v.finish()
    }

    /// Build an estimator fed `block_size` samples at a time.
    pub fn build(&self, ctx: &Context, block_size: usize) -> Result<EnvPd, ConfigError> {
        self.validate()?;
        Ok(EnvPd::new(ctx, self.window_size, self.hop_size, block_size)?)
    }
}

/// [`Snac`] detector settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SnacConfig {
    /// Passes per frame, a power of two.
    pub overlap: usize,
    /// Short-lag bias strength in `[0, 1]`.
    pub bias: f32,
    /// RMS below which a frame counts as silent.
    pub min_rms: f32,
}

impl Default for SnacConfig {
    fn default() -> Self {
        Self {
            overlap: DEF_OVERLAP,
            bias: DEF_BIAS,
            min_rms: DEF_MIN_RMS,
        }
    }
}

impl SnacConfig {
    fn check(&self, v: &mut Validator) {
        v.power_of_two("snac.overlap", self.overlap, 1, MAX_OVERLAP);
        v.range("snac.bias", self.bias, 0.0, 1.0);
        v.range("snac.min_rms", self.min_rms, 0.0, 1.0);
    }

    /// Validate the settings.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut v = Validator::new();
        self.check(&mut v);
        v.finish()
    }

    /// Build a detector.
    pub fn build(&self, ctx: &Context) -> Result<Snac, ConfigError> {
        self.validate()?;
        let mut snac = Snac::new(ctx, self.overlap)?;
        self.apply_to(&mut snac);
        Ok(snac)
    }

    /// Push the settings into an existing detector.
    pub fn apply_to(&self, snac: &mut Snac) {
        snac.set_overlap(self.overlap);
        snac.set_bias(self.bias);
        snac.set_min_rms(self.min_rms);
    }
}

/// [`PeriodDetection`] settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PeriodConfig {
    /// Samples per frame handed to the envelope.
    pub frame_size: usize,
    /// Length of the caller's input and output buffers.
    pub buffer_size: usize,
    /// Envelope hop in samples.
    pub hop_size: usize,
    /// Envelope window in samples.
    pub window_size: usize,
    /// Envelope-peak decay time in ms.
    pub time_constant_ms: f32,
    /// Largest period ratio taken without confirmation.
    pub pitch_ratio: f32,
    /// Envelope rise in dB that marks an onset.
    pub onset_db: f32,
    /// Fidelity an estimate needs to be considered.
    pub min_fidelity: f32,
    /// Agreeing passes needed before a large jump is taken.
    pub confirm_passes: usize,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            frame_size: 64,
            buffer_size: 1024,
            hop_size: DEF_HOP_SIZE,
            window_size: DEF_WINDOW_SIZE,
            time_constant_ms: DEF_TIME_CONSTANT,
            pitch_ratio: DEF_PITCH_RATIO,
            onset_db: FBA,
            min_fidelity: DEF_MIN_FIDELITY,
            confirm_passes: DEF_CONFIRM_PASSES,
        }
    }
}

impl PeriodConfig {
    fn check(&self, v: &mut Validator) {
        v.count("period.buffer_size", self.buffer_size, 1, usize::MAX);
        v.count("period.frame_size", self.frame_size, 1, self.buffer_size.max(1));
        v.count("period.window_size", self.window_size, 1, ENV_WINDOW_SIZE);
        check_hop(v, "period.hop_size", self.hop_size, self.window_size);
        v.at_least("period.time_constant_ms", self.time_constant_ms, 1.0);
        v.at_least("period.pitch_ratio", self.pitch_ratio, 1.0);
        v.at_least("period.onset_db", self.onset_db, 0.0);
        v.range("period.min_fidelity", self.min_fidelity, 0.0, 1.0);
        v.count("period.confirm_passes", self.confirm_passes, 1, usize::MAX);
    }

    /// Validate the settings.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut v = Validator::new();
        self.check(&mut v);
        v.finish()
    }

    /// Zeroed input and output buffers of `buffer_size` samples.
    pub fn buffers(&self) -> (Vec<f32>, Vec<f32>) {
        (vec![0.0; self.buffer_size], vec![0.0; self.buffer_size])
    }

    /// Push the tracking settings into an existing detector. The frame and
    /// buffer sizes are fixed at construction and are not touched.
    pub fn apply_to(&self, detector: &mut PeriodDetection<'_>) {
        detector.set_window_size(self.window_size);
        detector.set_hop_size(self.hop_size);
        detector.set_time_constant(self.time_constant_ms);
        detector.set_pitch_ratio(self.pitch_ratio);
        detector.set_onset_threshold(self.onset_db);
        detector.set_min_fidelity(self.min_fidelity);
        detector.set_confirm_passes(self.confirm_passes);
    }
}

fn check_hop(v: &mut Validator, param: &str, hop_size: usize, window_size: usize) {
    if hop_size == 0 {
        return;
    }
    let min_hop = window_size / MAX_OVERLAP + 1;
    v.require(
        hop_size >= min_hop && hop_size <= window_size.max(min_hop),
        param,
        format!("must be 0 or within [{min_hop}, {window_size}]"),
    );
}

/// Complete parameter set for an analysis chain.
///
/// # TOML Format
///
/// Every table and key is optional; missing values take the library
/// defaults.
///
/// ```toml
/// [context]
/// sample_rate = 44100.0
/// pool_size = 262144
///
/// [envelope]
/// window_size = 1024
/// hop_size = 256
///
/// [snac]
/// overlap = 2
/// bias = 0.2
/// min_rms = 0.003
///
/// [period]
/// frame_size = 64
/// buffer_size = 1024
/// pitch_ratio = 2.0
/// confirm_passes = 3
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Runtime context.
    pub context: ContextConfig,
    /// Standalone envelope estimator.
    pub envelope: EnvConfig,
    /// Period detector.
    pub snac: SnacConfig,
    /// Period tracker.
    pub period: PeriodConfig,
}

impl AnalysisConfig {
    /// Parse a configuration from TOML. Values are not validated.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to pretty-printed TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every section, reporting all failures at once.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut v = Validator::new();
        self.context.check(&mut v);
        self.envelope.check(&mut v);
        self.snac.check(&mut v);
        self.period.check(&mut v);
        v.finish()
    }

    /// Build the runtime context described by the `[context]` table.
    pub fn build_context(&self) -> Context {
        self.context.build()
    }

    /// Build a tracker over the caller's buffers with every setting
    /// applied.
    pub fn build_detector<'a>(
        &self,
        ctx: &Context,
        input: &'a mut [f32],
        output: &'a mut [f32],
    ) -> Result<PeriodDetection<'a>, ConfigError> {
        self.validate()?;
        let mut detector = PeriodDetection::new(ctx, input, output, self.period.frame_size)?;
        self.apply_to(&mut detector);
        Ok(detector)
    }

    /// Push the `[period]` and `[snac]` settings into an existing tracker.
    pub fn apply_to(&self, detector: &mut PeriodDetection<'_>) {
        self.period.apply_to(detector);
        self.snac.apply_to(detector.snac_mut());
    }
}
