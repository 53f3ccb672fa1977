//! Configuration loading for the ripples pipeline.
//!
//! Settings come from a TOML file, with `RIPPLES_`-prefixed environment
//! variables layered on top (`RIPPLES_SIMULATION__WAVE_SPEED=0.4`).
//!
//! ```toml
//! [simulation]
//! wave_speed = 0.5
//! laplacian = "convolution"
//!
//! [disturbances]
//! cooldown = { min = 20, max = 60 }
//! seed = 7
//!
//! [render]
//! strategy = "blurred_highlights"
//! ```

use crate::error::{Result, RipplesError};
use crate::pipeline::{PipelineSettings, DEFAULT_DIVERGENCE_GROWTH};
use crate::render::{BloomParams, MAX_BLOOM_RADIUS};
use crate::simulation::{Bounds, DisturbanceRanges, LaplacianSource, SimulationParams};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "RIPPLES";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RipplesConfig {
    /// Wave equation and stability settings.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Disturbance scheduler ranges.
    #[serde(default)]
    pub disturbances: DisturbanceConfig,

    /// Bloom settings.
    #[serde(default)]
    pub render: BloomParams,

    /// Offline rendering output.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_wave_speed")]
    pub wave_speed: f32,

    #[serde(default = "default_cell_size")]
    pub cell_size: f32,

    #[serde(default = "default_time_step")]
    pub time_step: f32,

    /// Per-step energy retention, in `(0, 1]`.
    #[serde(default = "default_damper")]
    pub damper: f32,

    /// Laplacian evaluation variant.
    #[serde(default)]
    pub laplacian: LaplacianSource,

    /// Clamp the Laplacian multiplier to the stability limit.
    #[serde(default = "default_clamp_courant")]
    pub clamp_courant: bool,

    /// Per-step peak growth that, sustained, resets the field.
    #[serde(default = "default_divergence_growth")]
    pub divergence_growth: f32,
}

fn default_wave_speed() -> f32 {
    SimulationParams::default().wave_speed
}

fn default_cell_size() -> f32 {
    SimulationParams::default().cell_size
}

fn default_time_step() -> f32 {
    SimulationParams::default().time_step
}

fn default_damper() -> f32 {
    SimulationParams::default().damper
}

fn default_clamp_courant() -> bool {
    true
}

fn default_divergence_growth() -> f32 {
    DEFAULT_DIVERGENCE_GROWTH
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            wave_speed: default_wave_speed(),
            cell_size: default_cell_size(),
            time_step: default_time_step(),
            damper: default_damper(),
            laplacian: LaplacianSource::default(),
            clamp_courant: default_clamp_courant(),
            divergence_growth: default_divergence_growth(),
        }
    }
}

impl SimulationConfig {
    pub fn params(&self) -> SimulationParams {
        SimulationParams::new(self.wave_speed, self.cell_size, self.time_step)
            .with_damper(self.damper)
    }
}

/// Disturbance scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisturbanceConfig {
    #[serde(default = "default_cooldown")]
    pub cooldown: Bounds<u32>,

    #[serde(default = "default_density")]
    pub density: Bounds<u32>,

    #[serde(default = "default_radius")]
    pub radius: Bounds<f32>,

    #[serde(default = "default_strength")]
    pub strength: Bounds<f32>,

    /// Fixed RNG seed; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_cooldown() -> Bounds<u32> {
    DisturbanceRanges::default().cooldown
}

fn default_density() -> Bounds<u32> {
    DisturbanceRanges::default().density
}

fn default_radius() -> Bounds<f32> {
    DisturbanceRanges::default().radius
}

fn default_strength() -> Bounds<f32> {
    DisturbanceRanges::default().strength
}

impl Default for DisturbanceConfig {
    fn default() -> Self {
        Self {
            cooldown: default_cooldown(),
            density: default_density(),
            radius: default_radius(),
            strength: default_strength(),
            seed: None,
        }
    }
}

impl DisturbanceConfig {
    pub fn ranges(&self) -> DisturbanceRanges {
        DisturbanceRanges {
            cooldown: self.cooldown,
            density: self.density,
            radius: self.radius,
            strength: self.strength,
        }
    }
}

/// Offline frame export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Frames to simulate.
    #[serde(default = "default_frames")]
    pub frames: u64,

    /// Host frame rate used to advance time.
    #[serde(default = "default_fps")]
    pub fps: f64,

    /// Directory PNGs are written to.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Save every Nth frame.
    #[serde(default = "default_every")]
    pub every: u64,
}

fn default_width() -> u32 {
    256
}

fn default_height() -> u32 {
    256
}

fn default_frames() -> u64 {
    300
}

fn default_fps() -> f64 {
    60.0
}

fn default_directory() -> PathBuf {
    PathBuf::from("frames")
}

fn default_every() -> u64 {
    10
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            frames: default_frames(),
            fps: default_fps(),
            directory: default_directory(),
            every: default_every(),
        }
    }
}

impl RipplesConfig {
    /// Load from a TOML file with environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment());

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load from a file, falling back to defaults on any error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Failed to load {}: {}; using defaults",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Load from environment variables only.
    pub fn from_env() -> Result<Self> {
        let builder = Config::builder().add_source(environment());
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load from a TOML string with environment overrides.
    pub fn load_from_str(content: &str) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .add_source(environment());

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        for (name, value) in [
            ("simulation.wave_speed", sim.wave_speed),
            ("simulation.cell_size", sim.cell_size),
            ("simulation.time_step", sim.time_step),
        ] {
            if !value.is_finite() {
                return Err(RipplesError::config(format!("{name} must be finite")));
            }
        }
        if !(sim.damper > 0.0 && sim.damper <= 1.0) {
            return Err(RipplesError::config("simulation.damper must be in (0, 1]"));
        }
        if !sim.divergence_growth.is_finite() || sim.divergence_growth <= 1.0 {
            return Err(RipplesError::config(
                "simulation.divergence_growth must be finite and above 1",
            ));
        }

        let dist = &self.disturbances;
        if !dist.cooldown.is_ordered() {
            return Err(RipplesError::config("disturbances.cooldown: min > max"));
        }
        if !dist.density.is_ordered() {
            return Err(RipplesError::config("disturbances.density: min > max"));
        }
        if !has_finite_width(dist.radius) || !dist.radius.is_ordered() || dist.radius.min <= 0.0 {
            return Err(RipplesError::config(
                "disturbances.radius must be finite, positive and ordered",
            ));
        }
        if !has_finite_width(dist.strength) || !dist.strength.is_ordered() {
            return Err(RipplesError::config(
                "disturbances.strength must be finite and ordered",
            ));
        }

        let render = &self.render;
        if render.radius == 0 || render.radius > MAX_BLOOM_RADIUS {
            return Err(RipplesError::config(format!(
                "render.radius must be in 1..={MAX_BLOOM_RADIUS}"
            )));
        }
        for (name, value) in [
            ("render.falloff", render.falloff),
            ("render.threshold", render.threshold),
            ("render.gain", render.gain),
            ("render.strength", render.strength),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RipplesError::config(format!(
                    "{name} must be finite and non-negative"
                )));
            }
        }

        if self.output.fps.is_nan() || self.output.fps <= 0.0 {
            return Err(RipplesError::config("output.fps must be positive"));
        }
        if self.output.every == 0 {
            return Err(RipplesError::config("output.every must be at least 1"));
        }

        Ok(())
    }

    /// Settings pushed into [`crate::FramePipeline::configure`].
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            params: self.simulation.params(),
            ranges: self.disturbances.ranges(),
            laplacian: self.simulation.laplacian,
            bloom: self.render,
            clamp_courant: self.simulation.clamp_courant,
            divergence_growth: self.simulation.divergence_growth,
        }
    }
}

/// Both ends and the span between them are finite.
fn has_finite_width(bounds: Bounds<f32>) -> bool {
    bounds.is_finite() && (bounds.max - bounds.min).is_finite()
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Configuration builder for programmatic configuration.
pub struct ConfigBuilder {
    config: RipplesConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RipplesConfig::default(),
        }
    }

    /// Set wave speed, cell size and time step.
    pub fn wave(mut self, wave_speed: f32, cell_size: f32, time_step: f32) -> Self {
        self.config.simulation.wave_speed = wave_speed;
        self.config.simulation.cell_size = cell_size;
        self.config.simulation.time_step = time_step;
        self
    }

    pub fn damper(mut self, damper: f32) -> Self {
        self.config.simulation.damper = damper;
        self
    }

    pub fn laplacian(mut self, source: LaplacianSource) -> Self {
        self.config.simulation.laplacian = source;
        self
    }

    pub fn cooldown(mut self, min: u32, max: u32) -> Self {
        self.config.disturbances.cooldown = Bounds::new(min, max);
        self
    }

    pub fn density(mut self, min: u32, max: u32) -> Self {
        self.config.disturbances.density = Bounds::new(min, max);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.disturbances.seed = Some(seed);
        self
    }

    pub fn bloom(mut self, params: BloomParams) -> Self {
        self.config.render = params;
        self
    }

    /// Set the output surface size.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.config.output.width = width;
        self.config.output.height = height;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<RipplesConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BloomStrategy;

    #[test]
    fn test_default_config() {
        let config = RipplesConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.simulation.clamp_courant);
        assert_eq!(config.disturbances.cooldown, Bounds::new(20, 60));
        assert_eq!(config.output.width, 256);
        assert_eq!(config.disturbances.seed, None);
    }

    #[test]
    fn test_config_validation() {
        let mut invalid = RipplesConfig::default();
        invalid.disturbances.cooldown = Bounds::new(60, 20);
        assert!(invalid.validate().is_err());

        let mut invalid = RipplesConfig::default();
        invalid.simulation.damper = 1.5;
        assert!(invalid.validate().is_err());

        let mut invalid = RipplesConfig::default();
        invalid.disturbances.radius = Bounds::new(0.0, 4.0);
        assert!(invalid.validate().is_err());

        let mut invalid = RipplesConfig::default();
        invalid.simulation.wave_speed = f32::NAN;
        assert!(invalid.validate().is_err());

        let mut invalid = RipplesConfig::default();
        invalid.disturbances.strength = Bounds::new(-3e38, 3e38);
        assert!(invalid.validate().is_err());

        let mut invalid = RipplesConfig::default();
        invalid.render.radius = MAX_BLOOM_RADIUS + 1;
        assert!(invalid.validate().is_err());

        let mut invalid = RipplesConfig::default();
        invalid.simulation.divergence_growth = 1.0;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .wave(0.25, 1.0, 1.0)
            .cooldown(5, 5)
            .density(2, 2)
            .seed(42)
            .size(64, 32)
            .build()
            .unwrap();

        assert_eq!(config.simulation.wave_speed, 0.25);
        assert_eq!(config.disturbances.seed, Some(42));
        assert_eq!((config.output.width, config.output.height), (64, 32));

        assert!(ConfigBuilder::new().damper(0.0).build().is_err());
    }

    #[test]
    fn test_load_from_str() {
        let toml = r#"
            [simulation]
            wave_speed = 0.3
            laplacian = "convolution"

            [disturbances]
            cooldown = { min = 5, max = 10 }
            seed = 9

            [render]
            strategy = "blurred_highlights"
            strength = 0.4
        "#;

        let config = RipplesConfig::load_from_str(toml).unwrap();
        assert_eq!(config.simulation.wave_speed, 0.3);
        assert_eq!(config.simulation.laplacian, LaplacianSource::Convolution);
        assert_eq!(config.simulation.damper, default_damper());
        assert_eq!(config.disturbances.cooldown, Bounds::new(5, 10));
        assert_eq!(config.disturbances.seed, Some(9));
        assert_eq!(config.render.strategy, BloomStrategy::BlurredHighlights);
        assert_eq!(config.render.strength, 0.4);
        assert_eq!(config.render.radius, BloomParams::default().radius);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let config = RipplesConfig::load_or_default("/nonexistent/ripples.toml");
        assert_eq!(config.output.fps, 60.0);
    }

    #[test]
    fn test_pipeline_settings() {
        let config = ConfigBuilder::new()
            .damper(0.9)
            .laplacian(LaplacianSource::Convolution)
            .build()
            .unwrap();

        let settings = config.pipeline_settings();
        assert_eq!(settings.params.damper, 0.9);
        assert_eq!(settings.laplacian, LaplacianSource::Convolution);
        assert_eq!(settings.ranges, DisturbanceRanges::default());
        assert!(settings.clamp_courant);
    }
}
