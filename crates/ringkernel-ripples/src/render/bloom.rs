//! Bloom: a blurred rendition of bright regions added on top of the base color.
//!
//! Two interchangeable strategies produce a blurred *height* buffer, which the
//! compositor then color-maps like the base field:
//!
//! - `CrossSample`: per-pixel weighted sum of the horizontal and vertical
//!   neighbors, normalized by the number of samples.
//! - `BlurredHighlights`: keep only heights above a threshold, then apply a
//!   separable Gaussian blur.

use crate::simulation::for_each_row;
use serde::{Deserialize, Serialize};

/// How the bloom buffer is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloomStrategy {
    /// Cross-pattern weighted neighbor sum.
    #[default]
    CrossSample,
    /// Highlight extraction followed by a separable Gaussian blur.
    BlurredHighlights,
}

impl std::fmt::Display for BloomStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BloomStrategy::CrossSample => f.pad("cross-sample"),
            BloomStrategy::BlurredHighlights => f.pad("blurred-highlights"),
        }
    }
}

/// Largest bloom radius in cells; larger values are clamped.
pub const MAX_BLOOM_RADIUS: u32 = 64;

/// Bloom tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloomParams {
    /// Strategy used to build the bloom buffer.
    #[serde(default)]
    pub strategy: BloomStrategy,
    /// Sample radius in cells.
    #[serde(default = "default_radius")]
    pub radius: u32,
    /// Gaussian falloff: weight = exp(-(offset / radius)² * falloff).
    #[serde(default = "default_falloff")]
    pub falloff: f32,
    /// Highlight threshold on `|h|` for `BlurredHighlights`.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Scale applied to the blurred height before color mapping.
    #[serde(default = "default_gain")]
    pub gain: f32,
    /// Scale applied to the bloom color before it is added to the base.
    #[serde(default = "default_strength")]
    pub strength: f32,
}

fn default_radius() -> u32 {
    4
}

fn default_falloff() -> f32 {
    10.0
}

fn default_threshold() -> f32 {
    0.1
}

fn default_gain() -> f32 {
    2.0
}

fn default_strength() -> f32 {
    0.6
}

impl Default for BloomParams {
    fn default() -> Self {
        Self {
            strategy: BloomStrategy::default(),
            radius: default_radius(),
            falloff: default_falloff(),
            threshold: default_threshold(),
            gain: default_gain(),
            strength: default_strength(),
        }
    }
}

impl BloomParams {
    /// Unnormalized weights for offsets `0..=radius`.
    fn weights(&self) -> Vec<f32> {
        let radius = self.radius.min(MAX_BLOOM_RADIUS);
        let r = radius.max(1) as f32;
        (0..=radius)
            .map(|o| {
                let t = o as f32 / r;
                (-(t * t) * self.falloff).exp()
            })
            .collect()
    }
}

/// Weights normalized so a full two-sided pass sums to one.
fn normalized(weights: &[f32]) -> Vec<f32> {
    let sum = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
    weights.iter().map(|w| w / sum).collect()
}

/// Bloom pass with scratch buffers reused across frames.
#[derive(Debug)]
pub struct Bloom {
    params: BloomParams,
    weights: Vec<f32>,
    /// `weights` normalized for the Gaussian passes.
    kernel: Vec<f32>,
    /// Highlights, then horizontally blurred highlights.
    scratch: Vec<f32>,
    /// Final blurred heights.
    output: Vec<f32>,
}

impl Default for Bloom {
    fn default() -> Self {
        Self::new(BloomParams::default())
    }
}

impl Bloom {
    pub fn new(params: BloomParams) -> Self {
        let weights = params.weights();
        Self {
            kernel: normalized(&weights),
            weights,
            params,
            scratch: Vec::new(),
            output: Vec::new(),
        }
    }

    pub fn params(&self) -> &BloomParams {
        &self.params
    }

    /// Replace the tuning; weights are recomputed.
    pub fn set_params(&mut self, params: BloomParams) {
        self.weights = params.weights();
        self.kernel = normalized(&self.weights);
        self.params = params;
    }

    /// Build the blurred height buffer for `field` (row-major `width * height`).
    ///
    /// Returns an empty slice when the dimensions do not match the input.
    pub fn compute(&mut self, field: &[f32], width: usize, height: usize) -> &[f32] {
        let len = width * height;
        if len == 0 || field.len() != len {
            self.output.clear();
            return &self.output;
        }
        self.output.resize(len, 0.0);
        self.scratch.resize(len, 0.0);

        match self.params.strategy {
            BloomStrategy::CrossSample => {
                cross_sample(field, &self.weights, width, height, &mut self.output)
            }
            BloomStrategy::BlurredHighlights => {
                let threshold = self.params.threshold;
                for (dst, &h) in self.scratch.iter_mut().zip(field) {
                    *dst = if h.abs() > threshold { h } else { 0.0 };
                }

                // Horizontal pass reads highlights, writes output; vertical pass
                // reads that back from scratch.
                blur_horizontal(&self.scratch, &self.kernel, width, height, &mut self.output);
                std::mem::swap(&mut self.scratch, &mut self.output);
                blur_vertical(&self.scratch, &self.kernel, width, height, &mut self.output);
            }
        }

        &self.output
    }
}

fn cross_sample(field: &[f32], weights: &[f32], width: usize, height: usize, out: &mut [f32]) {
    let radius = weights.len() - 1;
    let samples = (4 * radius + 1) as f32;

    for_each_row(out, width, height, |y, out_row| {
        for (x, dst) in out_row.iter_mut().enumerate() {
            let mut acc = weights[0] * field[y * width + x];
            for (o, &w) in weights.iter().enumerate().skip(1) {
                if x >= o {
                    acc += w * field[y * width + x - o];
                }
                if x + o < width {
                    acc += w * field[y * width + x + o];
                }
                if y >= o {
                    acc += w * field[(y - o) * width + x];
                }
                if y + o < height {
                    acc += w * field[(y + o) * width + x];
                }
            }
            *dst = acc / samples;
        }
    });
}

fn blur_horizontal(src: &[f32], kernel: &[f32], width: usize, height: usize, out: &mut [f32]) {
    for_each_row(out, width, height, |y, out_row| {
        let row = &src[y * width..(y + 1) * width];
        for (x, dst) in out_row.iter_mut().enumerate() {
            let mut acc = kernel[0] * row[x];
            for (o, &w) in kernel.iter().enumerate().skip(1) {
                if x >= o {
                    acc += w * row[x - o];
                }
                if x + o < width {
                    acc += w * row[x + o];
                }
            }
            *dst = acc;
        }
    });
}

fn blur_vertical(src: &[f32], kernel: &[f32], width: usize, height: usize, out: &mut [f32]) {
    for_each_row(out, width, height, |y, out_row| {
        for (x, dst) in out_row.iter_mut().enumerate() {
            let mut acc = kernel[0] * src[y * width + x];
            for (o, &w) in kernel.iter().enumerate().skip(1) {
                if y >= o {
                    acc += w * src[(y - o) * width + x];
                }
                if y + o < height {
                    acc += w * src[(y + o) * width + x];
                }
            }
            *dst = acc;
        }
    });
}
