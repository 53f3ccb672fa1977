//! Compositing: base color + bloom, tone mapped to RGBA8.

use super::bloom::{Bloom, BloomParams};
use super::color::{add, height_to_color, scale};
use super::tonemap::{tone_map, to_rgba8};
use crate::simulation::PARALLEL_THRESHOLD;
use rayon::prelude::*;

/// Turns a height field into display pixels. Only reads the field.
#[derive(Debug, Default)]
pub struct Compositor {
    bloom: Bloom,
    /// RGBA8, row-major, reused across frames.
    pixels: Vec<u8>,
}

impl Compositor {
    pub fn new(params: BloomParams) -> Self {
        Self {
            bloom: Bloom::new(params),
            pixels: Vec::new(),
        }
    }

    pub fn bloom_params(&self) -> &BloomParams {
        self.bloom.params()
    }

    pub fn set_bloom_params(&mut self, params: BloomParams) {
        self.bloom.set_params(params);
    }

    /// Last composited pixels.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Composite `heights` into the pixel buffer.
    ///
    /// Returns `None` if the input does not match `width * height` or the
    /// pixel buffer cannot be allocated.
    pub fn composite(&mut self, heights: &[f32], width: usize, height: usize) -> Option<&[u8]> {
        let cells = width.checked_mul(height)?;
        if cells == 0 || heights.len() != cells {
            return None;
        }

        let bytes = cells.checked_mul(4)?;
        if self.pixels.len() != bytes {
            self.pixels.clear();
            if let Err(e) = self.pixels.try_reserve_exact(bytes) {
                tracing::error!("Failed to allocate {}x{} frame: {}", width, height, e);
                return None;
            }
            self.pixels.resize(bytes, 0);
        }

        let params = *self.bloom.params();
        let bloom = self.bloom.compute(heights, width, height);
        if bloom.len() != cells {
            return None;
        }

        let shade_row = |y: usize, row: &mut [u8]| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let i = y * width + x;
                let base = height_to_color(heights[i]);
                let glow = scale(height_to_color(bloom[i] * params.gain), params.strength);
                px.copy_from_slice(&to_rgba8(tone_map(add(base, glow))));
            }
        };

        if width >= PARALLEL_THRESHOLD || height >= PARALLEL_THRESHOLD {
            self.pixels
                .par_chunks_mut(width * 4)
                .enumerate()
                .for_each(|(y, row)| shade_row(y, row));
        } else {
            self.pixels
                .chunks_mut(width * 4)
                .enumerate()
                .for_each(|(y, row)| shade_row(y, row));
        }

        Some(&self.pixels)
    }
}
