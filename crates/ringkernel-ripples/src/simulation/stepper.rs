//! Explicit finite-difference stepper for the damped 2D wave equation.
//!
//! Uses the 2D wave equation: ∂²u/∂t² = c²∇²u
//!
//! Discretized in leapfrog form:
//! u[n+1] = damper * (m * (u_N + u_S + u_E + u_W - 4*u) + 2*u[n] - u[n-1])
//!
//! where `m = (c * dt / dx)²`. Cells outside the grid and blocked cells read
//! as zero (Dirichlet boundary).

use super::field::{StepBuffers, WaveField, BLOCKED};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Grids at least this wide or tall are processed with rayon.
///
/// Smaller grids are faster sequentially due to lower overhead.
pub const PARALLEL_THRESHOLD: usize = 512;

/// 3x3 discrete Laplacian kernel.
pub const LAPLACIAN_KERNEL: [[f32; 3]; 3] = [[0.0, 1.0, 0.0], [1.0, -4.0, 1.0], [0.0, 1.0, 0.0]];

/// Where the Laplacian term comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaplacianSource {
    /// Direct 5-point stencil fused with the update.
    #[default]
    Stencil,
    /// Generic zero-padded 3x3 convolution into a scratch buffer, then update.
    Convolution,
}

impl std::fmt::Display for LaplacianSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaplacianSource::Stencil => f.pad("stencil"),
            LaplacianSource::Convolution => f.pad("convolution"),
        }
    }
}

/// Advances a [`WaveField`] by one time step.
///
/// Only writes `next`; rotation is the caller's job.
#[derive(Debug, Default)]
pub struct Stepper {
    source: LaplacianSource,
    /// Laplacian scratch for the convolution path, reused across steps.
    laplacian: Vec<f32>,
}

impl Stepper {
    /// Create a stepper with the given Laplacian source.
    pub fn new(source: LaplacianSource) -> Self {
        Self {
            source,
            laplacian: Vec::new(),
        }
    }

    /// The active Laplacian source.
    pub fn source(&self) -> LaplacianSource {
        self.source
    }

    /// Switch the Laplacian source.
    pub fn set_source(&mut self, source: LaplacianSource) {
        self.source = source;
    }

    /// Compute `next` from `prev` and `curr`.
    ///
    /// No-op on an empty field.
    pub fn step(&mut self, field: &mut WaveField, multiplier: f32, damper: f32) {
        if field.is_empty() {
            return;
        }

        match self.source {
            LaplacianSource::Stencil => step_stencil(field.step_buffers(), multiplier, damper),
            LaplacianSource::Convolution => {
                let bufs = field.step_buffers();
                if self.laplacian.len() != bufs.curr.len() {
                    self.laplacian.resize(bufs.curr.len(), 0.0);
                }
                convolve3x3(
                    bufs.curr,
                    bufs.mask,
                    bufs.width,
                    bufs.height,
                    &LAPLACIAN_KERNEL,
                    &mut self.laplacian,
                );
                step_from_laplacian(bufs, &self.laplacian, multiplier, damper);
            }
        }
    }
}

#[inline(always)]
fn is_blocked(mask: Option<&[f32]>, idx: usize) -> bool {
    matches!(mask, Some(m) if m[idx] == BLOCKED)
}

#[inline(always)]
fn masked(curr: &[f32], mask: Option<&[f32]>, idx: usize) -> f32 {
    if is_blocked(mask, idx) {
        0.0
    } else {
        curr[idx]
    }
}

/// Run a row kernel over every row of `out`, in parallel for large grids.
pub(crate) fn for_each_row<F>(out: &mut [f32], width: usize, height: usize, kernel: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    if width == 0 || height == 0 {
        return;
    }
    if width >= PARALLEL_THRESHOLD || height >= PARALLEL_THRESHOLD {
        out.par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| kernel(y, row));
    } else {
        out.chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| kernel(y, row));
    }
}

fn step_stencil(bufs: StepBuffers<'_>, multiplier: f32, damper: f32) {
    let StepBuffers {
        width,
        height,
        prev,
        curr,
        next,
        mask,
    } = bufs;

    for_each_row(next, width, height, |y, next_row| {
        let row_start = y * width;
        for (x, out) in next_row.iter_mut().enumerate() {
            let idx = row_start + x;
            if is_blocked(mask, idx) {
                *out = 0.0;
                continue;
            }

            let u = curr[idx];
            let north = if y > 0 { masked(curr, mask, idx - width) } else { 0.0 };
            let south = if y + 1 < height { masked(curr, mask, idx + width) } else { 0.0 };
            let west = if x > 0 { masked(curr, mask, idx - 1) } else { 0.0 };
            let east = if x + 1 < width { masked(curr, mask, idx + 1) } else { 0.0 };

            let laplacian = north + south + east + west - 4.0 * u;
            *out = damper * (multiplier * laplacian + 2.0 * u - prev[idx]);
        }
    });
}

fn step_from_laplacian(bufs: StepBuffers<'_>, laplacian: &[f32], multiplier: f32, damper: f32) {
    let StepBuffers {
        width,
        height,
        prev,
        curr,
        next,
        mask,
    } = bufs;

    for_each_row(next, width, height, |y, next_row| {
        let row_start = y * width;
        for (x, out) in next_row.iter_mut().enumerate() {
            let idx = row_start + x;
            *out = if is_blocked(mask, idx) {
                0.0
            } else {
                damper * (multiplier * laplacian[idx] + 2.0 * curr[idx] - prev[idx])
            };
        }
    });
}

/// Zero-padded 3x3 convolution of `src` into `out`.
///
/// Blocked cells in `mask` read as zero, like cells beyond the edge.
pub fn convolve3x3(
    src: &[f32],
    mask: Option<&[f32]>,
    width: usize,
    height: usize,
    kernel: &[[f32; 3]; 3],
    out: &mut [f32],
) {
    for_each_row(out, width, height, |y, out_row| {
        for (x, out) in out_row.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (ky, kernel_row) in kernel.iter().enumerate() {
                let sy = y as isize + ky as isize - 1;
                if sy < 0 || sy >= height as isize {
                    continue;
                }
                for (kx, &weight) in kernel_row.iter().enumerate() {
                    let sx = x as isize + kx as isize - 1;
                    if weight == 0.0 || sx < 0 || sx >= width as isize {
                        continue;
                    }
                    let idx = sy as usize * width + sx as usize;
                    acc += weight * masked(src, mask, idx);
                }
            }
            *out = acc;
        }
    });
}
