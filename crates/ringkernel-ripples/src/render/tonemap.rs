//! Filmic tone mapping for display.
//!
//! Rational curve `x(Ax + B) / (x(Ax + C) + D)` after a small black-point
//! offset. The curve bakes in a display gamma, so its output goes straight to
//! 8-bit channels.

use super::color::Rgb;

/// Subtracted before the curve (clamped at zero).
pub const BLACK_POINT: f32 = 0.004;

const A: f32 = 6.2;
const B: f32 = 0.5;
const C: f32 = 1.7;
const D: f32 = 0.06;

/// Map one linear channel into `[0, 1)`.
#[inline]
pub fn filmic(x: f32) -> f32 {
    let x = (x - BLACK_POINT).max(0.0);
    (x * (A * x + B)) / (x * (A * x + C) + D)
}

/// Tone map a linear RGB color.
#[inline]
pub fn tone_map(c: Rgb) -> Rgb {
    [filmic(c[0]), filmic(c[1]), filmic(c[2])]
}

/// Quantize a display color to RGBA8 with opaque alpha.
#[inline]
pub fn to_rgba8(c: Rgb) -> [u8; 4] {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
    [q(c[0]), q(c[1]), q(c[2]), 255]
}
