//! Diverging color map for wave heights.
//!
//! - Positive heights: deep blue -> cyan -> white
//! - Negative heights: deep magenta -> hot pink -> white
//! - Near-zero heights: black

/// Linear RGB triple.
pub type Rgb = [f32; 3];

/// Heights with smaller magnitude map to black.
pub const DEAD_ZONE: f32 = 0.025;

/// Sub-linear response exponent applied to `|h|`.
pub const RESPONSE_EXPONENT: f32 = 0.75;

pub const BLACK: Rgb = [0.0, 0.0, 0.0];
const WHITE: Rgb = [1.0, 1.0, 1.0];

const CREST_DEEP: Rgb = [0.0, 0.05, 0.35];
const CREST_MID: Rgb = [0.0, 0.75, 1.0];

const TROUGH_DEEP: Rgb = [0.35, 0.0, 0.3];
const TROUGH_MID: Rgb = [1.0, 0.25, 0.6];

/// Hermite smoothstep between `edge0` and `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn mix(a: Rgb, b: Rgb, t: f32) -> Rgb {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

#[inline]
pub(crate) fn scale(c: Rgb, s: f32) -> Rgb {
    [c[0] * s, c[1] * s, c[2] * s]
}

#[inline]
pub(crate) fn add(a: Rgb, b: Rgb) -> Rgb {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// Map a scalar height to a base color.
pub fn height_to_color(h: f32) -> Rgb {
    let abs_h = h.abs();
    if !abs_h.is_finite() || abs_h < DEAD_ZONE {
        return BLACK;
    }

    let intensity = abs_h.powf(RESPONSE_EXPONENT);
    let t = intensity.min(1.0);

    let (deep, mid) = if h > 0.0 {
        (CREST_DEEP, CREST_MID)
    } else {
        (TROUGH_DEEP, TROUGH_MID)
    };

    let color = mix(mix(deep, mid, smoothstep(0.0, 0.5, t)), WHITE, smoothstep(0.5, 1.0, t));
    scale(color, intensity)
}
