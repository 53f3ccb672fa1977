//! Rendering: color mapping, bloom and filmic tone mapping.

mod bloom;
mod color;
mod compositor;
mod frame;
mod tonemap;

pub use bloom::{Bloom, BloomParams, BloomStrategy, MAX_BLOOM_RADIUS};
pub use color::{height_to_color, smoothstep, Rgb, DEAD_ZONE, RESPONSE_EXPONENT};
pub use compositor::Compositor;
pub use frame::RenderFrame;
pub use tonemap::{filmic, tone_map, to_rgba8, BLACK_POINT};
