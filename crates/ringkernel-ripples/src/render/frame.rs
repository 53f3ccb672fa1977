//! Transient per-frame output.

use crate::error::{Result, RipplesError};
use image::{ImageFormat, RgbaImage};
use std::path::Path;

/// One composited frame, borrowed from the pipeline's pixel buffer.
///
/// Valid until the next call that mutates the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    /// Width in pixels (one pixel per grid cell).
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Accumulated simulation time in seconds.
    pub elapsed: f64,
    /// Index of this frame since the last resize.
    pub index: u64,
    /// RGBA8 pixels, row-major.
    pub pixels: &'a [u8],
}

impl<'a> RenderFrame<'a> {
    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.pixels.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Copy into an owned image.
    pub fn to_image(&self) -> Result<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.to_vec()).ok_or_else(|| {
            RipplesError::allocation(format!(
                "{} bytes do not cover a {}x{} frame",
                self.pixels.len(),
                self.width,
                self.height
            ))
        })
    }

    /// Encode as PNG at `path`.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_image()?
            .save_with_format(path.as_ref(), ImageFormat::Png)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_lookup() {
        let pixels: Vec<u8> = (0..24).collect();
        let frame = RenderFrame {
            width: 3,
            height: 2,
            elapsed: 0.0,
            index: 0,
            pixels: &pixels,
        };

        assert_eq!(frame.pixel(0, 0), Some([0, 1, 2, 3]));
        assert_eq!(frame.pixel(2, 1), Some([20, 21, 22, 23]));
        assert_eq!(frame.pixel(3, 0), None);
    }

    #[test]
    fn test_to_image() {
        let pixels = vec![255u8; 16];
        let frame = RenderFrame {
            width: 2,
            height: 2,
            elapsed: 1.5,
            index: 3,
            pixels: &pixels,
        };

        let img = frame.to_image().unwrap();
        assert_eq!(img.dimensions(), (2, 2));

        let short = RenderFrame {
            pixels: &pixels[..8],
            ..frame
        };
        assert!(short.to_image().is_err());
    }
}
