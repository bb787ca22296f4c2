use image::DynamicImage;

use crate::color::Rgba;

#[derive(Debug, thiserror::Error)]
pub enum SourceImageError {
    #[error("pixel buffer is {got} bytes but {width}x{height} RGBA needs {expected}")]
    SizeMismatch { width: u32, height: u32, got: usize, expected: usize },
}

/// Decoded RGBA8 source image, immutable once loaded.
#[derive(Clone, Debug)]
pub struct SourceImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl SourceImage {
    /// Take ownership of a row-major RGBA8 buffer, validating its length
    /// against the stated dimensions.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, SourceImageError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(SourceImageError::SizeMismatch {
                width,
                height,
                got: pixels.len(),
                expected,
            });
        }
        Ok(Self { width, height, pixels })
    }

    /// Adapt an already-decoded image into the engine's source buffer.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        Self { width, height, pixels: rgba.into_raw() }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest-neighbor read. Coordinates outside `[0, width) x [0, height)`
    /// are fully transparent black; in-bounds coordinates snap to the
    /// nearest pixel, with the half-pixel overshoot at the far edges
    /// clamped onto the last row/column.
    pub fn sample(&self, x: f32, y: f32) -> Rgba {
        if x < 0.0 || y < 0.0 || x >= self.width as f32 || y >= self.height as f32 {
            return Rgba::TRANSPARENT;
        }
        let nearest_x = (x.round() as usize).min(self.width as usize - 1);
        let nearest_y = (y.round() as usize).min(self.height as usize - 1);
        let i = (nearest_y * self.width as usize + nearest_x) * 4;
        Rgba::from_rgba8([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_one() -> SourceImage {
        // Left pixel red, right pixel green, both opaque.
        SourceImage::from_rgba8(2, 1, vec![255, 0, 0, 255, 0, 255, 0, 255]).unwrap()
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let result = SourceImage::from_rgba8(2, 2, vec![0u8; 15]);
        assert!(matches!(
            result,
            Err(SourceImageError::SizeMismatch { expected: 16, got: 15, .. })
        ));
    }

    #[test]
    fn sample_rounds_to_nearest() {
        let image = two_by_one();
        assert_eq!(image.sample(0.2, 0.0).to_rgb8(), [255, 0, 0]);
        assert_eq!(image.sample(0.8, 0.0).to_rgb8(), [0, 255, 0]);
    }

    #[test]
    fn sample_outside_is_transparent() {
        let image = two_by_one();
        assert_eq!(image.sample(-0.6, 0.0), Rgba::TRANSPARENT);
        assert_eq!(image.sample(2.0, 0.0), Rgba::TRANSPARENT);
        assert_eq!(image.sample(0.0, 1.0), Rgba::TRANSPARENT);
    }

    #[test]
    fn far_edge_snaps_to_last_pixel() {
        let image = two_by_one();
        // 1.9 is inside the image but rounds past the last column.
        assert_eq!(image.sample(1.9, 0.0).to_rgb8(), [0, 255, 0]);
        assert_eq!(image.sample(0.0, 0.9).to_rgb8(), [255, 0, 0]);
    }
}
