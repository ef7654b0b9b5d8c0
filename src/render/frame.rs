//! Preview pixel buffer

use std::path::Path;

use image::{DynamicImage, Rgb, Rgb32FImage};

use crate::core::types::{Color, Result};

/// Color buffer addressed in viewport coordinates (origin bottom-left).
///
/// Backed by an `image` buffer stored top row first, so rows are flipped on
/// access.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    image: Rgb32FImage,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: Rgb32FImage::new(width, height) }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Set every pixel to `color`
    pub fn fill(&mut self, color: Color) {
        for p in self.image.pixels_mut() {
            *p = Rgb(color.to_array());
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        let Rgb(c) = *self.image.get_pixel(x, self.height() - 1 - y);
        Color::from_array(c)
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let row = self.height() - 1 - y;
        self.image.put_pixel(x, row, Rgb(color.to_array()));
    }

    pub fn as_image(&self) -> &Rgb32FImage {
        &self.image
    }

    /// Save as 8-bit PNG (or any format `image` infers from the extension)
    pub fn save_png(&self, path: &Path) -> Result<()> {
        DynamicImage::ImageRgb32F(self.image.clone()).to_rgb8().save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_set_flips_rows() {
        let mut fb = FrameBuffer::new(4, 3);
        fb.set(1, 0, Color::X);
        assert_eq!(fb.get(1, 0), Color::X);
        assert_eq!(fb.as_image().get_pixel(1, 2).0, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_fill() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.fill(Color::splat(0.5));
        assert_eq!(fb.get(1, 1), Color::splat(0.5));
    }

    #[test]
    fn test_save_png() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("preview.png");
        let mut fb = FrameBuffer::new(8, 8);
        fb.fill(Color::new(0.2, 0.4, 0.6));
        fb.save_png(&path).expect("save failed");
        let loaded = image::open(&path).expect("open failed").to_rgb8();
        assert_eq!(loaded.dimensions(), (8, 8));
    }
}
