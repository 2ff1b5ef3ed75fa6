//! The shared, read-only target image.

use std::path::{Path, PathBuf};

use image::{ImageResult, RgbaImage};

/// Immutable target raster shared by every painting in a run.
///
/// Paintings hold it behind an `Arc`; it is loaded once and never copied per
/// individual.
#[derive(Debug, Clone)]
pub struct TargetImage {
    pixels: RgbaImage,
    source: Option<PathBuf>,
}

impl TargetImage {
    /// Wrap an in-memory image.
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            source: None,
        }
    }

    /// Decode an image file (RGB or RGBA) into an RGBA target.
    pub fn open<P: AsRef<Path>>(path: P) -> ImageResult<Self> {
        let path = path.as_ref();
        let pixels = image::open(path)?.to_rgba8();
        log::info!(
            "Loaded target {} ({}x{})",
            path.display(),
            pixels.width(),
            pixels.height()
        );
        Ok(Self {
            pixels,
            source: Some(path.to_path_buf()),
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// (width, height).
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// The decoded pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// File the image was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_open_converts_rgb_to_rgba() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("target.png");
        RgbImage::from_pixel(6, 4, Rgb([1, 2, 3])).save(&path).unwrap();

        let target = TargetImage::open(&path).unwrap();
        assert_eq!(target.dimensions(), (6, 4));
        assert_eq!(target.pixels().get_pixel(0, 0).0, [1, 2, 3, 255]);
        assert_eq!(target.source(), Some(path.as_path()));
    }

    #[test]
    fn test_in_memory_target_has_no_source() {
        let target = TargetImage::new(RgbaImage::new(3, 3));
        assert_eq!(target.width(), 3);
        assert!(target.source().is_none());
    }
}
