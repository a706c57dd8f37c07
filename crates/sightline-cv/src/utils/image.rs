//! Image loading, resizing and saving helpers

use crate::Result;
use anyhow::{Context, bail};
use image::{RgbImage, imageops::FilterType};
use std::fs;
use std::path::Path;

/// Image utility functions
pub struct ImageUtils;

impl ImageUtils {
    /// Load image as 8-bit RGB
    pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
        let image = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?
            .to_rgb8();

        if image.width() == 0 || image.height() == 0 {
            bail!("Image {:?} is empty", path.as_ref());
        }
        Ok(image)
    }

    /// Resize to the model input resolution. Matching images are returned as is.
    pub fn fit_to_input(image: RgbImage, width: u32, height: u32) -> RgbImage {
        if image.dimensions() == (width, height) {
            return image;
        }
        image::imageops::resize(&image, width, height, FilterType::Triangle)
    }

    /// Save image, creating parent directories as needed
    pub fn save_rgb<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        image
            .save(path)
            .with_context(|| format!("Failed to save image: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_to_input() {
        let image = RgbImage::new(100, 50);
        let resized = ImageUtils::fit_to_input(image, 64, 64);
        assert_eq!(resized.dimensions(), (64, 64));
    }

    #[test]
    fn test_save_and_load_roundtrip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested/frame.png");

        let mut image = RgbImage::new(8, 4);
        image.put_pixel(3, 2, image::Rgb([255, 0, 0]));
        ImageUtils::save_rgb(&image, &path)?;

        let loaded = ImageUtils::load_rgb(&path)?;
        assert_eq!(loaded.dimensions(), (8, 4));
        assert_eq!(loaded.get_pixel(3, 2), &image::Rgb([255, 0, 0]));
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        assert!(ImageUtils::load_rgb("does/not/exist.png").is_err());
    }
}
