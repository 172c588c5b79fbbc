use image::{DynamicImage, GenericImageView};

use crate::dimensions;

/// Image resample operations
pub struct ImageResample;

impl ImageResample {
    /// Output size for `img` under the requested width/height/aspect policy
    pub fn target_dimensions(
        img: &DynamicImage,
        width: u32,
        height: u32,
        lock_aspect: bool,
    ) -> (u32, u32) {
        let (orig_width, orig_height) = img.dimensions();
        dimensions::resolve(orig_width, orig_height, width, height, lock_aspect)
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> image::imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            image::imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            image::imageops::FilterType::CatmullRom
        } else {
            image::imageops::FilterType::Lanczos3
        }
    }

    /// Resample to exact dimensions. Returns `img` untouched when the size already matches.
    pub fn resample(img: DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        if (orig_width, orig_height) == (width, height) {
            return img;
        }
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }
}
