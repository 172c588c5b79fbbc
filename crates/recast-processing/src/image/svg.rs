//! SVG rasterization via resvg.

use std::sync::{Arc, OnceLock};

use image::{DynamicImage, RgbaImage};
use recast_core::ConversionError;

use crate::dimensions;

/// Parses SVG documents and renders them at a resolved pixel size.
pub struct SvgRasterizer {
    fallback_size: (u32, u32),
    fontdb: OnceLock<Arc<usvg::fontdb::Database>>,
}

impl SvgRasterizer {
    pub fn new(fallback_width: u32, fallback_height: u32) -> Self {
        Self {
            fallback_size: (fallback_width.max(1), fallback_height.max(1)),
            fontdb: OnceLock::new(),
        }
    }

    /// System fonts are loaded on the first SVG and kept for later ones.
    fn fontdb(&self) -> Arc<usvg::fontdb::Database> {
        self.fontdb
            .get_or_init(|| {
                let mut db = usvg::fontdb::Database::new();
                db.load_system_fonts();
                Arc::new(db)
            })
            .clone()
    }

    pub fn parse(&self, data: &[u8]) -> Result<usvg::Tree, ConversionError> {
        let opts = usvg::Options {
            fontdb: self.fontdb(),
            ..Default::default()
        };
        usvg::Tree::from_data(data, &opts)
            .map_err(|e| ConversionError::Decode(format!("Invalid SVG: {}", e)))
    }

    /// Intrinsic size in pixels, or the fallback when the document declares none usable.
    pub fn intrinsic_size(&self, tree: &usvg::Tree) -> (u32, u32) {
        let size = tree.size();
        let (w, h) = (size.width(), size.height());
        if w.is_finite() && h.is_finite() && w >= 1.0 && h >= 1.0 {
            (w.round() as u32, h.round() as u32)
        } else {
            self.fallback_size
        }
    }

    /// Parse and render at the size the resolver picks for the requested dimensions.
    pub fn rasterize(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        lock_aspect: bool,
    ) -> Result<DynamicImage, ConversionError> {
        let tree = self.parse(data)?;
        let (source_w, source_h) = self.intrinsic_size(&tree);
        let (out_w, out_h) = dimensions::resolve(source_w, source_h, width, height, lock_aspect);
        render(&tree, out_w, out_h)
    }
}

fn render(tree: &usvg::Tree, width: u32, height: u32) -> Result<DynamicImage, ConversionError> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        ConversionError::Internal(format!("Failed to allocate {}x{} SVG pixmap", width, height))
    })?;

    let size = tree.size();
    let sx = width as f32 / size.width().max(f32::EPSILON);
    let sy = height as f32 / size.height().max(f32::EPSILON);
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; image expects straight alpha.
    let mut rgba = Vec::with_capacity((width as usize) * (height as usize) * 4);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    RgbaImage::from_raw(width, height, rgba)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| ConversionError::Internal("SVG raster buffer size mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    const SQUARE: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100">
        <rect x="0" y="0" width="200" height="100" fill="#ff0000"/>
    </svg>"##;

    #[test]
    fn test_rasterize_intrinsic_size() {
        let raster = SvgRasterizer::new(800, 600);
        let img = raster.rasterize(SQUARE, 0, 0, true).unwrap();
        assert_eq!(img.dimensions(), (200, 100));
        let px = img.to_rgba8().get_pixel(100, 50).0;
        assert_eq!(px, [255, 0, 0, 255]);
    }

    #[test]
    fn test_rasterize_at_resolved_size() {
        let raster = SvgRasterizer::new(800, 600);
        let img = raster.rasterize(SQUARE, 50, 0, true).unwrap();
        assert_eq!(img.dimensions(), (50, 25));
    }

    #[test]
    fn test_invalid_svg_is_decode_failure() {
        let raster = SvgRasterizer::new(800, 600);
        let err = raster.rasterize(b"<svg", 0, 0, true).unwrap_err();
        assert!(matches!(err, ConversionError::Decode(_)));
    }
}
