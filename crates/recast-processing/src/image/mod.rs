//! Image family: decode, resample, encode and optional recompression.

pub mod resample;
pub mod svg;
pub mod transcoder;

pub use resample::ImageResample;
pub use svg::SvgRasterizer;
pub use transcoder::{ImageTarget, ImageTranscoder};
