//! Square thumbnail pipeline
//!
//! 1. Read the header for crop and target size, then decode the source once
//! 2. Render the whole image upright at display size (no scaling)
//! 3. Take the centred square of side `min(display_width, display_height)`
//! 4. Scale that square to the target size and encode as JPEG
//!
//! Cropping happens in corrected space, so the square is centred on what the
//! viewer sees, not on the stored sensor layout.

use crate::utils::error::{PipelineError, Result};
use crate::utils::file;
use std::path::Path;

use super::canvas::{Canvas, Rect};
use super::decoder::RawImage;
use super::encoder::{self, WHITE};
use super::resizer::ResizeFilter;

/// Thumbnail generation configuration
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Output edge length in pixels
    pub size: u32,

    /// JPEG quality (1-100)
    pub quality: u8,

    /// Allow enlarging sources whose short side is below `size`
    pub allow_upscale: bool,

    /// Colour behind transparent source pixels
    pub background_color: (u8, u8, u8),

    pub resize_filter: ResizeFilter,
}

impl Default for ThumbnailConfig {
    /// 300px square at quality 85, upscaling allowed, white background
    fn default() -> Self {
        Self {
            size: 300,
            quality: 85,
            allow_upscale: true,
            background_color: WHITE,
            resize_filter: ResizeFilter::Lanczos3,
        }
    }
}

/// Centred square crop of a display-space image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareCrop {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

impl SquareCrop {
    /// Offsets use integer (floor) division, so odd margins lean left/up
    pub fn centered(display_width: u32, display_height: u32) -> Self {
        let side = display_width.min(display_height);
        Self {
            x: (display_width - side) / 2,
            y: (display_height - side) / 2,
            side,
        }
    }

    fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.side, self.side)
    }
}

/// Edge length of the rendered thumbnail
pub fn target_size(side: u32, size: u32, allow_upscale: bool) -> u32 {
    if !allow_upscale && side < size {
        side
    } else {
        size
    }
}

/// Create a square JPEG thumbnail from encoded image bytes
///
/// # Errors
/// * `PipelineError::Argument` - `size` is zero or `quality` outside 1..=100
/// * `PipelineError::Decode` - the bytes are not a decodable image
pub fn create_thumbnail(image_data: &[u8], config: &ThumbnailConfig) -> Result<Vec<u8>> {
    thumbnail_raw_image(&RawImage::new(image_data), config)
}

/// Thumbnail engine over a [`RawImage`]
///
/// Crop and target size come from the header alone; pixels are decoded once.
pub fn thumbnail_raw_image(raw: &RawImage<'_>, config: &ThumbnailConfig) -> Result<Vec<u8>> {
    if config.size == 0 {
        return Err(PipelineError::Argument(
            "thumbnail size must be greater than zero".to_string(),
        ));
    }
    encoder::validate_quality(config.quality)?;

    let geometry = raw.info()?.geometry();
    let crop = SquareCrop::centered(geometry.display_width, geometry.display_height);
    let target = target_size(crop.side, config.size, config.allow_upscale);

    // Step 1: upright copy at display size
    let mut upright = Canvas::new(
        geometry.display_width,
        geometry.display_height,
        config.resize_filter,
    )?;
    let mut thumb = Canvas::new(target, target, config.resize_filter)?;
    let decoded = raw.decode()?;
    upright.apply_all(&geometry.correction());
    upright.draw_image(&decoded.pixels)?;
    let upright = upright.into_image();

    tracing::debug!(
        "Thumbnail: display {}x{} orientation={} crop {:?} -> {}x{}",
        geometry.display_width,
        geometry.display_height,
        geometry.orientation.exif_value(),
        crop,
        target,
        target
    );

    // Step 2: scale the centred square onto the output canvas
    thumb.draw_image_rect(&upright, crop.rect(), Rect::new(0, 0, target, target))?;

    let jpeg = encoder::encode_jpeg(
        thumb.pixels(),
        config.quality,
        config.background_color,
        decoded.icc_profile.as_deref(),
    )?;

    tracing::info!(
        "Created {}x{} thumbnail ({} bytes)",
        target,
        target,
        jpeg.len()
    );
    Ok(jpeg)
}

/// Convenience wrapper taking the individual parameters
///
/// # Arguments
/// * `image_data` - Encoded source image
/// * `size` - Output edge length in pixels
/// * `quality` - JPEG quality (1-100)
/// * `allow_upscale` - Whether sources smaller than `size` may be enlarged
///
/// # Returns
/// JPEG bytes of a `target x target` square, see [`target_size`]
pub fn create_thumbnail_with_size(
    image_data: &[u8],
    size: u32,
    quality: u8,
    allow_upscale: bool,
) -> Result<Vec<u8>> {
    let config = ThumbnailConfig {
        size,
        quality,
        allow_upscale,
        ..Default::default()
    };
    create_thumbnail(image_data, &config)
}

/// Create a square thumbnail and write the JPEG to disk
///
/// # Arguments
/// * `image_data` - Encoded source image (any supported container)
/// * `size` - Output edge length in pixels
/// * `output_path` - Destination file; parent directories are created
/// * `quality` - JPEG quality (1-100)
/// * `allow_upscale` - When false, a short side below `size` caps the output
///
/// # Returns
/// * `Ok(())` once the JPEG has been written, replacing any existing file
/// * `Err(PipelineError)` on invalid arguments, decode failure or I/O error
pub fn thumbnail_to_file(
    image_data: &[u8],
    size: u32,
    output_path: &Path,
    quality: u8,
    allow_upscale: bool,
) -> Result<()> {
    let jpeg = create_thumbnail_with_size(image_data, size, quality, allow_upscale)?;
    file::write_output(output_path, &jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_processor::decoder::tests::{jpeg_with_orientation, png_bytes};
    use image::{GenericImageView, Rgba, RgbaImage};

    fn decode(bytes: &[u8]) -> image::DynamicImage {
        image::load_from_memory(bytes).unwrap()
    }

    #[test]
    fn test_crop_is_centered() {
        assert_eq!(
            SquareCrop::centered(400, 200),
            SquareCrop { x: 100, y: 0, side: 200 }
        );
        assert_eq!(
            SquareCrop::centered(200, 400),
            SquareCrop { x: 0, y: 100, side: 200 }
        );
        assert_eq!(
            SquareCrop::centered(50, 50),
            SquareCrop { x: 0, y: 0, side: 50 }
        );
    }

    #[test]
    fn test_crop_odd_margin_floors() {
        // 301 - 200 = 101 -> 50, not 51
        assert_eq!(SquareCrop::centered(301, 200).x, 50);
        assert_eq!(SquareCrop::centered(200, 203).y, 1);
    }

    #[test]
    fn test_target_size_rules() {
        assert_eq!(target_size(200, 300, true), 300);
        assert_eq!(target_size(200, 300, false), 200);
        assert_eq!(target_size(500, 300, false), 300);
        assert_eq!(target_size(300, 300, false), 300);
    }

    #[test]
    fn test_config_default_values() {
        let config = ThumbnailConfig::default();
        assert_eq!(config.size, 300);
        assert_eq!(config.quality, 85);
        assert!(config.allow_upscale);
        assert_eq!(config.background_color, (255, 255, 255));
        assert_eq!(config.resize_filter, ResizeFilter::Lanczos3);
    }

    #[test]
    fn test_thumbnail_is_square() {
        let img = RgbaImage::from_pixel(400, 200, Rgba([120, 60, 30, 255]));
        let jpeg = create_thumbnail_with_size(&png_bytes(&img), 64, 85, true).unwrap();
        assert_eq!(decode(&jpeg).dimensions(), (64, 64));
    }

    #[test]
    fn test_thumbnail_upscale_policy() {
        let img = RgbaImage::from_pixel(40, 30, Rgba([120, 60, 30, 255]));
        let bytes = png_bytes(&img);

        let up = create_thumbnail_with_size(&bytes, 100, 85, true).unwrap();
        assert_eq!(decode(&up).dimensions(), (100, 100));

        let capped = create_thumbnail_with_size(&bytes, 100, 85, false).unwrap();
        assert_eq!(decode(&capped).dimensions(), (30, 30));
    }

    #[test]
    fn test_thumbnail_crops_center_of_landscape() {
        // Red | green | blue thirds of a 300x100 image; the centred square is all green
        let img = RgbaImage::from_fn(300, 100, |x, _| match x {
            0..=99 => Rgba([255, 0, 0, 255]),
            100..=199 => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        let jpeg = create_thumbnail_with_size(&png_bytes(&img), 100, 95, false).unwrap();
        let thumb = decode(&jpeg).to_rgb8();

        assert_eq!(thumb.dimensions(), (100, 100));
        let p = thumb.get_pixel(50, 50);
        assert!(p[1] > 200 && p[0] < 60 && p[2] < 60, "{:?}", p);
    }

    #[test]
    fn test_thumbnail_crops_in_display_space() {
        // Stored 300x100 with tag 6: displayed 100x300, so the crop is the
        // middle third of the stored *columns* turned upright
        let img = RgbaImage::from_fn(300, 100, |x, _| match x {
            0..=99 => Rgba([255, 0, 0, 255]),
            100..=199 => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        let bytes = jpeg_with_orientation(&img, 6);
        let jpeg = create_thumbnail_with_size(&bytes, 100, 95, false).unwrap();
        let thumb = decode(&jpeg).to_rgb8();

        assert_eq!(thumb.dimensions(), (100, 100));
        let p = thumb.get_pixel(50, 50);
        assert!(p[1] > 180 && p[0] < 80 && p[2] < 80, "{:?}", p);
    }

    #[test]
    fn test_thumbnail_transparent_source_on_white() {
        let img = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 0]));
        let jpeg = create_thumbnail_with_size(&png_bytes(&img), 20, 95, true).unwrap();
        let p = *decode(&jpeg).to_rgb8().get_pixel(10, 10);
        assert!(p.0.iter().all(|&c| c > 240), "{:?}", p);
    }

    #[test]
    fn test_thumbnail_invalid_input() {
        assert!(matches!(
            create_thumbnail_with_size(b"This is not an image", 100, 85, true),
            Err(PipelineError::Decode(_))
        ));
        assert!(matches!(
            create_thumbnail_with_size(&[], 100, 85, true),
            Err(PipelineError::Decode(_))
        ));
        let bytes = png_bytes(&RgbaImage::new(4, 4));
        assert!(matches!(
            create_thumbnail_with_size(&bytes, 0, 85, true),
            Err(PipelineError::Argument(_))
        ));
        assert!(matches!(
            create_thumbnail_with_size(&bytes, 10, 101, true),
            Err(PipelineError::Argument(_))
        ));
    }

    #[test]
    fn test_engine_reads_header_then_decodes() {
        let img = RgbaImage::from_pixel(30, 60, Rgba([40, 40, 40, 255]));
        let bytes = jpeg_with_orientation(&img, 8);
        let raw = RawImage::new(&bytes);

        let jpeg = thumbnail_raw_image(&raw, &ThumbnailConfig::default()).unwrap();
        assert!(raw.has_header());
        assert_eq!(raw.info().unwrap().orientation.exif_value(), 8);
        assert_eq!(decode(&jpeg).dimensions(), (300, 300));
    }

    #[test]
    fn test_zero_size_rejected_before_header_read() {
        let bytes = png_bytes(&RgbaImage::new(4, 4));
        let raw = RawImage::new(&bytes);
        let config = ThumbnailConfig {
            size: 0,
            ..Default::default()
        };
        assert!(matches!(
            thumbnail_raw_image(&raw, &config),
            Err(PipelineError::Argument(_))
        ));
        assert!(!raw.has_header());
    }

    #[test]
    fn test_thumbnail_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("abc.thumb");
        let img = RgbaImage::from_pixel(90, 60, Rgba([5, 5, 5, 255]));

        thumbnail_to_file(&png_bytes(&img), 32, &path, 85, true).unwrap();
        assert_eq!(decode(&std::fs::read(&path).unwrap()).dimensions(), (32, 32));
    }
}
