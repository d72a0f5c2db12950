//! Bounded-size JPEG normalization with orientation correction
//!
//! Scale math, high-quality resampling through `fast_image_resize`, and the
//! resize engine that ties decode, canvas rendering and JPEG encoding together.

use crate::utils::error::{PipelineError, Result};
use crate::utils::file;
use fast_image_resize as fr;
use fast_image_resize::images::Image;
use image::RgbaImage;
use std::path::Path;

use super::canvas::Canvas;
use super::decoder::RawImage;
use super::encoder::{self, WHITE};

/// Resampling filter used whenever a canvas draw changes size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeFilter {
    /// Bilinear; fastest, good for small ratios
    Triangle,

    /// Lanczos3; sharpest for photographic downscaling
    Lanczos3,
}

impl From<ResizeFilter> for fr::FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Triangle => fr::FilterType::Bilinear,
            ResizeFilter::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}

/// Resize engine settings
#[derive(Debug, Clone)]
pub struct ResizeConfig {
    /// Bounding box edge in pixels; neither output side exceeds it
    pub max_size: u32,

    /// JPEG quality (1-100)
    pub quality: u8,

    pub filter: ResizeFilter,

    /// Colour behind transparent source pixels (JPEG has no alpha)
    pub background_color: (u8, u8, u8),
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            max_size: 2048,
            quality: 85,
            filter: ResizeFilter::Lanczos3,
            background_color: WHITE,
        }
    }
}

/// Uniform scale that fits `width x height` inside `max_size`, never above 1.0
///
/// # Examples
/// ```
/// use stylematch::image_processor::resizer::{fit_scale, scaled_dimensions};
///
/// // Landscape 1000x500 into 256 -> 256x128
/// let scale = fit_scale(1000, 500, 256);
/// assert_eq!(scaled_dimensions(1000, 500, scale), (256, 128));
///
/// // Small images keep their size
/// assert_eq!(fit_scale(100, 100, 256), 1.0);
/// ```
pub fn fit_scale(width: u32, height: u32, max_size: u32) -> f32 {
    let sx = max_size as f32 / width as f32;
    let sy = max_size as f32 / height as f32;
    sx.min(sy).min(1.0)
}

/// Output dimensions for a display size scaled by `scale`
///
/// Each side is rounded half-to-even and floored at one pixel.
pub fn scaled_dimensions(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let w = (width as f32 * scale).round_ties_even() as u32;
    let h = (height as f32 * scale).round_ties_even() as u32;
    (w.max(1), h.max(1))
}

/// Resample `source` to exactly `target_width x target_height`
///
/// Alpha is premultiplied for the convolution and divided back afterwards.
pub fn resample(
    source: &RgbaImage,
    target_width: u32,
    target_height: u32,
    filter: ResizeFilter,
) -> Result<RgbaImage> {
    let (src_width, src_height) = source.dimensions();

    if target_width == 0 || target_height == 0 {
        return Err(PipelineError::Argument(
            "Target dimensions must be greater than zero".to_string(),
        ));
    }

    if (src_width, src_height) == (target_width, target_height) {
        return Ok(source.clone());
    }

    let src_view = Image::from_vec_u8(
        src_width,
        src_height,
        source.as_raw().to_vec(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| PipelineError::Argument(format!("Failed to create source view: {}", e)))?;

    let mut dst_image = Image::new(target_width, target_height, fr::PixelType::U8x4);

    fr::Resizer::new()
        .resize(
            &src_view,
            &mut dst_image,
            &fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(filter.into())),
        )
        .map_err(|e| PipelineError::Argument(format!("Resize operation failed: {}", e)))?;

    RgbaImage::from_raw(target_width, target_height, dst_image.into_vec()).ok_or_else(|| {
        PipelineError::Argument("Resampled buffer does not match target size".to_string())
    })
}

/// Normalize an arbitrary photo into an upright JPEG within `max_size`
///
/// # Arguments
/// * `image_data` - Encoded source image (any supported container)
/// * `max_size` - Bounding box edge in pixels; smaller images are not enlarged
/// * `quality` - JPEG quality (1-100)
///
/// # Errors
/// * `PipelineError::Argument` - `max_size` is zero or `quality` outside 1..=100
/// * `PipelineError::Decode` - the bytes are not a decodable image
pub fn resize_to_jpeg(image_data: &[u8], max_size: u32, quality: u8) -> Result<Vec<u8>> {
    let config = ResizeConfig {
        max_size,
        quality,
        ..Default::default()
    };
    resize_with_config(image_data, &config)
}

/// [`resize_to_jpeg`] with full control over filter and background
pub fn resize_with_config(image_data: &[u8], config: &ResizeConfig) -> Result<Vec<u8>> {
    resize_raw_image(&RawImage::new(image_data), config)
}

/// Resize engine over a [`RawImage`]
///
/// Arguments and target geometry are settled from the header alone; the
/// pixels are decoded once, only after the output canvas exists.
pub fn resize_raw_image(raw: &RawImage<'_>, config: &ResizeConfig) -> Result<Vec<u8>> {
    if config.max_size == 0 {
        return Err(PipelineError::Argument(
            "max_size must be greater than zero".to_string(),
        ));
    }
    encoder::validate_quality(config.quality)?;

    let geometry = raw.info()?.geometry();

    let scale = fit_scale(
        geometry.display_width,
        geometry.display_height,
        config.max_size,
    );
    let (target_width, target_height) =
        scaled_dimensions(geometry.display_width, geometry.display_height, scale);

    tracing::debug!(
        "Resize: raw {}x{} display {}x{} orientation={} scale={} -> {}x{}",
        geometry.encoded_width,
        geometry.encoded_height,
        geometry.display_width,
        geometry.display_height,
        geometry.orientation.exif_value(),
        scale,
        target_width,
        target_height
    );

    // The scale must wrap the orientation correction: the correction offsets
    // are in raw pixel units and get scaled along with the image.
    let mut canvas = Canvas::new(target_width, target_height, config.filter)?;
    let decoded = raw.decode()?;
    canvas.scale(scale, scale);
    canvas.apply_all(&geometry.correction());
    canvas.draw_image(&decoded.pixels)?;

    let jpeg = encoder::encode_jpeg(
        canvas.pixels(),
        config.quality,
        config.background_color,
        decoded.icc_profile.as_deref(),
    )?;

    tracing::info!(
        "Resized {}x{} image to {}x{} JPEG ({} bytes)",
        geometry.display_width,
        geometry.display_height,
        target_width,
        target_height,
        jpeg.len()
    );
    Ok(jpeg)
}

/// Resize an image and write the JPEG to disk
///
/// # Arguments
/// * `image_data` - Encoded source image (any supported container)
/// * `max_size` - Bounding box edge in pixels
/// * `output_path` - Destination file; parent directories are created
/// * `quality` - JPEG quality (1-100)
///
/// # Returns
/// * `Ok(())` once the JPEG has been written, replacing any existing file
/// * `Err(PipelineError)` on invalid arguments, decode failure or I/O error
pub fn resize_to_file(
    image_data: &[u8],
    max_size: u32,
    output_path: &Path,
    quality: u8,
) -> Result<()> {
    let jpeg = resize_to_jpeg(image_data, max_size, quality)?;
    file::write_output(output_path, &jpeg)
}
