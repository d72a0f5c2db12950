//! JPEG and PNG encoding of rendered canvases
//!
//! JPEG output is lossy and opaque: the RGBA canvas is flattened onto a solid
//! background first. PNG output is lossless and keeps the alpha channel.
//! When the source carried an ICC profile it is embedded unchanged.

use crate::utils::error::{PipelineError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};

/// Opaque white, the default JPEG background
pub const WHITE: (u8, u8, u8) = (255, 255, 255);

/// Reject JPEG qualities outside 1..=100
pub fn validate_quality(quality: u8) -> Result<()> {
    if (1..=100).contains(&quality) {
        Ok(())
    } else {
        Err(PipelineError::Argument(format!(
            "JPEG quality must be within 1..=100 (got {})",
            quality
        )))
    }
}

/// Encode `rgba` as a baseline JPEG at `quality`
///
/// Transparent areas are blended onto `background`.
pub fn encode_jpeg(
    rgba: &RgbaImage,
    quality: u8,
    background: (u8, u8, u8),
    icc_profile: Option<&[u8]>,
) -> Result<Vec<u8>> {
    validate_quality(quality)?;

    let rgb = flatten(rgba, background);
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    attach_icc(&mut encoder, icc_profile);
    encoder
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| PipelineError::Encode(format!("JPEG encoding failed: {}", e)))?;

    tracing::debug!(
        "Encoded {}x{} JPEG (q={}): {} bytes",
        rgb.width(),
        rgb.height(),
        quality,
        out.len()
    );
    Ok(out)
}

/// Encode `rgba` losslessly as PNG, alpha preserved
pub fn encode_png(rgba: &RgbaImage, icc_profile: Option<&[u8]>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut encoder = PngEncoder::new(&mut out);
    attach_icc(&mut encoder, icc_profile);
    encoder
        .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
        .map_err(|e| PipelineError::Encode(format!("PNG encoding failed: {}", e)))?;

    tracing::debug!(
        "Encoded {}x{} PNG: {} bytes",
        rgba.width(),
        rgba.height(),
        out.len()
    );
    Ok(out)
}

fn attach_icc<E: ImageEncoder>(encoder: &mut E, icc_profile: Option<&[u8]>) {
    if let Some(icc) = icc_profile {
        if let Err(e) = encoder.set_icc_profile(icc.to_vec()) {
            tracing::debug!("ICC profile not embedded: {}", e);
        }
    }
}

/// Composite every pixel over an opaque background colour
///
/// ```text
/// out = pixel * alpha + background * (1 - alpha)
/// ```
fn flatten(rgba: &RgbaImage, bg: (u8, u8, u8)) -> RgbImage {
    let bg = [bg.0, bg.1, bg.2];
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let alpha = p[3] as u32;
        let mut out = [0u8; 3];
        for c in 0..3 {
            let blended = p[c] as u32 * alpha + bg[c] as u32 * (255 - alpha);
            // rounded division by 255
            out[c] = ((blended + 127) / 255) as u8;
        }
        image::Rgb(out)
    })
}
