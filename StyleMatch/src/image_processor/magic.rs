//! Container detection from signature bytes
//!
//! Used to reject non-image buffers before handing them to a codec, to label
//! decode failures with what the bytes looked like, and to report the format
//! of images returned by the generation endpoint.
//!
//! ## Signatures
//!
//! - **JPEG**: `FF D8 FF`
//! - **PNG**: `89 50 4E 47 0D 0A 1A 0A`
//! - **GIF**: `47 49 46 38`
//! - **BMP**: `42 4D`
//! - **TIFF**: `49 49 2A 00` or `4D 4D 00 2A`
//! - **ICO**: `00 00 01 00`
//! - **WebP**: `RIFF....WEBP`
//! - **AVIF**: `ftyp` box with an `avif`/`avis` brand

use crate::utils::error::{PipelineError, Result};

/// Image container recognised by its leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Ico,
    WebP,
    Avif,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::Bmp => "BMP",
            Self::Tiff => "TIFF",
            Self::Ico => "ICO",
            Self::WebP => "WebP",
            Self::Avif => "AVIF",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Ico => "image/x-icon",
            Self::WebP => "image/webp",
            Self::Avif => "image/avif",
        }
    }
}

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Only the first few KB are inspected when walking ISO-BMFF boxes.
const BOX_SCAN_LIMIT: usize = 4096;

/// Detect the container format of `data`
///
/// # Errors
/// * `PipelineError::Decode` - empty, truncated, or unrecognised data
pub fn detect_image_format(data: &[u8]) -> Result<ImageFormat> {
    const MIN_BYTES: usize = 4;
    if data.len() < MIN_BYTES {
        return Err(PipelineError::Decode(format!(
            "Insufficient data for format detection (need {} bytes, got {})",
            MIN_BYTES,
            data.len()
        )));
    }

    let format = if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if data.starts_with(PNG_SIGNATURE) {
        Some(ImageFormat::Png)
    } else if data.starts_with(b"GIF8") {
        Some(ImageFormat::Gif)
    } else if data.starts_with(b"BM") {
        Some(ImageFormat::Bmp)
    } else if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        Some(ImageFormat::Tiff)
    } else if data.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        Some(ImageFormat::Ico)
    } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        Some(ImageFormat::WebP)
    } else if has_avif_brand(data) {
        Some(ImageFormat::Avif)
    } else {
        None
    };

    format.ok_or_else(|| {
        PipelineError::Decode(format!(
            "Unrecognized image format (first 16 bytes: {:02X?})",
            &data[..data.len().min(16)]
        ))
    })
}

/// Walk top-level ISO-BMFF boxes looking for an `ftyp` that lists an AVIF brand
fn has_avif_brand(data: &[u8]) -> bool {
    let is_avif = |brand: &[u8]| brand == b"avif" || brand == b"avis";
    let limit = data.len().min(BOX_SCAN_LIMIT);
    let mut cursor = 0usize;

    while cursor + 8 <= limit {
        let size = u32::from_be_bytes([
            data[cursor],
            data[cursor + 1],
            data[cursor + 2],
            data[cursor + 3],
        ]) as usize;
        let box_type = &data[cursor + 4..cursor + 8];

        let (header, end) = match size {
            1 => {
                if cursor + 16 > limit {
                    return false;
                }
                let mut large = [0u8; 8];
                large.copy_from_slice(&data[cursor + 8..cursor + 16]);
                let large = u64::from_be_bytes(large) as usize;
                if large < 16 {
                    return false;
                }
                (16, cursor.saturating_add(large))
            }
            // size 0 means "to end of file"
            0 => (8, limit),
            s if s < 8 => return false,
            s => (8, cursor.saturating_add(s)),
        };
        let end = end.min(limit);

        if box_type == b"ftyp" {
            let body = &data[(cursor + header).min(end)..end];
            // major brand, minor version, then compatible brands
            return body.get(..4).is_some_and(is_avif)
                || body.get(8..).is_some_and(|compat| compat.chunks_exact(4).any(is_avif));
        }

        if end <= cursor {
            return false;
        }
        cursor = end;
    }

    false
}
