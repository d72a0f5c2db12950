//! Header reading and single-pass decoding of encoded image bytes
//!
//! [`read_header`] reads only container headers and EXIF: it never decodes pixel
//! data. [`decode_image`] runs the codec once, capturing dimensions, colour
//! type and ICC profile from the same decoder before pulling the pixels.
//! Neither applies the EXIF orientation; callers correct it on a canvas.

use crate::utils::error::{PipelineError, Result};
use image::{ColorType, DynamicImage, ImageDecoder, ImageReader, RgbaImage};
use once_cell::unsync::OnceCell;
use std::io::Cursor;

use super::magic::{self, ImageFormat};
use super::orientation::{Geometry, OrientationTag};

/// Header-level facts about an encoded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub orientation: OrientationTag,
    pub color_type: ColorType,
}

impl ImageInfo {
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.width, self.height, self.orientation)
    }

    pub fn has_alpha(&self) -> bool {
        self.color_type.has_alpha()
    }
}

/// Pixels of a decoded image in stored (uncorrected) order
pub struct DecodedImage {
    pub info: ImageInfo,
    pub pixels: RgbaImage,
    pub icc_profile: Option<Vec<u8>>,
}

/// Encoded bytes plus metadata derived on first use
///
/// Borrowed for the duration of one operation; nothing outlives it.
pub struct RawImage<'a> {
    data: &'a [u8],
    info: OnceCell<ImageInfo>,
}

impl<'a> RawImage<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            info: OnceCell::new(),
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Whether header metadata is cached (read directly or learned from a decode)
    pub fn has_header(&self) -> bool {
        self.info.get().is_some()
    }

    /// Header metadata, read once and cached
    pub fn info(&self) -> Result<&ImageInfo> {
        self.info.get_or_try_init(|| read_header(self.data))
    }

    /// Decode pixels, reusing cached header metadata when present
    pub fn decode(&self) -> Result<DecodedImage> {
        let decoded = decode_with(self.data, self.info.get().cloned())?;
        let _ = self.info.set(decoded.info.clone());
        Ok(decoded)
    }
}

/// Read format, dimensions, colour type and orientation without decoding pixels
///
/// # Errors
/// * `PipelineError::Decode` - not a recognised image container, or corrupt header
pub fn read_header(data: &[u8]) -> Result<ImageInfo> {
    let format = magic::detect_image_format(data)?;
    let decoder = open_decoder(data, format)?;
    let (width, height) = decoder.dimensions();

    let info = ImageInfo {
        format,
        width,
        height,
        orientation: read_orientation(data),
        color_type: decoder.color_type(),
    };
    tracing::debug!(
        "Header {} {}x{} orientation={} color={:?}",
        format.as_str(),
        width,
        height,
        info.orientation.exif_value(),
        info.color_type
    );
    Ok(info)
}

/// Decode `data` into RGBA pixels with its metadata
///
/// # Errors
/// * `PipelineError::Decode` - unrecognised container or codec failure
pub fn decode_image(data: &[u8]) -> Result<DecodedImage> {
    decode_with(data, None)
}

fn decode_with(data: &[u8], known: Option<ImageInfo>) -> Result<DecodedImage> {
    let format = match &known {
        Some(info) => info.format,
        None => magic::detect_image_format(data)?,
    };
    let mut decoder = open_decoder(data, format)?;

    let info = match known {
        Some(info) => info,
        None => {
            let (width, height) = decoder.dimensions();
            ImageInfo {
                format,
                width,
                height,
                orientation: read_orientation(data),
                color_type: decoder.color_type(),
            }
        }
    };

    let icc_profile = decoder.icc_profile().unwrap_or_else(|e| {
        tracing::debug!("Ignoring unreadable ICC profile: {}", e);
        None
    });

    let pixels = DynamicImage::from_decoder(decoder)
        .map_err(|e| PipelineError::Decode(format!("Failed to decode {}: {}", format.as_str(), e)))?
        .to_rgba8();

    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(PipelineError::Decode(format!(
            "Invalid image dimensions ({}x{})",
            pixels.width(),
            pixels.height()
        )));
    }

    tracing::debug!(
        "Decoded {} {}x{} ({} bytes in)",
        format.as_str(),
        pixels.width(),
        pixels.height(),
        data.len()
    );
    Ok(DecodedImage {
        info,
        pixels,
        icc_profile,
    })
}

fn open_decoder(data: &[u8], format: ImageFormat) -> Result<impl ImageDecoder + '_> {
    ImageReader::with_format(Cursor::new(data), codec_format(format))
        .into_decoder()
        .map_err(|e| {
            PipelineError::Decode(format!("Failed to read {} header: {}", format.as_str(), e))
        })
}

fn codec_format(format: ImageFormat) -> image::ImageFormat {
    match format {
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::Gif => image::ImageFormat::Gif,
        ImageFormat::Bmp => image::ImageFormat::Bmp,
        ImageFormat::Tiff => image::ImageFormat::Tiff,
        ImageFormat::Ico => image::ImageFormat::Ico,
        ImageFormat::WebP => image::ImageFormat::WebP,
        ImageFormat::Avif => image::ImageFormat::Avif,
    }
}

/// EXIF `Orientation` of the primary image; identity when absent or unreadable
pub fn read_orientation(data: &[u8]) -> OrientationTag {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(_) => return OrientationTag::Identity,
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(OrientationTag::from_exif)
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgba;

    /// Minimal EXIF APP1 segment (big-endian TIFF, one IFD0 entry: Orientation)
    pub(crate) fn exif_app1(orientation: u16) -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"MM\x00\x2A");
        tiff.extend_from_slice(&8u32.to_be_bytes());
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x0112u16.to_be_bytes()); // Orientation
        tiff.extend_from_slice(&3u16.to_be_bytes()); // SHORT
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&orientation.to_be_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_be_bytes()); // no next IFD

        let mut payload = b"Exif\x00\x00".to_vec();
        payload.extend_from_slice(&tiff);

        let mut segment = vec![0xFF, 0xE1];
        segment.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        segment.extend_from_slice(&payload);
        segment
    }

    /// Encode `img` as JPEG and splice in an EXIF orientation right after SOI
    pub(crate) fn jpeg_with_orientation(img: &RgbaImage, orientation: u16) -> Vec<u8> {
        let rgb = image::DynamicImage::ImageRgba8(img.clone()).to_rgb8();
        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 95)
            .encode_image(&rgb)
            .unwrap();

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&exif_app1(orientation));
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    pub(crate) fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_header_png_without_exif() {
        let img = RgbaImage::from_pixel(40, 30, Rgba([1, 2, 3, 255]));
        let info = read_header(&png_bytes(&img)).unwrap();

        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!((info.width, info.height), (40, 30));
        assert_eq!(info.orientation, OrientationTag::Identity);
        assert!(info.has_alpha());
    }

    #[test]
    fn test_header_reads_exif_orientation() {
        let img = RgbaImage::from_pixel(40, 30, Rgba([200, 100, 50, 255]));
        for value in 1..=8u16 {
            let info = read_header(&jpeg_with_orientation(&img, value)).unwrap();
            assert_eq!(info.format, ImageFormat::Jpeg);
            assert_eq!((info.width, info.height), (40, 30));
            assert_eq!(info.orientation.exif_value() as u16, value);
            assert!(!info.has_alpha());
        }
    }

    #[test]
    fn test_header_unknown_orientation_is_identity() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let info = read_header(&jpeg_with_orientation(&img, 42)).unwrap();
        assert_eq!(info.orientation, OrientationTag::Identity);
    }

    #[test]
    fn test_geometry_swaps_for_rotate90() {
        let img = RgbaImage::from_pixel(40, 30, Rgba([0, 0, 0, 255]));
        let geometry = read_header(&jpeg_with_orientation(&img, 6)).unwrap().geometry();
        assert_eq!((geometry.display_width, geometry.display_height), (30, 40));
    }

    #[test]
    fn test_header_rejects_non_image() {
        assert!(matches!(
            read_header(b"This is not an image file content"),
            Err(PipelineError::Decode(_))
        ));
        assert!(matches!(read_header(&[]), Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_decode_corrupt_data() {
        // JPEG signature followed by garbage
        let corrupt = [0xFF, 0xD8, 0xFF, 0xE0, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC];
        assert!(matches!(decode_image(&corrupt), Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_decode_keeps_stored_pixel_order() {
        let img = RgbaImage::from_fn(4, 2, |x, y| Rgba([x as u8 * 60, y as u8 * 100, 0, 255]));
        let decoded = decode_image(&png_bytes(&img)).unwrap();
        assert_eq!(decoded.pixels, img);
        assert_eq!(decoded.info.format, ImageFormat::Png);
    }

    #[test]
    fn test_raw_image_caches_header() {
        let img = RgbaImage::from_pixel(12, 9, Rgba([9, 9, 9, 255]));
        let bytes = jpeg_with_orientation(&img, 8);
        let raw = RawImage::new(&bytes);

        assert!(!raw.has_header());
        let info = raw.info().unwrap().clone();
        assert!(raw.has_header());
        assert_eq!(info.orientation, OrientationTag::Rotate270);

        let decoded = raw.decode().unwrap();
        assert_eq!(decoded.info, info);
        assert_eq!(decoded.pixels.dimensions(), (12, 9));
        assert_eq!(raw.bytes().len(), bytes.len());
    }
}
