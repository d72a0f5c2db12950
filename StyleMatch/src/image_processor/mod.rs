//! Image processing for the photo pipeline
//!
//! Every operation decodes its input once, corrects the EXIF orientation on a
//! transform canvas and writes a freshly encoded file. Nothing is cached
//! between calls.
//!
//! # Architecture
//!
//! - **magic**: identifies the container from leading bytes
//! - **orientation**: EXIF orientation tags and the canvas ops that undo them
//! - **decoder**: header reading and single-pass decoding
//! - **canvas**: affine transform stack with axis-aligned image drawing
//! - **resizer**: bounded resize to JPEG
//! - **thumbnail**: centred square crop to JPEG
//! - **encoder**: JPEG (flattened) and PNG output
//!
//! # Supported Image Formats
//!
//! - JPEG (.jpg, .jpeg, .jpe, .jfif)
//! - PNG (.png)
//! - GIF (.gif)
//! - BMP (.bmp)
//! - WebP (.webp)
//! - AVIF (.avif)
//! - TIFF (.tif, .tiff)
//! - ICO (.ico)
//!
//! # Examples
//!
//! ```no_run
//! use stylematch::image_processor::{resizer, thumbnail};
//!
//! let photo = std::fs::read("shirt.jpg")?;
//! let normalized = resizer::resize_to_jpeg(&photo, 2048, 85)?;
//! let thumb = thumbnail::create_thumbnail_with_size(&photo, 300, 85, true)?;
//! # let _ = (normalized, thumb);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod canvas;
pub mod decoder;
pub mod encoder;
pub mod magic;
pub mod orientation;
pub mod resizer;
pub mod thumbnail;

/// Supported image file extensions
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "jpe", "jfif", // JPEG
    "png",  // PNG
    "gif",  // GIF
    "bmp",  // BMP
    "webp", // WebP
    "avif", // AVIF
    "tif", "tiff", // TIFF
    "ico",  // Icon
];

/// Check if a file name carries a supported image extension
///
/// Case-insensitive. Used when expanding directories into image lists; the
/// pipeline itself trusts the magic bytes, not the name.
///
/// # Examples
/// ```
/// use stylematch::image_processor::is_image_file;
///
/// assert!(is_image_file("top.jpg"));
/// assert!(is_image_file("jeans.PNG"));
/// assert!(is_image_file("scarf.webp"));
/// assert!(!is_image_file("notes.txt"));
/// ```
pub fn is_image_file(filename: &str) -> bool {
    if let Some(ext) = std::path::Path::new(filename)
        .extension()
        .and_then(|s| s.to_str())
    {
        SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_file_jpeg() {
        assert!(is_image_file("image.jpg"));
        assert!(is_image_file("image.jpeg"));
        assert!(is_image_file("image.jpe"));
        assert!(is_image_file("image.jfif"));
    }

    #[test]
    fn test_is_image_file_modern_formats() {
        assert!(is_image_file("image.webp"));
        assert!(is_image_file("photo.WEBP"));
        assert!(is_image_file("image.avif"));
    }

    #[test]
    fn test_is_image_file_other_formats() {
        assert!(is_image_file("image.png"));
        assert!(is_image_file("image.gif"));
        assert!(is_image_file("image.bmp"));
        assert!(is_image_file("image.tif"));
        assert!(is_image_file("image.tiff"));
        assert!(is_image_file("icon.ico"));
    }

    #[test]
    fn test_is_image_file_not_image() {
        assert!(!is_image_file("document.txt"));
        assert!(!is_image_file("outfit.json"));
        assert!(!is_image_file("README"));
        assert!(!is_image_file(""));
        assert!(!is_image_file(".jpg"));
    }

    #[test]
    fn test_is_image_file_with_path_and_case() {
        assert!(is_image_file("wardrobe/tops/image.JpG"));
        assert!(!is_image_file("wardrobe/tops/notes.md"));
    }
}
