//! Pipeline configuration
//!
//! Defaults mirror the values the surrounding service has always used.
//! Each can be overridden through a `STYLEMATCH_*` environment variable.

use crate::image_processor::encoder::WHITE;
use crate::image_processor::resizer::{ResizeConfig, ResizeFilter};
use crate::image_processor::thumbnail::ThumbnailConfig;
use std::str::FromStr;

pub const MAX_IMAGE_SIZE_VAR: &str = "STYLEMATCH_MAX_IMAGE_SIZE";
pub const THUMBNAIL_SIZE_VAR: &str = "STYLEMATCH_THUMBNAIL_SIZE";
pub const JPEG_QUALITY_VAR: &str = "STYLEMATCH_JPEG_QUALITY";
pub const ALLOW_UPSCALE_VAR: &str = "STYLEMATCH_ALLOW_UPSCALE";

/// Settings shared by the resize and thumbnail engines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Bounding box edge for normalized photos
    pub max_image_size: u32,

    /// Edge of the square thumbnail
    pub thumbnail_size: u32,

    /// JPEG quality (1-100) for both engines
    pub jpeg_quality: u8,

    /// Whether thumbnails may enlarge small sources
    pub allow_upscale: bool,

    pub resize_filter: ResizeFilter,

    /// JPEG background for transparent sources
    pub background_color: (u8, u8, u8),
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_image_size: 2048,
            thumbnail_size: 300,
            jpeg_quality: 85,
            allow_upscale: true,
            resize_filter: ResizeFilter::Lanczos3,
            background_color: WHITE,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `STYLEMATCH_*` environment variables
    ///
    /// A missing or unparseable variable keeps its default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let quality = read_setting(&lookup, JPEG_QUALITY_VAR, defaults.jpeg_quality);

        Self {
            max_image_size: read_positive(&lookup, MAX_IMAGE_SIZE_VAR, defaults.max_image_size),
            thumbnail_size: read_positive(&lookup, THUMBNAIL_SIZE_VAR, defaults.thumbnail_size),
            jpeg_quality: if (1..=100).contains(&quality) {
                quality
            } else {
                tracing::debug!(
                    "{}={} out of range, defaulting to {}",
                    JPEG_QUALITY_VAR,
                    quality,
                    defaults.jpeg_quality
                );
                defaults.jpeg_quality
            },
            allow_upscale: read_setting(&lookup, ALLOW_UPSCALE_VAR, defaults.allow_upscale),
            ..defaults
        }
    }

    pub fn resize_config(&self) -> ResizeConfig {
        ResizeConfig {
            max_size: self.max_image_size,
            quality: self.jpeg_quality,
            filter: self.resize_filter,
            background_color: self.background_color,
        }
    }

    pub fn thumbnail_config(&self) -> ThumbnailConfig {
        ThumbnailConfig {
            size: self.thumbnail_size,
            quality: self.jpeg_quality,
            allow_upscale: self.allow_upscale,
            background_color: self.background_color,
            resize_filter: self.resize_filter,
        }
    }
}

fn read_setting<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::debug!("Ignoring unparseable {}={:?}, defaulting to {:?}", key, raw, default);
            default
        }
    }
}

fn read_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> u32 {
    match read_setting(lookup, key, default) {
        0 => {
            tracing::debug!("{}=0 is not allowed, defaulting to {}", key, default);
            default
        }
        value => value,
    }
}
