//! Request, response and option types for outfit generation

use crate::image_processor::magic::ImageFormat;
use crate::utils::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requested rendering quality tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Auto,
    #[default]
    High,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Auto => "auto",
            Quality::High => "high",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-tunable knobs for [`generate_outfit`](super::generate_outfit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOutfitOptions {
    /// Requested output size as `"WxH"`
    pub output_size: String,
    pub quality: Quality,
    /// Atlas cell edge in pixels
    pub cell_size: u32,
    /// Atlas gap in pixels
    pub padding: u32,
}

impl Default for GenerateOutfitOptions {
    fn default() -> Self {
        Self {
            output_size: "1024x1024".to_string(),
            quality: Quality::High,
            cell_size: crate::atlas::DEFAULT_CELL_SIZE,
            padding: crate::atlas::DEFAULT_PADDING,
        }
    }
}

/// Parse a `"WxH"` size string into positive dimensions
///
/// # Errors
/// * `PipelineError::Argument` - malformed string or a zero dimension
pub fn parse_output_size(size: &str) -> Result<(u32, u32)> {
    let invalid = || {
        PipelineError::Argument(format!(
            "output size must look like \"1024x1024\" (got {:?})",
            size
        ))
    };
    let (w, h) = size.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let w: u32 = w.parse().map_err(|_| invalid())?;
    let h: u32 = h.parse().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(invalid());
    }
    Ok((w, h))
}

/// One image-edit call, built fresh per generation and never stored
#[derive(Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub size: String,
    pub quality: Quality,
    pub n: u32,
    /// Lossless atlas sent as the reference image
    pub atlas_png: Vec<u8>,
    pub api_key: String,
}

impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("model", &self.model)
            .field("prompt_len", &self.prompt.len())
            .field("size", &self.size)
            .field("quality", &self.quality)
            .field("n", &self.n)
            .field("atlas_bytes", &self.atlas_png.len())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Generated image bytes as returned upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub bytes: Vec<u8>,
    /// Container sniffed from the bytes; `None` when unrecognised
    pub format: Option<ImageFormat>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageEditResponse {
    #[serde(default)]
    pub data: Option<Vec<ImageEditDatum>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageEditDatum {
    #[serde(default)]
    pub b64_json: Option<String>,
}
