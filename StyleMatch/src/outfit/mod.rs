//! Outfit generation
//!
//! Composes the selected garment photos into an atlas, pairs it with the
//! instruction prompt and asks the image-edit endpoint for a mannequin render.
//!
//! # Pipeline
//!
//! 1. Drop blank path entries
//! 2. Verify every remaining file exists (before any network activity)
//! 3. Compose the PNG atlas
//! 4. Build the prompt for N garments
//! 5. Submit one multipart request (no retry)
//! 6. Decode `data[0].b64_json` from the JSON response

pub mod client;
pub mod prompt;
pub mod types;

pub use client::{ClientSettings, ImageEditTransport, OpenAiImageClient, UpstreamResponse};
pub use prompt::build_prompt;
pub use types::{GenerateOutfitOptions, GenerationRequest, GenerationResult, Quality};

use crate::atlas;
use crate::image_processor::magic;
use crate::utils::error::{PipelineError, Result, UpstreamError};
use crate::utils::file;
use base64::Engine;
use std::path::Path;

use types::ImageEditResponse;

/// Image model used for every generation
pub const MODEL: &str = "gpt-image-1";

/// Generate an outfit render through the default OpenAI client
///
/// # Errors
/// * `PipelineError::Argument` - no usable paths, blank key or bad options
/// * `PipelineError::NotFound` - a referenced file is missing
/// * `PipelineError::Upstream` - transport failure, non-success status, or
///   a response without a usable image
pub fn generate_outfit<P: AsRef<Path>>(
    image_paths: &[P],
    api_key: &str,
    options: &GenerateOutfitOptions,
) -> Result<GenerationResult> {
    let client = OpenAiImageClient::new(ClientSettings::default())?;
    generate_outfit_with(&client, image_paths, api_key, options)
}

/// [`generate_outfit`] over an arbitrary transport
pub fn generate_outfit_with<T, P>(
    transport: &T,
    image_paths: &[P],
    api_key: &str,
    options: &GenerateOutfitOptions,
) -> Result<GenerationResult>
where
    T: ImageEditTransport + ?Sized,
    P: AsRef<Path>,
{
    let paths: Vec<&Path> = image_paths
        .iter()
        .map(|p| p.as_ref())
        .filter(|p: &&Path| !p.as_os_str().to_string_lossy().trim().is_empty())
        .collect();
    if paths.is_empty() {
        return Err(PipelineError::Argument(
            "at least one image is required".to_string(),
        ));
    }
    for path in &paths {
        file::ensure_file_exists(path)?;
    }

    let (width, height) = types::parse_output_size(&options.output_size)?;
    if api_key.trim().is_empty() {
        return Err(PipelineError::Argument("API key is empty".to_string()));
    }

    let atlas_png = atlas::compose_atlas(&paths, options.cell_size, options.padding)?;
    let request = GenerationRequest {
        model: MODEL.to_string(),
        prompt: build_prompt(paths.len()),
        size: format!("{}x{}", width, height),
        quality: options.quality,
        n: 1,
        atlas_png,
        api_key: api_key.to_string(),
    };

    tracing::info!(
        "Requesting outfit for {} garments ({}, quality={})",
        paths.len(),
        request.size,
        request.quality
    );
    let response = transport.submit(&request)?;

    if !response.is_success() {
        tracing::warn!("Image edit failed with status {}", response.status);
        return Err(UpstreamError::Status {
            status: response.status,
            body: response.body,
        }
        .into());
    }

    let bytes = decode_image_payload(&response.body)?;
    let format = magic::detect_image_format(&bytes).ok();
    tracing::info!(
        "Generated outfit image: {} bytes ({})",
        bytes.len(),
        format.map_or("unknown", |f| f.as_str())
    );
    Ok(GenerationResult { bytes, format })
}

/// Extract and decode `data[0].b64_json`
fn decode_image_payload(body: &str) -> Result<Vec<u8>> {
    let parsed: ImageEditResponse = serde_json::from_str(body)
        .map_err(|e| UpstreamError::InvalidPayload(format!("malformed JSON: {}", e)))?;

    let b64 = parsed
        .data
        .and_then(|data| data.into_iter().next())
        .and_then(|datum| datum.b64_json)
        .filter(|b64| !b64.trim().is_empty())
        .ok_or(UpstreamError::NoImage)?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| UpstreamError::InvalidPayload(format!("invalid base64: {}", e)))?;
    Ok(bytes)
}
