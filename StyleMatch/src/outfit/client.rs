//! Transport for the image-edit endpoint
//!
//! [`ImageEditTransport`] is the only seam where the pipeline touches the
//! network. [`OpenAiImageClient`] implements it with a blocking `reqwest`
//! client; tests substitute an in-process fake.

use crate::image_processor::magic::ImageFormat;
use crate::utils::error::{Result, UpstreamError};
use reqwest::blocking::{multipart, Client};
use std::time::Duration;

use super::types::GenerationRequest;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/images/edits";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// File name of the atlas part
pub const ATLAS_FILE_NAME: &str = "atlas.png";

/// Content type of the atlas part, which is always a PNG
pub fn atlas_mime() -> &'static str {
    ImageFormat::Png.mime_type()
}

/// Raw HTTP outcome, status and body untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one generation request and returns whatever came back
///
/// Implementations report transport failures (DNS, TLS, timeout) as errors
/// and every HTTP response, successful or not, as `Ok`.
pub trait ImageEditTransport {
    fn submit(&self, request: &GenerationRequest) -> Result<UpstreamResponse>;
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Multipart client for the OpenAI images/edits endpoint
pub struct OpenAiImageClient {
    http: Client,
    endpoint: String,
}

impl OpenAiImageClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(UpstreamError::from)?;
        Ok(Self {
            http,
            endpoint: settings.endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ImageEditTransport for OpenAiImageClient {
    fn submit(&self, request: &GenerationRequest) -> Result<UpstreamResponse> {
        let atlas = multipart::Part::bytes(request.atlas_png.clone())
            .file_name(ATLAS_FILE_NAME)
            .mime_str(atlas_mime())
            .map_err(UpstreamError::from)?;

        let form = multipart::Form::new()
            .text("model", request.model.clone())
            .text("prompt", request.prompt.clone())
            .text("size", request.size.clone())
            .text("quality", request.quality.as_str())
            .text("n", request.n.to_string())
            .part("image", atlas);

        tracing::debug!("POST {} {:?}", self.endpoint, request);
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&request.api_key)
            .multipart(form)
            .send()
            .map_err(UpstreamError::from)?;

        let status = response.status().as_u16();
        let body = response.text().map_err(UpstreamError::from)?;
        tracing::debug!("Image edit responded {} ({} bytes)", status, body.len());

        Ok(UpstreamResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        let ok = |status| UpstreamResponse {
            status,
            body: String::new(),
        };
        assert!(ok(200).is_success());
        assert!(ok(204).is_success());
        assert!(!ok(199).is_success());
        assert!(!ok(400).is_success());
        assert!(!ok(500).is_success());
    }

    #[test]
    fn test_default_settings() {
        let settings = ClientSettings::default();
        assert_eq!(settings.endpoint, "https://api.openai.com/v1/images/edits");
        assert_eq!(settings.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_atlas_part_is_png() {
        assert_eq!(atlas_mime(), "image/png");
        assert!(ATLAS_FILE_NAME.ends_with(".png"));
    }

    #[test]
    fn test_client_builds_without_network() {
        let client = OpenAiImageClient::new(ClientSettings {
            endpoint: "http://127.0.0.1:9/edits".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/edits");
    }
}
