//! Error types for StyleMatch
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error at {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),
}

/// Failures reported by, or while talking to, the generation endpoint.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("generation endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no image produced")]
    NoImage,

    #[error("unusable response payload: {0}")]
    InvalidPayload(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl PipelineError {
    /// True for I/O failures, with or without an attached path
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
