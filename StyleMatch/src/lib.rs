//! StyleMatch - photo pipeline for a wardrobe and outfit service
//!
//! Normalizes uploaded garment photos into bounded JPEGs, derives square
//! thumbnails, composes garment atlases and requests mannequin renders from
//! an external image-edit endpoint.
//!
//! Every function is blocking and stateless: it owns its buffers for the
//! duration of the call, so callers may run any number of them in parallel
//! on a thread pool. Persisting results beyond the provided output paths is
//! left to the caller.

pub mod atlas;
pub mod config;
pub mod image_processor;
pub mod outfit;
pub mod utils;

pub use atlas::{compose_atlas, compose_atlas_from_bytes, AtlasLayout};
pub use config::PipelineConfig;
pub use image_processor::resizer::{resize_to_file, resize_to_jpeg};
pub use image_processor::thumbnail::{create_thumbnail_with_size, thumbnail_to_file};
pub use outfit::{generate_outfit, generate_outfit_with, GenerateOutfitOptions, GenerationResult};
pub use utils::error::{PipelineError, Result, UpstreamError};
