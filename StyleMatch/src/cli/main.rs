//! `stylematch` CLI - run the photo pipeline from the command line.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stylematch::image_processor::resizer::resize_with_config;
use stylematch::image_processor::thumbnail::create_thumbnail;
use stylematch::outfit::{self, ClientSettings, GenerateOutfitOptions, OpenAiImageClient, Quality};
use stylematch::utils::file;
use stylematch::PipelineConfig;

/// Normalize garment photos, build thumbnails and atlases, generate outfits.
#[derive(Parser, Debug)]
#[command(name = "stylematch")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resize a photo into an upright JPEG within a bounding box.
    Resize {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Bounding box edge in pixels [default: 2048 or STYLEMATCH_MAX_IMAGE_SIZE]
        #[arg(long, value_name = "INT")]
        max_size: Option<u32>,

        /// JPEG quality (1-100) [default: 85 or STYLEMATCH_JPEG_QUALITY]
        #[arg(short, long, value_name = "INT")]
        quality: Option<u8>,
    },

    /// Create a centred square JPEG thumbnail.
    Thumb {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Thumbnail edge in pixels [default: 300 or STYLEMATCH_THUMBNAIL_SIZE]
        #[arg(short, long, value_name = "INT")]
        size: Option<u32>,

        /// JPEG quality (1-100) [default: 85 or STYLEMATCH_JPEG_QUALITY]
        #[arg(short, long, value_name = "INT")]
        quality: Option<u8>,

        /// Never enlarge sources smaller than the thumbnail.
        #[arg(long)]
        no_upscale: bool,
    },

    /// Compose images (or directories of images) into a PNG atlas.
    Atlas {
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Cell edge in pixels.
        #[arg(long, default_value = "1024", value_name = "INT")]
        cell_size: u32,

        /// Gap between cells in pixels.
        #[arg(long, default_value = "4", value_name = "INT")]
        padding: u32,
    },

    /// Generate a mannequin render wearing the given garments.
    Generate {
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// API key [default: OPENAI_API_KEY]
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,

        /// Requested output size as WxH.
        #[arg(long, default_value = "1024x1024", value_name = "WxH")]
        size: String,

        #[arg(long, value_enum, default_value_t = QualityArg::High)]
        quality: QualityArg,

        /// Atlas cell edge in pixels.
        #[arg(long, default_value = "1024", value_name = "INT")]
        cell_size: u32,

        /// Atlas gap in pixels.
        #[arg(long, default_value = "4", value_name = "INT")]
        padding: u32,

        /// Image-edit endpoint URL.
        #[arg(long, default_value = outfit::client::DEFAULT_ENDPOINT, value_name = "URL")]
        endpoint: String,

        /// Request timeout in seconds.
        #[arg(long, default_value = "300", value_name = "SECS")]
        timeout: u64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum QualityArg {
    Auto,
    High,
}

impl From<QualityArg> for Quality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Auto => Quality::Auto,
            QualityArg::High => Quality::High,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("stylematch={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(args.command) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(command: Command) -> Result<()> {
    let config = PipelineConfig::from_env();

    match command {
        Command::Resize {
            input,
            output,
            max_size,
            quality,
        } => {
            let mut resize = config.resize_config();
            resize.max_size = max_size.unwrap_or(resize.max_size);
            resize.quality = quality.unwrap_or(resize.quality);

            let data = read_input(&input)?;
            let jpeg = resize_with_config(&data, &resize)
                .with_context(|| format!("Failed to resize {}", input.display()))?;
            file::write_output(&output, &jpeg)?;
            println!("{} -> {}", input.display(), output.display());
        }

        Command::Thumb {
            input,
            output,
            size,
            quality,
            no_upscale,
        } => {
            let mut thumb = config.thumbnail_config();
            thumb.size = size.unwrap_or(thumb.size);
            thumb.quality = quality.unwrap_or(thumb.quality);
            thumb.allow_upscale = thumb.allow_upscale && !no_upscale;

            let data = read_input(&input)?;
            let jpeg = create_thumbnail(&data, &thumb)
                .with_context(|| format!("Failed to create thumbnail for {}", input.display()))?;
            file::write_output(&output, &jpeg)?;
            println!("{} -> {}", input.display(), output.display());
        }

        Command::Atlas {
            output,
            inputs,
            cell_size,
            padding,
        } => {
            let paths = file::expand_image_inputs(&inputs)?;
            let png = stylematch::compose_atlas(&paths, cell_size, padding)
                .context("Failed to compose atlas")?;
            file::write_output(&output, &png)?;
            println!("{} images -> {}", paths.len(), output.display());
        }

        Command::Generate {
            output,
            inputs,
            api_key,
            size,
            quality,
            cell_size,
            padding,
            endpoint,
            timeout,
        } => {
            let api_key = api_key
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
                .context("No API key: pass --api-key or set OPENAI_API_KEY")?;

            let paths = file::expand_image_inputs(&inputs)?;
            let options = GenerateOutfitOptions {
                output_size: size,
                quality: quality.into(),
                cell_size,
                padding,
            };
            let client = OpenAiImageClient::new(ClientSettings {
                endpoint,
                timeout: Duration::from_secs(timeout),
            })
            .context("Failed to initialize HTTP client")?;

            let result = outfit::generate_outfit_with(&client, &paths, &api_key, &options)
                .context("Outfit generation failed")?;
            file::write_output(&output, &result.bytes)?;
            println!(
                "{} garments -> {} ({})",
                paths.len(),
                output.display(),
                result.format.map_or("unknown format", |f| f.as_str())
            );
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    file::ensure_file_exists(path)?;
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
