//! Garment atlas composition
//!
//! Tiles N source images into a near-square grid of fixed-size cells. Each
//! image is turned upright, fitted inside its cell preserving aspect ratio
//! (small images are enlarged) and centred. The result is a lossless PNG used
//! as the visual reference for outfit generation.
//!
//! A source that cannot be read or decoded leaves its cell empty; the atlas
//! is still produced from the remaining images.

use crate::image_processor::canvas::Canvas;
use crate::image_processor::decoder::RawImage;
use crate::image_processor::encoder;
use crate::image_processor::resizer::ResizeFilter;
use crate::utils::error::{PipelineError, Result};
use std::path::Path;

/// Default cell edge in pixels
pub const DEFAULT_CELL_SIZE: u32 = 1024;

/// Default gap between cells and around the border
pub const DEFAULT_PADDING: u32 = 4;

/// Grid geometry for `count` images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasLayout {
    pub count: usize,
    pub cols: u32,
    pub rows: u32,
    pub cell_size: u32,
    pub padding: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasLayout {
    /// `cols = ceil(sqrt(count))`, `rows = ceil(count / cols)`
    ///
    /// # Errors
    /// * `PipelineError::Argument` - no images, zero cell size, or a canvas
    ///   too large to address
    pub fn new(count: usize, cell_size: u32, padding: u32) -> Result<Self> {
        if count == 0 {
            return Err(PipelineError::Argument(
                "at least one image is required".to_string(),
            ));
        }
        if cell_size == 0 {
            return Err(PipelineError::Argument(
                "atlas cell size must be greater than zero".to_string(),
            ));
        }

        let count_u32 = u32::try_from(count)
            .map_err(|_| PipelineError::Argument(format!("too many images ({})", count)))?;
        let cols = ceil_sqrt(count_u32);
        let rows = count_u32.div_ceil(cols);

        let too_large =
            || PipelineError::Argument(format!("atlas of {} images exceeds size limits", count));
        let width = extent(cols, cell_size, padding).ok_or_else(too_large)?;
        let height = extent(rows, cell_size, padding).ok_or_else(too_large)?;

        Ok(Self {
            count,
            cols,
            rows,
            cell_size,
            padding,
            width,
            height,
        })
    }

    /// Top-left corner of the cell for image `index` (row-major)
    pub fn cell_origin(&self, index: usize) -> (u32, u32) {
        let cols = self.cols as usize;
        let (col, row) = ((index % cols) as u32, (index / cols) as u32);
        let stride = self.cell_size + self.padding;
        (self.padding + col * stride, self.padding + row * stride)
    }

    /// Drawn size and in-cell offset of an image with display size `w × h`
    pub fn fit(&self, width: u32, height: u32) -> CellFit {
        let cell = self.cell_size as f32;
        let scale = (cell / width as f32).min(cell / height as f32);
        let draw = |v: u32| ((v as f32 * scale).round_ties_even() as u32).clamp(1, self.cell_size);
        let (draw_width, draw_height) = (draw(width), draw(height));

        CellFit {
            draw_width,
            draw_height,
            offset_x: (self.cell_size - draw_width) / 2,
            offset_y: (self.cell_size - draw_height) / 2,
        }
    }
}

/// Placement of one image inside its cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellFit {
    pub draw_width: u32,
    pub draw_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Smallest `c` with `c * c >= n`
fn ceil_sqrt(n: u32) -> u32 {
    let n = n as u64;
    let mut c = (n as f64).sqrt() as u64;
    while c * c < n {
        c += 1;
    }
    while c > 1 && (c - 1) * (c - 1) >= n {
        c -= 1;
    }
    c.max(1) as u32
}

/// `cells * cell + (cells + 1) * padding`
fn extent(cells: u32, cell: u32, padding: u32) -> Option<u32> {
    cells
        .checked_mul(cell)?
        .checked_add(cells.checked_add(1)?.checked_mul(padding)?)
}

/// Compose the images at `paths`, in order, into a PNG atlas
///
/// # Errors
/// * `PipelineError::Argument` - `paths` is empty or the layout is invalid
/// * `PipelineError::Encode` - PNG encoding failed
///
/// Unreadable or undecodable files are skipped, not reported.
pub fn compose_atlas<P: AsRef<Path>>(paths: &[P], cell_size: u32, padding: u32) -> Result<Vec<u8>> {
    let layout = AtlasLayout::new(paths.len(), cell_size, padding)?;
    let mut atlas = AtlasCanvas::new(layout)?;

    for (index, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(data) => atlas.place(index, &RawImage::new(&data), &path.display().to_string())?,
            Err(e) => tracing::warn!("Skipping atlas source {}: {}", path.display(), e),
        }
    }

    atlas.finish()
}

/// Same as [`compose_atlas`] over in-memory encoded images
pub fn compose_atlas_from_bytes<B: AsRef<[u8]>>(
    sources: &[B],
    cell_size: u32,
    padding: u32,
) -> Result<Vec<u8>> {
    let layout = AtlasLayout::new(sources.len(), cell_size, padding)?;
    let mut atlas = AtlasCanvas::new(layout)?;

    for (index, data) in sources.iter().enumerate() {
        atlas.place(index, &RawImage::new(data.as_ref()), &format!("#{}", index))?;
    }

    atlas.finish()
}

struct AtlasCanvas {
    layout: AtlasLayout,
    canvas: Canvas,
    placed: usize,
}

impl AtlasCanvas {
    fn new(layout: AtlasLayout) -> Result<Self> {
        tracing::debug!(
            "Atlas layout: {} images in {}x{} grid, canvas {}x{}",
            layout.count,
            layout.cols,
            layout.rows,
            layout.width,
            layout.height
        );
        Ok(Self {
            canvas: Canvas::new(layout.width, layout.height, ResizeFilter::Lanczos3)?,
            layout,
            placed: 0,
        })
    }

    /// Draw one source into cell `index`; undecodable sources leave it empty
    fn place(&mut self, index: usize, raw: &RawImage<'_>, label: &str) -> Result<()> {
        let geometry = match raw.info() {
            Ok(info) => info.geometry(),
            Err(e) => {
                tracing::warn!("Skipping atlas source {}: {}", label, e);
                return Ok(());
            }
        };
        let fit = self
            .layout
            .fit(geometry.display_width, geometry.display_height);
        let decoded = match raw.decode() {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("Skipping atlas source {}: {}", label, e);
                return Ok(());
            }
        };
        let (x0, y0) = self.layout.cell_origin(index);

        let canvas = &mut self.canvas;
        canvas.save();
        canvas.translate((x0 + fit.offset_x) as f32, (y0 + fit.offset_y) as f32);
        canvas.scale(
            fit.draw_width as f32 / geometry.display_width as f32,
            fit.draw_height as f32 / geometry.display_height as f32,
        );
        canvas.apply_all(&geometry.correction());
        let drawn = canvas.draw_image(&decoded.pixels);
        canvas.restore();
        drawn?;

        tracing::debug!(
            "Atlas cell {} at ({}, {}): {}x{} source drawn {}x{}",
            index,
            x0,
            y0,
            geometry.display_width,
            geometry.display_height,
            fit.draw_width,
            fit.draw_height
        );
        self.placed += 1;
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        let png = encoder::encode_png(self.canvas.pixels(), None)?;
        tracing::info!(
            "Composed {}x{} atlas from {}/{} images ({} bytes)",
            self.layout.width,
            self.layout.height,
            self.placed,
            self.layout.count,
            png.len()
        );
        Ok(png)
    }
}
