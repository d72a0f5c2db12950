//! Render target with a transform stack
//!
//! A [`Canvas`] owns an RGBA pixel buffer (transparent on creation) and a
//! current transform. Transform calls pre-concatenate, so the operation pushed
//! first is applied to drawn geometry last:
//!
//! ```text
//! canvas.scale(s, s);          // applied last
//! canvas.translate(w, 0.0);
//! canvas.rotate(1);            // applied first
//! canvas.draw_image(&raw)?;
//! ```
//!
//! Only axis-aligned transforms can be drawn: every quarter-turn rotation,
//! mirroring and positive or negative scale. The source is reoriented exactly
//! (pixel permutation, no filtering), resampled to its device size with
//! [`resizer::resample`], and composited source-over at the device position.

use crate::utils::error::{PipelineError, Result};
use image::{imageops, RgbaImage};

use super::orientation::CanvasOp;
use super::resizer::{self, ResizeFilter};

const AXIS_EPSILON: f32 = 1e-4;

/// 2D affine transform in a y-down coordinate system
///
/// ```text
/// x' = sx * x + kx * y + tx
/// y' = ky * x + sy * y + ty
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub sx: f32,
    pub kx: f32,
    pub tx: f32,
    pub ky: f32,
    pub sy: f32,
    pub ty: f32,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            sx: 1.0,
            kx: 0.0,
            tx: 0.0,
            ky: 0.0,
            sy: 1.0,
            ty: 0.0,
        }
    }

    pub fn translation(dx: f32, dy: f32) -> Self {
        Self {
            tx: dx,
            ty: dy,
            ..Self::identity()
        }
    }

    pub fn scaling(sx: f32, sy: f32) -> Self {
        Self {
            sx,
            sy,
            ..Self::identity()
        }
    }

    /// Clockwise rotation by `quarter_turns * 90` degrees, built from exact
    /// sine/cosine values so corners stay on integer coordinates
    pub fn rotation(quarter_turns: u8) -> Self {
        let (cos, sin) = match quarter_turns % 4 {
            0 => (1.0, 0.0),
            1 => (0.0, 1.0),
            2 => (-1.0, 0.0),
            _ => (0.0, -1.0),
        };
        Self {
            sx: cos,
            kx: -sin,
            tx: 0.0,
            ky: sin,
            sy: cos,
            ty: 0.0,
        }
    }

    /// `self * other`: `other` is applied to a point first
    pub fn pre_concat(&self, other: &Self) -> Self {
        Self {
            sx: self.sx * other.sx + self.kx * other.ky,
            kx: self.sx * other.kx + self.kx * other.sy,
            tx: self.sx * other.tx + self.kx * other.ty + self.tx,
            ky: self.ky * other.sx + self.sy * other.ky,
            sy: self.ky * other.kx + self.sy * other.sy,
            ty: self.ky * other.tx + self.sy * other.ty + self.ty,
        }
    }

    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.sx * x + self.kx * y + self.tx,
            self.ky * x + self.sy * y + self.ty,
        )
    }
}

impl From<CanvasOp> for Transform {
    fn from(op: CanvasOp) -> Self {
        match op {
            CanvasOp::Translate { dx, dy } => Self::translation(dx, dy),
            CanvasOp::Scale { sx, sy } => Self::scaling(sx, sy),
            CanvasOp::Rotate { quarter_turns } => Self::rotation(quarter_turns),
        }
    }
}

/// Integer pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// How the linear part of a transform permutes and mirrors the source axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AxisMapping {
    swap: bool,
    mirror_x: bool,
    mirror_y: bool,
}

impl AxisMapping {
    fn of(m: &Transform) -> Result<Self> {
        let zero = |v: f32| v.abs() < AXIS_EPSILON;

        if zero(m.kx) && zero(m.ky) && !zero(m.sx) && !zero(m.sy) {
            Ok(Self {
                swap: false,
                mirror_x: m.sx < 0.0,
                mirror_y: m.sy < 0.0,
            })
        } else if zero(m.sx) && zero(m.sy) && !zero(m.kx) && !zero(m.ky) {
            // device x follows source y, device y follows source x
            Ok(Self {
                swap: true,
                mirror_x: m.kx < 0.0,
                mirror_y: m.ky < 0.0,
            })
        } else {
            Err(PipelineError::Argument(format!(
                "canvas transform is not axis-aligned: {:?}",
                m
            )))
        }
    }

    fn apply(self, src: &RgbaImage) -> RgbaImage {
        let mut out = if self.swap {
            RgbaImage::from_fn(src.height(), src.width(), |x, y| *src.get_pixel(y, x))
        } else {
            src.clone()
        };
        if self.mirror_x {
            imageops::flip_horizontal_in_place(&mut out);
        }
        if self.mirror_y {
            imageops::flip_vertical_in_place(&mut out);
        }
        out
    }
}

/// Mutable RGBA drawing surface owned by a single operation
pub struct Canvas {
    pixels: RgbaImage,
    matrix: Transform,
    saved: Vec<Transform>,
    filter: ResizeFilter,
}

/// Largest canvas allocated, in pixels (1 GiB of RGBA)
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

impl Canvas {
    /// Create a fully transparent canvas
    ///
    /// # Errors
    /// * `PipelineError::Argument` - zero width or height, or more than
    ///   [`MAX_CANVAS_PIXELS`] pixels
    pub fn new(width: u32, height: u32, filter: ResizeFilter) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PipelineError::Argument(format!(
                "canvas dimensions must be non-zero (got {}x{})",
                width, height
            )));
        }
        if width as u64 * height as u64 > MAX_CANVAS_PIXELS {
            return Err(PipelineError::Argument(format!(
                "canvas {}x{} exceeds {} pixels",
                width, height, MAX_CANVAS_PIXELS
            )));
        }
        Ok(Self {
            pixels: RgbaImage::new(width, height),
            matrix: Transform::identity(),
            saved: Vec::new(),
            filter,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn matrix(&self) -> Transform {
        self.matrix
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.concat(Transform::translation(dx, dy));
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.concat(Transform::scaling(sx, sy));
    }

    pub fn rotate(&mut self, quarter_turns: u8) {
        self.concat(Transform::rotation(quarter_turns));
    }

    pub fn apply(&mut self, op: CanvasOp) {
        self.concat(op.into());
    }

    pub fn apply_all(&mut self, ops: &[CanvasOp]) {
        for op in ops {
            self.apply(*op);
        }
    }

    fn concat(&mut self, t: Transform) {
        self.matrix = self.matrix.pre_concat(&t);
    }

    pub fn save(&mut self) {
        self.saved.push(self.matrix);
    }

    /// Pop the last saved transform; a restore without a save resets to identity
    pub fn restore(&mut self) {
        self.matrix = self.saved.pop().unwrap_or_else(Transform::identity);
    }

    /// Draw `src` with its top-left corner at the origin of the current transform
    pub fn draw_image(&mut self, src: &RgbaImage) -> Result<()> {
        let m = self.matrix;
        self.draw_transformed(src, &m)
    }

    /// Draw the `src_rect` region of `src` scaled into `dst` (canvas units,
    /// under the current transform)
    ///
    /// # Errors
    /// * `PipelineError::Argument` - `src_rect` is empty or outside `src`
    pub fn draw_image_rect(&mut self, src: &RgbaImage, src_rect: Rect, dst: Rect) -> Result<()> {
        let fits = src_rect
            .x
            .checked_add(src_rect.width)
            .is_some_and(|r| r <= src.width())
            && src_rect
                .y
                .checked_add(src_rect.height)
                .is_some_and(|b| b <= src.height());
        if src_rect.width == 0 || src_rect.height == 0 || !fits {
            return Err(PipelineError::Argument(format!(
                "source rect {:?} outside {}x{} image",
                src_rect,
                src.width(),
                src.height()
            )));
        }
        if dst.width == 0 || dst.height == 0 {
            return Ok(());
        }

        let region = if src_rect == Rect::new(0, 0, src.width(), src.height()) {
            None
        } else {
            Some(
                imageops::crop_imm(src, src_rect.x, src_rect.y, src_rect.width, src_rect.height)
                    .to_image(),
            )
        };
        let region = region.as_ref().unwrap_or(src);

        let placement = Transform::translation(dst.x as f32, dst.y as f32).pre_concat(
            &Transform::scaling(
                dst.width as f32 / src_rect.width as f32,
                dst.height as f32 / src_rect.height as f32,
            ),
        );
        let m = self.matrix.pre_concat(&placement);
        self.draw_transformed(region, &m)
    }

    fn draw_transformed(&mut self, src: &RgbaImage, m: &Transform) -> Result<()> {
        let (w, h) = (src.width() as f32, src.height() as f32);
        let mapping = AxisMapping::of(m)?;

        let corners = [
            m.map_point(0.0, 0.0),
            m.map_point(w, 0.0),
            m.map_point(0.0, h),
            m.map_point(w, h),
        ];
        let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max);

        if max_x - min_x <= 0.0 || max_y - min_y <= 0.0 {
            tracing::debug!("Skipping draw with empty device rect {:?}", corners);
            return Ok(());
        }

        // Sub-pixel spans still cover one pixel
        let left = min_x.round_ties_even() as i64;
        let top = min_y.round_ties_even() as i64;
        let device_w = (max_x.round_ties_even() as i64 - left).max(1);
        let device_h = (max_y.round_ties_even() as i64 - top).max(1);
        let (device_w, device_h) = (
            u32::try_from(device_w).map_err(|_| too_large(device_w, device_h))?,
            u32::try_from(device_h).map_err(|_| too_large(device_w, device_h))?,
        );

        let oriented = mapping.apply(src);
        let placed = if oriented.dimensions() == (device_w, device_h) {
            oriented
        } else {
            resizer::resample(&oriented, device_w, device_h, self.filter)?
        };

        tracing::debug!(
            "Drawing {}x{} source as {}x{} at ({}, {}) {:?}",
            src.width(),
            src.height(),
            device_w,
            device_h,
            left,
            top,
            mapping
        );

        imageops::overlay(&mut self.pixels, &placed, left, top);
        Ok(())
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }
}

fn too_large(w: i64, h: i64) -> PipelineError {
    PipelineError::Argument(format!("draw of {}x{} exceeds canvas limits", w, h))
}
