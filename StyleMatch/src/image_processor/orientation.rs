//! EXIF orientation and the canvas transforms that undo it
//!
//! A camera stores pixels in sensor order and records in the EXIF
//! `Orientation` tag how they must be turned to look right. This module maps
//! each of the eight tags onto:
//!
//! - the *display* dimensions (width and height swapped for quarter turns)
//! - an ordered list of [`CanvasOp`]s which, applied to a canvas before the
//!   raw pixels are drawn at the origin, lands the image upright on
//!   `[0, display_width] x [0, display_height]`
//!
//! ```text
//!     1: Identity    2: FlipH       3: Rotate180   4: FlipV
//!     5: Transpose   6: Rotate90    7: Transverse  8: Rotate270
//! ```

/// One of the eight EXIF orientation states
///
/// Unknown or missing tags resolve to [`OrientationTag::Identity`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OrientationTag {
    #[default]
    Identity,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90,
    Transverse,
    Rotate270,
}

/// A single canvas transform step
///
/// Rotation is clockwise in a y-down coordinate system, in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasOp {
    Translate { dx: f32, dy: f32 },
    Scale { sx: f32, sy: f32 },
    Rotate { quarter_turns: u8 },
}

impl OrientationTag {
    /// All tags in EXIF order (index = EXIF value - 1)
    pub const ALL: [Self; 8] = [
        Self::Identity,
        Self::FlipHorizontal,
        Self::Rotate180,
        Self::FlipVertical,
        Self::Transpose,
        Self::Rotate90,
        Self::Transverse,
        Self::Rotate270,
    ];

    /// Map an EXIF `Orientation` value; anything outside 1..=8 is identity
    pub fn from_exif(value: u32) -> Self {
        match value {
            1..=8 => Self::ALL[(value - 1) as usize],
            _ => Self::Identity,
        }
    }

    pub fn exif_value(self) -> u8 {
        match self {
            Self::Identity => 1,
            Self::FlipHorizontal => 2,
            Self::Rotate180 => 3,
            Self::FlipVertical => 4,
            Self::Transpose => 5,
            Self::Rotate90 => 6,
            Self::Transverse => 7,
            Self::Rotate270 => 8,
        }
    }

    /// Tags 5-8 turn the image on its side and swap width and height
    pub fn is_quarter_turn(self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rotate90 | Self::Transverse | Self::Rotate270
        )
    }

    pub fn display_dimensions(self, raw_width: u32, raw_height: u32) -> (u32, u32) {
        if self.is_quarter_turn() {
            (raw_height, raw_width)
        } else {
            (raw_width, raw_height)
        }
    }

    /// Canvas operations that correct this orientation for a raw `w x h` image
    ///
    /// Offsets are computed from the raw (unscaled) dimensions; a caller that
    /// scales must push its scale before these operations.
    pub fn correction(self, raw_width: u32, raw_height: u32) -> Vec<CanvasOp> {
        let w = raw_width as f32;
        let h = raw_height as f32;

        match self {
            Self::Identity => vec![],
            Self::FlipHorizontal => vec![translate(w, 0.0), scale(-1.0, 1.0)],
            Self::Rotate180 => vec![translate(w, h), rotate(2)],
            Self::FlipVertical => vec![translate(0.0, h), scale(1.0, -1.0)],
            Self::Transpose => vec![rotate(1), scale(1.0, -1.0)],
            Self::Rotate90 => vec![translate(h, 0.0), rotate(1)],
            Self::Transverse => vec![translate(h, w), rotate(3), scale(1.0, -1.0)],
            Self::Rotate270 => vec![translate(0.0, w), rotate(3)],
        }
    }
}

fn translate(dx: f32, dy: f32) -> CanvasOp {
    CanvasOp::Translate { dx, dy }
}

fn scale(sx: f32, sy: f32) -> CanvasOp {
    CanvasOp::Scale { sx, sy }
}

fn rotate(quarter_turns: u8) -> CanvasOp {
    CanvasOp::Rotate { quarter_turns }
}

/// Encoded and display dimensions of one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub encoded_width: u32,
    pub encoded_height: u32,
    pub display_width: u32,
    pub display_height: u32,
    pub orientation: OrientationTag,
}

impl Geometry {
    pub fn new(encoded_width: u32, encoded_height: u32, orientation: OrientationTag) -> Self {
        let (display_width, display_height) =
            orientation.display_dimensions(encoded_width, encoded_height);
        Self {
            encoded_width,
            encoded_height,
            display_width,
            display_height,
            orientation,
        }
    }

    pub fn correction(&self) -> Vec<CanvasOp> {
        self.orientation
            .correction(self.encoded_width, self.encoded_height)
    }
}
