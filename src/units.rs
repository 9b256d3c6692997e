/// Physical unit conversions and rectangle math
///
/// All placement math is done in millimeters at full precision. Pixel values
/// only appear at the edge, when a layout is rasterized at a given density.

use serde::{Deserialize, Serialize};

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Fixed print resolution used for export
pub const EXPORT_DPI: f64 = 300.0;

/// Convert millimeters to pixels at the given density
pub fn mm_to_pixels(mm: f64, dpi: f64) -> f64 {
    mm * dpi / MM_PER_INCH
}

/// Convert pixels back to millimeters (exact inverse of [`mm_to_pixels`])
pub fn pixels_to_mm(pixels: f64, dpi: f64) -> f64 {
    pixels * MM_PER_INCH / dpi
}

/// Pixels per millimeter at a density
pub fn pixels_per_mm(dpi: f64) -> f64 {
    dpi / MM_PER_INCH
}

/// Round to 2 decimal places, for display values only
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Length unit accepted from the user
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Mm,
    Inch,
}

impl Unit {
    /// Convert a value expressed in this unit to millimeters
    pub fn to_mm(self, value: f64) -> f64 {
        match self {
            Unit::Mm => value,
            Unit::Inch => value * MM_PER_INCH,
        }
    }

    /// Convert millimeters into this unit
    pub fn from_mm(self, mm: f64) -> f64 {
        match self {
            Unit::Mm => mm,
            Unit::Inch => mm / MM_PER_INCH,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Mm => "mm",
            Unit::Inch => "in",
        }
    }
}

/// Width and height in millimeters
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SizeMm {
    pub width: f64,
    pub height: f64,
}

impl SizeMm {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Physical size of a pixel raster printed at `dpi`, rounded for display
    pub fn from_pixels(width_px: u32, height_px: u32, dpi: f64) -> Self {
        Self {
            width: round2(pixels_to_mm(width_px as f64, dpi)),
            height: round2(pixels_to_mm(height_px as f64, dpi)),
        }
    }
}

/// Axis-aligned rectangle in millimeters, origin at the page's top-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectMm {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RectMm {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether two rectangles share any interior area
    pub fn overlaps(&self, other: &RectMm) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Rasterize at `pixels_per_mm`.
    ///
    /// Each edge is rounded on its own so neighbouring rectangles keep the
    /// same gap in pixels regardless of where they sit on the page.
    pub fn to_pixels(&self, pixels_per_mm: f64) -> RectPx {
        let left = (self.x * pixels_per_mm).round() as i64;
        let top = (self.y * pixels_per_mm).round() as i64;
        let right = (self.right() * pixels_per_mm).round() as i64;
        let bottom = (self.bottom() * pixels_per_mm).round() as i64;
        RectPx {
            x: left,
            y: top,
            width: (right - left).max(0) as u32,
            height: (bottom - top).max(0) as u32,
        }
    }
}

/// Rectangle in device pixels (may start off-surface)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectPx {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}
