/// Sheet layout settings
///
/// One active instance per session. It is passed explicitly into the packer
/// and the renderer, and copied into export snapshots, so an edit made while
/// an export runs cannot leak into it.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::InvalidDimensionError;

/// Target for the "align selected" command
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Top,
}

/// Target for the "distribute selected" command
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Distribution {
    #[default]
    HorizontalTop,
    HorizontalCenter,
    HorizontalBottom,
    VerticalCenter,
}

/// All layout parameters for the sheet
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct LayoutSettings {
    // ========== Spacing ==========

    /// Gap between photos and from the page edges, in millimeters (>= 0)
    pub gap_mm: f64,

    // ========== Outline ==========

    /// Border color drawn over each photo
    pub outline_color: Color,

    /// Border width in export pixels (300 DPI); 0 disables the outline
    pub outline_width_px: f64,

    // ========== Arrange hints ==========

    /// Last alignment used by the arrange command
    pub alignment: Alignment,

    /// Last distribution used by the arrange command
    pub distribution: Distribution,
}

impl Default for LayoutSettings {
    /// 1mm gap, 1px black outline
    fn default() -> Self {
        Self {
            gap_mm: 1.0,
            outline_color: Color::BLACK,
            outline_width_px: 1.0,
            alignment: Alignment::Left,
            distribution: Distribution::HorizontalTop,
        }
    }
}

/// Partial update of the layout settings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutUpdate {
    pub gap_mm: Option<f64>,
    pub outline_color: Option<Color>,
    pub outline_width_px: Option<f64>,
    pub alignment: Option<Alignment>,
    pub distribution: Option<Distribution>,
}

impl LayoutSettings {
    /// Create default layout settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from a JSON string; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if every value is at its default
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Reset everything to defaults
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Gap and outline width must be finite and non-negative
    pub fn validate(&self) -> Result<(), InvalidDimensionError> {
        for (field, value) in [("gap", self.gap_mm), ("outline width", self.outline_width_px)] {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidDimensionError { field, value });
            }
        }
        Ok(())
    }

    /// Apply a partial update after validating the result
    pub fn apply(&mut self, update: LayoutUpdate) -> Result<(), InvalidDimensionError> {
        let mut next = *self;
        if let Some(gap) = update.gap_mm {
            next.gap_mm = gap;
        }
        if let Some(color) = update.outline_color {
            next.outline_color = color;
        }
        if let Some(width) = update.outline_width_px {
            next.outline_width_px = width;
        }
        if let Some(alignment) = update.alignment {
            next.alignment = alignment;
        }
        if let Some(distribution) = update.distribution {
            next.distribution = distribution;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}
