/// Transform engine
///
/// Takes an encoded raster plus a transform descriptor and produces a new
/// encoded raster with the transform baked in and an opaque background.
/// Inputs are never modified. The pixel kernels live in `ops`.

pub mod ops;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::task;

pub use ops::{normalize_degrees, rotated_size, CropRegion, PixelCrop};

use crate::color::Color;
use crate::error::{DecodeError, TransformError};
use crate::raster::Raster;

/// A rotation followed by optional flips
///
/// `rotation` is clockwise degrees in 0..360. Flips are applied after the
/// rotation, in the rotated frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub rotation: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Orientation {
    pub const IDENTITY: Orientation = Orientation {
        rotation: 0.0,
        flip_horizontal: false,
        flip_vertical: false,
    };

    pub fn is_identity(&self) -> bool {
        normalize_degrees(self.rotation) == 0.0 && !self.flip_horizontal && !self.flip_vertical
    }

    /// This orientation followed by a further clockwise rotation
    ///
    /// A single-axis mirror reverses the sense of any rotation applied after
    /// it, so the extra angle is subtracted in that case.
    pub fn then_rotate(self, degrees: f64) -> Self {
        let mirrored = self.flip_horizontal != self.flip_vertical;
        let rotation = if mirrored {
            self.rotation - degrees
        } else {
            self.rotation + degrees
        };
        Self {
            rotation: normalize_degrees(rotation),
            ..self
        }
    }

    /// This orientation followed by further flips
    pub fn then_flip(self, horizontal: bool, vertical: bool) -> Self {
        Self {
            flip_horizontal: self.flip_horizontal ^ horizontal,
            flip_vertical: self.flip_vertical ^ vertical,
            ..self
        }
    }
}

/// One pure raster operation
#[derive(Debug, Clone, PartialEq)]
pub enum RasterOp {
    /// Composite onto an opaque fill
    Background { color: Color },
    /// Clockwise rotation into the rotated bounding box
    Rotate { degrees: f64, color: Color },
    /// Mirror about the center axes
    Flip {
        horizontal: bool,
        vertical: bool,
        color: Color,
    },
    /// Rotation then flips in one pass
    Combine {
        orientation: Orientation,
        color: Color,
    },
    /// Aspect-locked crop, composited onto `color`
    CropToAspect {
        region: CropRegion,
        aspect_ratio: f64,
        color: Color,
    },
}

impl RasterOp {
    /// Decode, transform and re-encode
    pub fn apply(&self, raster: &Raster) -> Result<Raster, TransformError> {
        let source = raster.decode()?.to_rgba8();

        let output = match self {
            RasterOp::Background { color } => ops::apply_background(&source, *color),
            RasterOp::Rotate { degrees, color } => ops::rotate(&source, *degrees, *color),
            RasterOp::Flip {
                horizontal,
                vertical,
                color,
            } => ops::flip(&source, *horizontal, *vertical, *color),
            RasterOp::Combine { orientation, color } => ops::combine(
                &source,
                orientation.rotation,
                orientation.flip_horizontal,
                orientation.flip_vertical,
                *color,
            ),
            RasterOp::CropToAspect {
                region,
                aspect_ratio,
                color,
            } => {
                let cropped = ops::crop_to_aspect(&source, *region, *aspect_ratio)?;
                ops::apply_background(&cropped, *color)
            }
        };

        debug!(
            "🔄 {:?}: {}x{} -> {}x{}",
            self,
            source.width(),
            source.height(),
            output.width(),
            output.height()
        );
        Ok(Raster::encode(&output)?)
    }

    /// Run [`RasterOp::apply`] on the blocking pool
    pub async fn apply_async(self, raster: Raster) -> Result<Raster, TransformError> {
        task::spawn_blocking(move || self.apply(&raster))
            .await
            .map_err(|e| TransformError::Decode(DecodeError::Join(e.to_string())))?
    }
}

/// Fill with `color`, draw the raster on top
pub fn apply_background(raster: &Raster, color: Color) -> Result<Raster, TransformError> {
    RasterOp::Background { color }.apply(raster)
}

pub fn rotate(raster: &Raster, degrees: f64, color: Color) -> Result<Raster, TransformError> {
    RasterOp::Rotate { degrees, color }.apply(raster)
}

pub fn flip(
    raster: &Raster,
    horizontal: bool,
    vertical: bool,
    color: Color,
) -> Result<Raster, TransformError> {
    RasterOp::Flip {
        horizontal,
        vertical,
        color,
    }
    .apply(raster)
}

pub fn combine(
    raster: &Raster,
    rotation: f64,
    horizontal: bool,
    vertical: bool,
    color: Color,
) -> Result<Raster, TransformError> {
    RasterOp::Combine {
        orientation: Orientation {
            rotation,
            flip_horizontal: horizontal,
            flip_vertical: vertical,
        },
        color,
    }
    .apply(raster)
}

pub fn crop_to_aspect(
    raster: &Raster,
    region: CropRegion,
    aspect_ratio: f64,
    color: Color,
) -> Result<Raster, TransformError> {
    RasterOp::CropToAspect {
        region,
        aspect_ratio,
        color,
    }
    .apply(raster)
}
