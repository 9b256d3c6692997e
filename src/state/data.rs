/// Shared data structures for the session state
///
/// These structs represent the data model that flows between the session
/// store, the packer, the renderer and the exporter.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::raster::Raster;
use crate::transform::{CropRegion, Orientation};
use crate::units::SizeMm;

/// Opaque photo identifier, stable for the photo's lifetime
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhotoId(pub u64);

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether the processed raster already reflects every requested transform
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TransformState {
    /// Everything is baked into `processed`
    #[default]
    Baked,
    /// Requested but not baked; renderers apply it as a drawing hint
    Pending(Orientation),
}

impl TransformState {
    pub fn pending(&self) -> Orientation {
        match self {
            TransformState::Baked => Orientation::IDENTITY,
            TransformState::Pending(orientation) => *orientation,
        }
    }

    /// Collapse an identity pending transform back to `Baked`
    pub fn from_orientation(orientation: Orientation) -> Self {
        if orientation.is_identity() {
            TransformState::Baked
        } else {
            TransformState::Pending(orientation)
        }
    }
}

/// Manual position override in millimeters (multi-select arrange commands)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct ManualPosition {
    pub x: f64,
    pub y: f64,
    pub page: usize,
}

/// One photograph in the session
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoItem {
    pub id: PhotoId,
    /// Original encoded bytes, never modified
    pub source: Raster,
    /// Current bytes with all baked transforms, always opaque
    pub processed: Raster,
    /// Pixel size of `source`
    pub source_size: (u32, u32),
    /// Printed size
    pub target_size: SizeMm,
    pub transform: TransformState,
    pub background: Color,
    /// Region of `source` used when re-deriving `processed`
    pub crop: CropRegion,
    /// Lineage counter for duplicates, starts at 1
    pub duplicate_count: u32,
    /// Set by align/distribute; the packer ignores it
    pub position: Option<ManualPosition>,
}

/// Partial update of a photo; `None` leaves a field unchanged
///
/// Only plain fields are covered. Raster changes go through the transform
/// queue so the raster and its transform state change together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoUpdate {
    pub target_size: Option<SizeMm>,
    pub background: Option<Color>,
    pub pending: Option<Orientation>,
    pub crop: Option<CropRegion>,
    pub position: Option<Option<ManualPosition>>,
}

impl PhotoItem {
    /// Apply a partial update, returning the new item
    pub fn updated(&self, update: &PhotoUpdate) -> PhotoItem {
        let mut next = self.clone();
        if let Some(size) = update.target_size {
            next.target_size = size;
        }
        if let Some(color) = update.background {
            next.background = color;
        }
        if let Some(orientation) = update.pending {
            next.transform = TransformState::from_orientation(orientation);
        }
        if let Some(crop) = update.crop {
            next.crop = crop;
        }
        if let Some(position) = update.position {
            next.position = position;
        }
        next
    }

    /// Copy under a new id with the given lineage counter
    pub fn duplicate(&self, id: PhotoId, duplicate_count: u32) -> PhotoItem {
        PhotoItem {
            id,
            duplicate_count,
            ..self.clone()
        }
    }
}
