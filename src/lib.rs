//! Photo sheet layout and export
//!
//! Packs photos at exact physical sizes onto fixed-size pages, bakes
//! rotations, flips, crops and background fills into opaque rasters, and
//! renders the same layout for an on-screen preview and a 300 DPI PDF.

pub mod color;
pub mod config;
pub mod error;
pub mod export;
pub mod packing;
pub mod presets;
pub mod raster;
pub mod render;
pub mod state;
pub mod transform;
pub mod units;

pub use color::Color;
pub use config::Config;
pub use error::{
    ConfigError, DecodeError, EditorError, EncodeError, ExportError, ExportItemError,
    InvalidDimensionError, PreferenceError, TransformError, UnplaceableItemError,
};
pub use export::{ExportOutput, Exporter};
pub use packing::{pack, photos_per_page, PackedLayout, PageGeometry, Placement};
pub use presets::SizePreset;
pub use raster::Raster;
pub use state::data::{PhotoId, PhotoItem, PhotoUpdate, TransformState};
pub use state::edit::{Alignment, Distribution, LayoutSettings, LayoutUpdate};
pub use state::editor::{BackgroundRemover, Editor, TransformOp, TransformOutcome};
pub use state::library::{Session, Snapshot};
pub use state::preferences::{FilePreferences, MemoryPreferences, PreferenceStore};
pub use transform::Orientation;
pub use units::{mm_to_pixels, pixels_to_mm, SizeMm, Unit};
