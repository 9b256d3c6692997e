/// Error types shared across the crate
///
/// Per-photo failures (decode, unplaceable, export slot) never fail a whole
/// batch. Only structural problems surface as hard errors.

use thiserror::Error;

use crate::state::data::PhotoId;

/// A raster could not be loaded or parsed
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error("could not detect image format: {0}")]
    Format(String),
    #[error("failed to decode image: {0}")]
    Image(String),
    #[error("image has zero width or height")]
    Empty,
    #[error("background task failed: {0}")]
    Join(String),
}

impl From<image::ImageError> for DecodeError {
    fn from(error: image::ImageError) -> Self {
        DecodeError::Image(error.to_string())
    }
}

/// A baked raster could not be re-encoded
#[derive(Debug, Clone, Error)]
#[error("failed to encode image: {0}")]
pub struct EncodeError(pub String);

/// Non-positive (or non-finite) size handed to packing, resize or crop
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {field}: {value} (must be a positive finite number)")]
pub struct InvalidDimensionError {
    pub field: &'static str,
    pub value: f64,
}

impl InvalidDimensionError {
    /// Check a single dimension, returning it unchanged when valid
    pub fn check(field: &'static str, value: f64) -> Result<f64, Self> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(Self { field, value })
        }
    }
}

/// An item that can never fit on a page, even on an empty one
///
/// The packer reports this as a value next to the placements; it is not
/// raised.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("item {index} ({width}x{height}mm) exceeds the usable page area {usable_width}x{usable_height}mm")]
pub struct UnplaceableItemError {
    pub index: usize,
    pub width: f64,
    pub height: f64,
    pub usable_width: f64,
    pub usable_height: f64,
}

/// Errors raised by any transform step
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    InvalidDimension(#[from] InvalidDimensionError),
    #[error("invalid color '{0}'")]
    InvalidColor(String),
}

/// One photo failed to embed during export
#[derive(Debug, Clone, Error)]
#[error("photo {id} could not be embedded: {cause}")]
pub struct ExportItemError {
    pub id: PhotoId,
    pub cause: DecodeError,
}

/// Hard export failures that abort the whole document
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export: the photo list is empty")]
    Empty,
    #[error("no photo fits on a page")]
    NothingPlaceable,
    #[error(transparent)]
    InvalidDimension(#[from] InvalidDimensionError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("PDF generation failed: {0}")]
    Pdf(String),
    #[error("failed to write document: {0}")]
    Io(#[from] std::io::Error),
    #[error("background task failed: {0}")]
    Join(String),
}

/// Errors from the interactive editor / session store
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no photo with id {0}")]
    UnknownPhoto(PhotoId),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    InvalidDimension(#[from] InvalidDimensionError),
    #[error("rotation must be a finite number of degrees, got {0}")]
    InvalidRotation(f64),
    #[error("background removal failed: {0}")]
    BackgroundRemoval(String),
    #[error("no API key available for background removal")]
    MissingApiKey,
    #[error(transparent)]
    Preference(#[from] PreferenceError),
    #[error("background task failed: {0}")]
    Join(String),
}

impl From<DecodeError> for EditorError {
    fn from(error: DecodeError) -> Self {
        EditorError::Transform(TransformError::Decode(error))
    }
}

/// Config file problems
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Preference store problems
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to access preference file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed preference file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not determine a preference directory")]
    NoDirectory,
}
