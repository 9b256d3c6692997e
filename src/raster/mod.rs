/// Encoded raster handling
///
/// This module handles:
/// - Holding encoded image bytes immutably and cheaply cloneable (loader.rs
///   adds the async side)
/// - Decoding with format detection
/// - Re-encoding baked results losslessly as PNG

pub mod loader;

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};

use crate::error::{DecodeError, EncodeError};

/// Encoded image bytes (JPEG, PNG, WebP, ...)
///
/// Rasters are never written in place. Every edit produces a new `Raster`
/// and clones share the same buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    bytes: Arc<[u8]>,
}

impl Raster {
    /// Wrap encoded bytes without decoding them
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode into pixels, guessing the format from the content
    pub fn decode(&self) -> Result<DynamicImage, DecodeError> {
        let image = ImageReader::new(Cursor::new(&self.bytes[..]))
            .with_guessed_format()
            .map_err(|e| DecodeError::Format(e.to_string()))?
            .decode()?;

        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::Empty);
        }
        Ok(image)
    }

    /// Read only the header to get the pixel size
    pub fn dimensions(&self) -> Result<(u32, u32), DecodeError> {
        let (width, height) = ImageReader::new(Cursor::new(&self.bytes[..]))
            .with_guessed_format()
            .map_err(|e| DecodeError::Format(e.to_string()))?
            .into_dimensions()?;

        if width == 0 || height == 0 {
            return Err(DecodeError::Empty);
        }
        Ok((width, height))
    }

    /// Encode an opaque RGB buffer as PNG
    pub fn encode(image: &RgbImage) -> Result<Self, EncodeError> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| EncodeError(e.to_string()))?;
        Ok(Self::from_bytes(buffer))
    }

    /// Encode any decoded image as PNG, keeping its alpha channel
    pub fn encode_dynamic(image: &DynamicImage) -> Result<Self, EncodeError> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| EncodeError(e.to_string()))?;
        Ok(Self::from_bytes(buffer))
    }
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("bytes", &self.bytes.len())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_decode_png() {
        let raster = pattern_raster(7, 5);
        let image = raster.decode().unwrap();
        assert_eq!((image.width(), image.height()), (7, 5));
        assert_eq!(raster.dimensions().unwrap(), (7, 5));
    }

    #[test]
    fn test_decode_corrupt_fails() {
        let raster = corrupt_raster();
        assert!(raster.decode().is_err());
        assert!(raster.dimensions().is_err());
    }

    #[test]
    fn test_encode_is_lossless() {
        let rgb = DynamicImage::ImageRgba8(pattern(9, 4)).to_rgb8();
        let raster = Raster::encode(&rgb).unwrap();
        assert_eq!(raster.decode().unwrap().to_rgb8(), rgb);
    }

    #[test]
    fn test_clones_share_buffer() {
        let raster = pattern_raster(3, 3);
        let copy = raster.clone();
        assert!(std::ptr::eq(raster.bytes().as_ptr(), copy.bytes().as_ptr()));
    }
}
