/// Async raster loading
///
/// Decoding is CPU-bound, so it runs on tokio's blocking pool. Callers await
/// a result instead of stalling the event loop.

use std::path::Path;

use image::DynamicImage;
use log::debug;
use tokio::task;

use super::Raster;
use crate::error::DecodeError;

/// Decode a raster without blocking the async runtime
pub async fn decode(raster: Raster) -> Result<DynamicImage, DecodeError> {
    // Spawn blocking because decoding large JPEGs is CPU-intensive
    task::spawn_blocking(move || raster.decode())
        .await
        .map_err(|e| DecodeError::Join(e.to_string()))?
}

/// Read an image file from disk and check that it decodes
///
/// Returns the raster together with its pixel size.
pub async fn load_file(path: &Path) -> Result<(Raster, u32, u32), DecodeError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DecodeError::Image(format!("failed to read {}: {}", path.display(), e)))?;

    let raster = Raster::from_bytes(bytes);
    let bytes = raster.clone();
    let (width, height) = task::spawn_blocking(move || bytes.dimensions())
        .await
        .map_err(|e| DecodeError::Join(e.to_string()))??;

    debug!("📷 Loaded {} ({}x{}, {} bytes)", path.display(), width, height, raster.len());
    Ok((raster, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::fixtures::{corrupt_raster, pattern_raster};

    #[tokio::test]
    async fn test_decode_async() {
        let image = decode(pattern_raster(4, 6)).await.unwrap();
        assert_eq!((image.width(), image.height()), (4, 6));
    }

    #[tokio::test]
    async fn test_decode_async_corrupt() {
        assert!(decode(corrupt_raster()).await.is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        // Same contract as any decode failure: an error, never a panic
        let result = load_file(Path::new("/nonexistent/path.png")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, pattern_raster(8, 3).bytes()).unwrap();

        let (raster, width, height) = load_file(&path).await.unwrap();
        assert_eq!((width, height), (8, 3));
        assert!(!raster.is_empty());
    }
}
