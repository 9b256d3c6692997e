/// Pixel kernels for the transform engine
///
/// Every kernel reads an RGBA source and writes a fresh RGB buffer filled
/// with the background color first, so the output cannot carry alpha.
///
/// Geometry follows a 2D canvas: the output is the bounding box of the
/// rotated source, the source is drawn centered, and out-of-source pixels keep
/// the background. Sampling is nearest-neighbour at pixel centers, which keeps
/// right-angle rotations and flips lossless.

use cgmath::{Matrix2, Vector2};
use image::{imageops, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::InvalidDimensionError;

/// Slack for floating point noise in bounding box sizes
const SIZE_EPSILON: f64 = 1e-6;

/// Sub-rectangle of a source raster, in source pixels
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    /// The whole raster
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f64,
            height: height as f64,
        }
    }
}

/// Integer crop rectangle after clamping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelCrop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Normalize degrees into 0..360
pub fn normalize_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// (cos θ, sin θ), exact for right angles
fn cos_sin(degrees: f64) -> (f64, f64) {
    let degrees = normalize_degrees(degrees);
    if degrees == 0.0 {
        (1.0, 0.0)
    } else if degrees == 90.0 {
        (0.0, 1.0)
    } else if degrees == 180.0 {
        (-1.0, 0.0)
    } else if degrees == 270.0 {
        (0.0, -1.0)
    } else {
        let radians = degrees.to_radians();
        (radians.cos(), radians.sin())
    }
}

/// Pixel size of the bounding box of a `width`x`height` raster rotated by `degrees`
///
/// `outW = w·|cos θ| + h·|sin θ|`, `outH = w·|sin θ| + h·|cos θ|`, truncated
/// like a canvas size. Right angles swap width and height exactly.
pub fn rotated_size(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let (cos, sin) = cos_sin(degrees);
    let (w, h) = (width as f64, height as f64);
    let out_w = w * cos.abs() + h * sin.abs();
    let out_h = w * sin.abs() + h * cos.abs();
    (
        ((out_w + SIZE_EPSILON).floor() as u32).max(1),
        ((out_h + SIZE_EPSILON).floor() as u32).max(1),
    )
}

/// Fill the output with `color`, then draw `src` on top
pub fn apply_background(src: &RgbaImage, color: Color) -> RgbImage {
    RgbImage::from_fn(src.width(), src.height(), |x, y| {
        color.composite_pixel(*src.get_pixel(x, y))
    })
}

/// Inverse mapping from output pixels back into a rotated source
struct RotationSampler<'a> {
    src: &'a RgbaImage,
    inverse: Matrix2<f64>,
    out_center: Vector2<f64>,
    src_center: Vector2<f64>,
    background: Color,
}

impl<'a> RotationSampler<'a> {
    fn new(src: &'a RgbaImage, degrees: f64, out_w: u32, out_h: u32, background: Color) -> Self {
        let (cos, sin) = cos_sin(degrees);
        // Transpose of the forward rotation (column-major)
        let inverse = Matrix2::new(cos, -sin, sin, cos);
        Self {
            src,
            inverse,
            out_center: Vector2::new(out_w as f64 / 2.0, out_h as f64 / 2.0),
            src_center: Vector2::new(src.width() as f64 / 2.0, src.height() as f64 / 2.0),
            background,
        }
    }

    fn sample(&self, x: u32, y: u32) -> Rgb<u8> {
        let offset = Vector2::new(x as f64 + 0.5, y as f64 + 0.5) - self.out_center;
        let local = self.inverse * offset + self.src_center;
        let (sx, sy) = (local.x.floor(), local.y.floor());

        if sx >= 0.0
            && sy >= 0.0
            && sx < self.src.width() as f64
            && sy < self.src.height() as f64
        {
            self.background
                .composite_pixel(*self.src.get_pixel(sx as u32, sy as u32))
        } else {
            self.background.to_pixel()
        }
    }
}

/// Rotate clockwise by `degrees` into a background-filled bounding box
pub fn rotate(src: &RgbaImage, degrees: f64, color: Color) -> RgbImage {
    let (out_w, out_h) = rotated_size(src.width(), src.height(), degrees);
    let sampler = RotationSampler::new(src, degrees, out_w, out_h, color);
    RgbImage::from_fn(out_w, out_h, |x, y| sampler.sample(x, y))
}

/// Mirror about the vertical (`horizontal`) and/or horizontal (`vertical`) center axis
pub fn flip(src: &RgbaImage, horizontal: bool, vertical: bool, color: Color) -> RgbImage {
    let (w, h) = src.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let (sx, sy) = mirror(x, y, w, h, horizontal, vertical);
        color.composite_pixel(*src.get_pixel(sx, sy))
    })
}

/// Rotation followed by flips, in a single pass with no intermediate buffer
///
/// Output is identical to `flip(rotate(src, degrees), horizontal, vertical)`:
/// each output pixel is mirrored inside the rotated box first, then sampled
/// through the rotation.
pub fn combine(
    src: &RgbaImage,
    degrees: f64,
    horizontal: bool,
    vertical: bool,
    color: Color,
) -> RgbImage {
    let (out_w, out_h) = rotated_size(src.width(), src.height(), degrees);
    let sampler = RotationSampler::new(src, degrees, out_w, out_h, color);
    RgbImage::from_fn(out_w, out_h, |x, y| {
        let (mx, my) = mirror(x, y, out_w, out_h, horizontal, vertical);
        sampler.sample(mx, my)
    })
}

fn mirror(x: u32, y: u32, w: u32, h: u32, horizontal: bool, vertical: bool) -> (u32, u32) {
    (
        if horizontal { w - 1 - x } else { x },
        if vertical { h - 1 - y } else { y },
    )
}

/// Narrow `region` to `aspect_ratio` (width / height) and clamp it inside
/// a `width`x`height` raster
///
/// The side that is too long relative to the target ratio is shortened. If
/// the result still does not fit, it shrinks (keeping the ratio) and is
/// pushed back inside the raster.
pub fn clamp_crop(
    region: CropRegion,
    aspect_ratio: f64,
    width: u32,
    height: u32,
) -> Result<PixelCrop, InvalidDimensionError> {
    let ratio = InvalidDimensionError::check("aspect ratio", aspect_ratio)?;
    InvalidDimensionError::check("crop width", region.width)?;
    InvalidDimensionError::check("crop height", region.height)?;

    let (img_w, img_h) = (width as f64, height as f64);

    let mut crop_w = region.width.min(region.height * ratio);
    let mut crop_h = crop_w / ratio;
    if crop_w > img_w {
        crop_w = img_w;
        crop_h = crop_w / ratio;
    }
    if crop_h > img_h {
        crop_h = img_h;
        crop_w = crop_h * ratio;
    }

    let x = region.x.max(0.0).min(img_w - crop_w);
    let y = region.y.max(0.0).min(img_h - crop_h);

    let px = (x.round() as u32).min(width - 1);
    let py = (y.round() as u32).min(height - 1);
    let pw = (crop_w.round() as u32).clamp(1, width - px);
    let ph = (crop_h.round() as u32).clamp(1, height - py);

    Ok(PixelCrop {
        x: px,
        y: py,
        width: pw,
        height: ph,
    })
}

/// Copy out the aspect-locked crop of `src`
///
/// Alpha is preserved here; callers composite onto the background next.
pub fn crop_to_aspect(
    src: &RgbaImage,
    region: CropRegion,
    aspect_ratio: f64,
) -> Result<RgbaImage, InvalidDimensionError> {
    let crop = clamp_crop(region, aspect_ratio, src.width(), src.height())?;
    Ok(imageops::crop_imm(src, crop.x, crop.y, crop.width, crop.height).to_image())
}
