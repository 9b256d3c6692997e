/// Drawing primitives on an RGB surface
///
/// Every primitive clips against the surface, so callers may pass
/// rectangles that hang off the page.

use image::RgbImage;

use crate::color::Color;
use crate::units::RectPx;

/// Paint the whole surface
pub fn fill(surface: &mut RgbImage, color: Color) {
    let pixel = color.to_pixel();
    for p in surface.pixels_mut() {
        *p = pixel;
    }
}

pub fn fill_rect(surface: &mut RgbImage, rect: RectPx, color: Color) {
    let Some((x0, y0, x1, y1)) = clip(surface, rect) else {
        return;
    };
    let pixel = color.to_pixel();
    for y in y0..y1 {
        for x in x0..x1 {
            surface.put_pixel(x, y, pixel);
        }
    }
}

/// Border band of `width` pixels drawn just inside `rect`
pub fn stroke_inside(surface: &mut RgbImage, rect: RectPx, width: u32, color: Color) {
    if width == 0 || rect.width == 0 || rect.height == 0 {
        return;
    }
    let band_h = width.min(rect.height);
    let band_w = width.min(rect.width);

    let top = RectPx { height: band_h, ..rect };
    let bottom = RectPx {
        y: rect.y + (rect.height - band_h) as i64,
        height: band_h,
        ..rect
    };
    let left = RectPx { width: band_w, ..rect };
    let right = RectPx {
        x: rect.x + (rect.width - band_w) as i64,
        width: band_w,
        ..rect
    };
    for band in [top, bottom, left, right] {
        fill_rect(surface, band, color);
    }
}

/// Copy `image` with its top-left corner at `(x, y)`, drawing only inside
/// `clip_to`
pub fn blit(surface: &mut RgbImage, image: &RgbImage, x: i64, y: i64, clip_to: RectPx) {
    let placed = RectPx {
        x,
        y,
        width: image.width(),
        height: image.height(),
    };
    let Some((x0, y0, x1, y1)) = clip(surface, intersect(placed, clip_to)) else {
        return;
    };
    for py in y0..y1 {
        for px in x0..x1 {
            let sx = (px as i64 - x) as u32;
            let sy = (py as i64 - y) as u32;
            surface.put_pixel(px, py, *image.get_pixel(sx, sy));
        }
    }
}

fn intersect(a: RectPx, b: RectPx) -> RectPx {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = (a.x + a.width as i64).min(b.x + b.width as i64);
    let y1 = (a.y + a.height as i64).min(b.y + b.height as i64);
    RectPx {
        x: x0,
        y: y0,
        width: (x1 - x0).max(0) as u32,
        height: (y1 - y0).max(0) as u32,
    }
}

/// Visible part of `rect` as `(x0, y0, x1, y1)`, end-exclusive
fn clip(surface: &RgbImage, rect: RectPx) -> Option<(u32, u32, u32, u32)> {
    let x0 = rect.x.max(0);
    let y0 = rect.y.max(0);
    let x1 = (rect.x + rect.width as i64).min(surface.width() as i64);
    let y1 = (rect.y + rect.height as i64).min(surface.height() as i64);
    if x0 >= x1 || y0 >= y1 {
        None
    } else {
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const RED: Color = Color::rgb(255, 0, 0);

    fn rect(x: i64, y: i64, width: u32, height: u32) -> RectPx {
        RectPx { x, y, width, height }
    }

    #[test]
    fn test_fill_rect_clips_to_surface() {
        let mut surface = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        fill_rect(&mut surface, rect(-2, 2, 4, 10), RED);
        assert_eq!(surface.get_pixel(0, 3), &Rgb([255, 0, 0]));
        assert_eq!(surface.get_pixel(1, 2), &Rgb([255, 0, 0]));
        assert_eq!(surface.get_pixel(2, 2), &Rgb([255, 255, 255]));
        assert_eq!(surface.get_pixel(0, 1), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_fill_rect_off_surface_is_noop() {
        let mut surface = RgbImage::new(3, 3);
        fill_rect(&mut surface, rect(5, 5, 2, 2), RED);
        fill_rect(&mut surface, rect(0, 0, 0, 3), RED);
        assert!(surface.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_stroke_stays_inside() {
        let mut surface = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        stroke_inside(&mut surface, rect(2, 2, 6, 6), 2, Color::BLACK);
        let black = Rgb([0, 0, 0]);
        let white = Rgb([255, 255, 255]);
        assert_eq!(surface.get_pixel(2, 2), &black);
        assert_eq!(surface.get_pixel(3, 5), &black);
        assert_eq!(surface.get_pixel(7, 7), &black);
        assert_eq!(surface.get_pixel(4, 4), &white);
        assert_eq!(surface.get_pixel(1, 1), &white);
        assert_eq!(surface.get_pixel(8, 5), &white);
    }

    #[test]
    fn test_blit_respects_clip() {
        let mut surface = RgbImage::new(6, 6);
        let image = RgbImage::from_fn(4, 4, |x, y| Rgb([x as u8, y as u8, 9]));
        blit(&mut surface, &image, 1, 1, rect(2, 2, 2, 2));
        assert_eq!(surface.get_pixel(2, 2), &Rgb([1, 1, 9]));
        assert_eq!(surface.get_pixel(3, 3), &Rgb([2, 2, 9]));
        assert_eq!(surface.get_pixel(1, 1), &Rgb([0, 0, 0]));
        assert_eq!(surface.get_pixel(4, 4), &Rgb([0, 0, 0]));
    }
}
