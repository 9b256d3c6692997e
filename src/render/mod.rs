/// Layout renderer shared by the on-screen preview and the exporter
///
/// One routine paints a page onto an RGB surface. The only thing that
/// differs between preview and export is `pixels_per_mm`; placement comes
/// from the packer and pixel content from the processed rasters, so both
/// outputs agree up to pixel density.

pub mod canvas;

use image::imageops::{self, FilterType};
use image::RgbImage;
use log::warn;

use crate::color::Color;
use crate::error::{ExportItemError, InvalidDimensionError};
use crate::packing::{slot_rect, PackedLayout, PageGeometry};
use crate::state::data::{PhotoId, PhotoItem, TransformState};
use crate::state::edit::LayoutSettings;
use crate::state::library::Snapshot;
use crate::transform::ops;
use crate::units::{pixels_per_mm, pixels_to_mm, RectMm, RectPx, EXPORT_DPI};

/// One slot painted on a page
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSlot {
    pub id: PhotoId,
    pub rect_mm: RectMm,
    pub rect_px: RectPx,
}

/// What `render_page` drew
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub page_index: usize,
    /// Every slot on the page, in item order, placeholders included
    pub slots: Vec<RenderedSlot>,
    /// Slots whose raster could not be decoded
    pub failures: Vec<(ExportItemError, RectMm)>,
}

/// Blank white surface covering a whole page at `pixels_per_mm`
pub fn page_surface(page: &PageGeometry, pixels_per_mm: f64) -> RgbImage {
    let size = RectMm::new(0.0, 0.0, page.width_mm, page.height_mm).to_pixels(pixels_per_mm);
    RgbImage::from_pixel(size.width.max(1), size.height.max(1), Color::WHITE.to_pixel())
}

/// Paint page `page_index` of `layout` onto `surface`
///
/// `items` and `layout.items` are index-aligned. Undecodable rasters become
/// background-colored placeholders and are reported, never propagated.
pub fn render_page(
    surface: &mut RgbImage,
    items: &[PhotoItem],
    layout: &PackedLayout,
    page_index: usize,
    settings: &LayoutSettings,
    pixels_per_mm: f64,
) -> RenderedPage {
    canvas::fill(surface, Color::WHITE);

    let outline_px = outline_band(settings.outline_width_px, pixels_per_mm);
    let mut rendered = RenderedPage {
        page_index,
        ..Default::default()
    };

    for index in layout.items_on_page(page_index) {
        let (Some(item), Some(placement)) = (items.get(index), layout.items[index].placement()) else {
            continue;
        };
        let rect_mm = slot_rect(placement, item.target_size);
        let rect_px = rect_mm.to_pixels(pixels_per_mm);

        if let Err(cause) = draw_photo(surface, item, rect_px) {
            warn!("⚠️  Photo {} could not be drawn: {}", item.id, cause);
            canvas::fill_rect(surface, rect_px, item.background);
            rendered
                .failures
                .push((ExportItemError { id: item.id, cause }, rect_mm));
        }

        if outline_px > 0 {
            canvas::stroke_inside(surface, rect_px, outline_px, settings.outline_color);
        }

        rendered.slots.push(RenderedSlot {
            id: item.id,
            rect_mm,
            rect_px,
        });
    }

    rendered
}

/// Render one page of a snapshot at `scale` times export resolution
pub fn render_preview(
    snapshot: &Snapshot,
    page_index: usize,
    scale: f64,
) -> Result<(RgbImage, RenderedPage), InvalidDimensionError> {
    InvalidDimensionError::check("preview scale", scale)?;
    let layout = snapshot.pack()?;
    let ppm = pixels_per_mm(snapshot.page.dpi) * scale;
    let mut surface = page_surface(&snapshot.page, ppm);
    let rendered = render_page(
        &mut surface,
        &snapshot.items,
        &layout,
        page_index,
        &snapshot.settings,
        ppm,
    );
    Ok((surface, rendered))
}

/// Outline width is configured in export pixels; convert through
/// millimeters so it keeps its physical size at any scale
fn outline_band(width_px: f64, pixels_per_mm: f64) -> u32 {
    if width_px <= 0.0 {
        return 0;
    }
    let band = (pixels_to_mm(width_px, EXPORT_DPI) * pixels_per_mm).round();
    band.max(1.0) as u32
}

fn draw_photo(
    surface: &mut RgbImage,
    item: &PhotoItem,
    rect: RectPx,
) -> Result<(), crate::error::DecodeError> {
    let decoded = item.processed.decode()?;
    if rect.width == 0 || rect.height == 0 {
        return Ok(());
    }

    let scaled = imageops::resize(&decoded.to_rgb8(), rect.width, rect.height, FilterType::Triangle);

    match item.transform {
        TransformState::Baked => canvas::blit(surface, &scaled, rect.x, rect.y, rect),
        TransformState::Pending(orientation) => {
            // Hint only: turn the fitted image about the slot center
            let rgba = image::DynamicImage::ImageRgb8(scaled).to_rgba8();
            let turned = ops::combine(
                &rgba,
                orientation.rotation,
                orientation.flip_horizontal,
                orientation.flip_vertical,
                item.background,
            );
            let x = rect.x + (rect.width as i64 - turned.width() as i64) / 2;
            let y = rect.y + (rect.height as i64 - turned.height() as i64) / 2;
            canvas::fill_rect(surface, rect, item.background);
            canvas::blit(surface, &turned, x, y, rect);
        }
    }
    Ok(())
}
