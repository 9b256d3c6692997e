/// PDF export
///
/// Every page is painted by the shared layout renderer onto a surface at
/// the page's export resolution, then embedded full-bleed. A photo that
/// cannot be decoded gets a placeholder and an "Image Error" label; it is
/// reported in the summary and never fails the document.

use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;
use image::codecs::jpeg::JpegEncoder;
use printpdf::{
    BuiltinFont, ColorBits, ColorSpace, Image, ImageFilter, ImageTransform, ImageXObject,
    IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Px, Rgb,
};
use tokio::task;

use crate::error::{EncodeError, ExportError, ExportItemError};
use crate::render::{self, RenderedPage};
use crate::state::data::PhotoId;
use crate::state::library::Snapshot;
use crate::units::{pixels_per_mm, pixels_to_mm, RectMm};

const ERROR_LABEL: &str = "Image Error";
const LABEL_FONT_SIZE: f32 = 8.0;
/// Helvetica advance width of `ERROR_LABEL` at 8pt
const LABEL_WIDTH_MM: f64 = 14.9;
const LABEL_GREY: f32 = 0.45;
/// Page surfaces are embedded as baseline JPEG
const PAGE_JPEG_QUALITY: u8 = 92;

/// Result of a finished export
#[derive(Debug, Clone)]
pub struct ExportOutput {
    /// The serialized PDF
    pub bytes: Vec<u8>,
    /// Suggested file name, `photo-sheet-YYYY-MM-DDTHH-MM-SS.pdf`
    pub file_name: String,
    /// Photo ids drawn on each page, placeholders included
    pub pages: Vec<Vec<PhotoId>>,
    /// Photos replaced by a placeholder
    pub failures: Vec<ExportItemError>,
    /// Photos too large for the page, left out of the document
    pub unplaceable: Vec<PhotoId>,
}

impl ExportOutput {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Ids of the photos that failed to embed
    pub fn failed(&self) -> Vec<PhotoId> {
        self.failures.iter().map(|failure| failure.id).collect()
    }

    /// Write the PDF into `dir` under `file_name`
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, &self.bytes).await?;
        info!("💾 Saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// Timestamped default file name in local time
pub fn default_file_name() -> String {
    format!("photo-sheet-{}.pdf", Local::now().format("%Y-%m-%dT%H-%M-%S"))
}

/// Builds PDF documents from session snapshots
#[derive(Debug, Clone)]
pub struct Exporter {
    title: String,
}

impl Exporter {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }

    /// Export on the blocking pool
    ///
    /// The snapshot is owned by the task, so edits made while it runs never
    /// show up in the document.
    pub async fn export(&self, snapshot: Snapshot) -> Result<ExportOutput, ExportError> {
        let title = self.title.clone();
        task::spawn_blocking(move || build_document(&title, &snapshot))
            .await
            .map_err(|e| ExportError::Join(e.to_string()))?
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new("Photo Sheet")
    }
}

/// Render and serialize every page of `snapshot`
pub fn build_document(title: &str, snapshot: &Snapshot) -> Result<ExportOutput, ExportError> {
    if snapshot.items.is_empty() {
        return Err(ExportError::Empty);
    }
    let layout = snapshot.pack()?;
    let page_count = layout.page_count();
    if page_count == 0 {
        return Err(ExportError::NothingPlaceable);
    }

    let page = snapshot.page;
    let ppm = pixels_per_mm(page.dpi);
    let (width, height) = (Mm(page.width_mm as f32), Mm(page.height_mm as f32));

    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(format!("{e:?}")))?;

    let mut pages = Vec::with_capacity(page_count);
    let mut failures = Vec::new();

    for page_index in 0..page_count {
        let layer = if page_index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (new_page, new_layer) = doc.add_page(width, height, "Layer 1");
            doc.get_page(new_page).get_layer(new_layer)
        };

        let mut surface = render::page_surface(&page, ppm);
        let rendered = render::render_page(
            &mut surface,
            &snapshot.items,
            &layout,
            page_index,
            &snapshot.settings,
            ppm,
        );

        embed_surface(&layer, &surface, page.dpi, page.width_mm, page.height_mm)?;
        label_failures(&layer, &font, &rendered, page.height_mm);

        pages.push(rendered.slots.iter().map(|slot| slot.id).collect());
        failures.extend(rendered.failures.into_iter().map(|(error, _)| error));
    }

    let mut bytes = Vec::new();
    {
        let mut writer = BufWriter::new(Cursor::new(&mut bytes));
        doc.save(&mut writer)
            .map_err(|e| ExportError::Pdf(format!("{e:?}")))?;
    }

    let unplaceable: Vec<PhotoId> = layout
        .unplaceable()
        .iter()
        .filter_map(|error| snapshot.items.get(error.index).map(|item| item.id))
        .collect();

    info!(
        "✅ Exported {} page(s), {} photo(s) failed, {} unplaceable",
        page_count,
        failures.len(),
        unplaceable.len()
    );

    Ok(ExportOutput {
        bytes,
        file_name: default_file_name(),
        pages,
        failures,
        unplaceable,
    })
}

/// Compress a page surface for embedding with the DCT filter
fn encode_jpeg(surface: &image::RgbImage) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, PAGE_JPEG_QUALITY)
        .encode_image(surface)
        .map_err(|e| EncodeError(e.to_string()))?;
    Ok(bytes)
}

/// Place the rendered surface so it covers the whole page
fn embed_surface(
    layer: &PdfLayerReference,
    surface: &image::RgbImage,
    dpi: f64,
    page_width_mm: f64,
    page_height_mm: f64,
) -> Result<(), ExportError> {
    let (width_px, height_px) = surface.dimensions();
    let image = Image::from(ImageXObject {
        width: Px(width_px as usize),
        height: Px(height_px as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: false,
        image_data: encode_jpeg(surface)?,
        image_filter: Some(ImageFilter::DCT),
        clipping_bbox: None,
        smask: None,
    });

    // Surface edges are rounded to whole pixels; stretch to the exact page
    let natural_width = pixels_to_mm(width_px as f64, dpi);
    let natural_height = pixels_to_mm(height_px as f64, dpi);

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(0.0)),
            scale_x: Some((page_width_mm / natural_width) as f32),
            scale_y: Some((page_height_mm / natural_height) as f32),
            dpi: Some(dpi as f32),
            ..Default::default()
        },
    );
    Ok(())
}

/// Grey "Image Error" label centered in each failed slot
fn label_failures(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    rendered: &RenderedPage,
    page_height_mm: f64,
) {
    if rendered.failures.is_empty() {
        return;
    }
    layer.set_fill_color(printpdf::Color::Rgb(Rgb::new(LABEL_GREY, LABEL_GREY, LABEL_GREY, None)));
    for (_, rect) in &rendered.failures {
        let (x, y) = label_origin(rect, page_height_mm);
        layer.use_text(ERROR_LABEL, LABEL_FONT_SIZE, Mm(x as f32), Mm(y as f32), font);
    }
}

/// Baseline origin for the label, in PDF coordinates (origin bottom-left)
fn label_origin(rect: &RectMm, page_height_mm: f64) -> (f64, f64) {
    let (cx, cy) = rect.center();
    // Roughly half the cap height of 8pt Helvetica
    let half_cap_mm = 1.0;
    (cx - LABEL_WIDTH_MM / 2.0, page_height_mm - cy - half_cap_mm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::packing::PageGeometry;
    use crate::raster::fixtures::{corrupt_raster, pattern_raster};
    use crate::state::data::{PhotoItem, TransformState};
    use crate::state::edit::LayoutSettings;
    use crate::transform::CropRegion;
    use crate::units::SizeMm;

    fn item(id: u64, processed: crate::raster::Raster, size: SizeMm) -> PhotoItem {
        PhotoItem {
            id: PhotoId(id),
            source: processed.clone(),
            processed,
            source_size: (8, 10),
            target_size: size,
            transform: TransformState::Baked,
            background: Color::WHITE,
            crop: CropRegion::full(8, 10),
            duplicate_count: 1,
            position: None,
        }
    }

    fn snapshot(items: Vec<PhotoItem>) -> Snapshot {
        Snapshot {
            items,
            settings: LayoutSettings::default(),
            page: PageGeometry::A4,
        }
    }

    fn passport(id: u64) -> PhotoItem {
        item(id, pattern_raster(8, 10), SizeMm::new(40.0, 50.0))
    }

    #[tokio::test]
    async fn test_corrupt_item_is_isolated() {
        let items = vec![
            passport(1),
            item(2, corrupt_raster(), SizeMm::new(40.0, 50.0)),
            passport(3),
        ];
        let output = Exporter::default().export(snapshot(items)).await.unwrap();

        assert!(output.bytes.starts_with(b"%PDF"));
        assert_eq!(output.page_count(), 1);
        assert_eq!(output.pages[0], vec![PhotoId(1), PhotoId(2), PhotoId(3)]);
        assert_eq!(output.failed(), vec![PhotoId(2)]);
        assert!(output.unplaceable.is_empty());
    }

    #[tokio::test]
    async fn test_pages_follow_packer() {
        let items: Vec<PhotoItem> = (1..=25).map(passport).collect();
        let mut snap = snapshot(items);
        snap.settings.gap_mm = 2.0;
        let output = Exporter::default().export(snap).await.unwrap();
        assert_eq!(output.page_count(), 2);
        assert_eq!(output.pages[0].len(), 20);
        assert_eq!(output.pages[1].len(), 5);
        assert!(output.failures.is_empty());
    }

    #[tokio::test]
    async fn test_unplaceable_items_are_reported() {
        let items = vec![passport(1), item(2, pattern_raster(8, 10), SizeMm::new(400.0, 50.0))];
        let output = Exporter::default().export(snapshot(items)).await.unwrap();
        assert_eq!(output.unplaceable, vec![PhotoId(2)]);
        assert_eq!(output.pages, vec![vec![PhotoId(1)]]);
    }

    #[tokio::test]
    async fn test_hard_failures() {
        let empty = Exporter::default().export(snapshot(Vec::new())).await;
        assert!(matches!(empty, Err(ExportError::Empty)));

        let too_big = vec![item(1, pattern_raster(8, 10), SizeMm::new(400.0, 500.0))];
        let result = Exporter::default().export(snapshot(too_big)).await;
        assert!(matches!(result, Err(ExportError::NothingPlaceable)));

        let mut bad_gap = snapshot(vec![passport(1)]);
        bad_gap.settings.gap_mm = -1.0;
        let result = Exporter::default().export(bad_gap).await;
        assert!(matches!(result, Err(ExportError::InvalidDimension(_))));
    }

    #[tokio::test]
    async fn test_pages_are_embedded_compressed() {
        let output = Exporter::default().export(snapshot(vec![passport(1)])).await.unwrap();
        // A raw 2480x3508 RGB page alone would be about 26 MB
        assert!(output.bytes.len() < 2_000_000, "{} bytes", output.bytes.len());
        assert!(output.bytes.windows(b"/DCTDecode".len()).any(|w| w == b"/DCTDecode"));
    }

    #[test]
    fn test_page_surface_encodes_as_jpeg() {
        let surface = image::RgbImage::from_pixel(64, 32, image::Rgb([200, 10, 10]));
        let bytes = encode_jpeg(&surface).unwrap();
        assert!(bytes.starts_with(&[0xff, 0xd8]));
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (64, 32));
        let pixel = decoded.get_pixel(10, 10);
        assert!(pixel[0] > 180 && pixel[1] < 40);
    }

    #[tokio::test]
    async fn test_write_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output = Exporter::default().export(snapshot(vec![passport(1)])).await.unwrap();
        let path = output.write_to(&dir.path().join("out")).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), output.bytes);
        assert!(path.ends_with(&output.file_name));
    }

    #[test]
    fn test_file_name_is_filesystem_safe() {
        let name = default_file_name();
        assert!(name.starts_with("photo-sheet-"));
        assert!(name.ends_with(".pdf"));
        assert!(!name.contains(':'));
        assert_eq!(name.len(), "photo-sheet-2024-01-01T00-00-00.pdf".len());
    }

    #[test]
    fn test_label_is_centered_in_slot() {
        let rect = RectMm::new(10.0, 20.0, 40.0, 50.0);
        let (x, y) = label_origin(&rect, 297.0);
        assert!((x - (30.0 - LABEL_WIDTH_MM / 2.0)).abs() < 1e-9);
        assert!((y - (297.0 - 45.0 - 1.0)).abs() < 1e-9);
    }
}
