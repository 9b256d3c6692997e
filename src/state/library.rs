/// The Session holds the in-memory photo list and the active layout.
///
/// Nothing here is persisted. Every edit replaces items through partial
/// updates; rasters are shared immutable buffers, so handing out a
/// snapshot for export is cheap.

use log::{debug, info};

use super::data::{ManualPosition, PhotoId, PhotoItem, PhotoUpdate, TransformState};
use super::edit::{Alignment, Distribution, LayoutSettings, LayoutUpdate};
use crate::color::Color;
use crate::error::{EditorError, InvalidDimensionError};
use crate::packing::{self, PackedLayout, PageGeometry};
use crate::presets::{resize_target, ResizeEdit, SizePreset};
use crate::raster::Raster;
use crate::transform::CropRegion;
use crate::units::{SizeMm, Unit};

/// Frozen copy of everything an export needs
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub items: Vec<PhotoItem>,
    pub settings: LayoutSettings,
    pub page: PageGeometry,
}

impl Snapshot {
    pub fn sizes(&self) -> Vec<SizeMm> {
        self.items.iter().map(|item| item.target_size).collect()
    }

    /// Authoritative placements for this snapshot
    pub fn pack(&self) -> Result<PackedLayout, InvalidDimensionError> {
        packing::pack(&self.sizes(), self.settings.gap_mm, &self.page)
    }
}

/// Page counts shown in the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Capacity estimate from the first photo's size
    pub advisory_per_page: usize,
    /// `ceil(photos / advisory_per_page)`
    pub advisory_pages: usize,
    /// Page count from the real packer
    pub pages: usize,
}

/// In-memory photo list, selection and layout
#[derive(Debug, Clone)]
pub struct Session {
    items: Vec<PhotoItem>,
    selection: Vec<PhotoId>,
    settings: LayoutSettings,
    page: PageGeometry,
    preset: SizePreset,
    next_id: u64,
}

impl Session {
    pub fn new(page: PageGeometry, settings: LayoutSettings, preset: SizePreset) -> Self {
        Self {
            items: Vec::new(),
            selection: Vec::new(),
            settings,
            page,
            preset,
            next_id: 1,
        }
    }

    // ========== Queries ==========

    pub fn items(&self) -> &[PhotoItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: PhotoId) -> Option<&PhotoItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: PhotoId) -> bool {
        self.get(id).is_some()
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn page(&self) -> &PageGeometry {
        &self.page
    }

    pub fn preset(&self) -> SizePreset {
        self.preset
    }

    pub fn selection(&self) -> &[PhotoId] {
        &self.selection
    }

    fn position_of(&self, id: PhotoId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn allocate_id(&mut self) -> PhotoId {
        let id = PhotoId(self.next_id);
        self.next_id += 1;
        id
    }

    // ========== Item lifecycle ==========

    /// Add a decoded photo at the end of the list
    ///
    /// `processed` must already be composited onto white. The printed size
    /// comes from the active preset; the crop covers the whole image.
    pub fn insert(
        &mut self,
        source: Raster,
        processed: Raster,
        source_size: (u32, u32),
    ) -> Result<PhotoId, InvalidDimensionError> {
        let target_size = self.preset.target_size_mm(source_size)?;
        let id = self.allocate_id();

        self.items.push(PhotoItem {
            id,
            source,
            processed,
            source_size,
            target_size,
            transform: TransformState::Baked,
            background: Color::WHITE,
            crop: CropRegion::full(source_size.0, source_size.1),
            duplicate_count: 1,
            position: None,
        });

        info!(
            "📸 Added photo {} ({}x{}px, printed {}x{}mm)",
            id, source_size.0, source_size.1, target_size.width, target_size.height
        );
        Ok(id)
    }

    /// Apply a partial update to one photo
    pub fn update(&mut self, id: PhotoId, update: &PhotoUpdate) -> Result<(), EditorError> {
        if let Some(size) = update.target_size {
            InvalidDimensionError::check("target width", size.width)?;
            InvalidDimensionError::check("target height", size.height)?;
        }
        let index = self.position_of(id).ok_or(EditorError::UnknownPhoto(id))?;
        self.items[index] = self.items[index].updated(update);
        Ok(())
    }

    /// Swap in a new processed raster together with its transform state
    ///
    /// Returns false when the photo no longer exists.
    pub fn replace_raster(
        &mut self,
        id: PhotoId,
        processed: Raster,
        transform: TransformState,
        update: &PhotoUpdate,
    ) -> bool {
        match self.position_of(id) {
            Some(index) => {
                let mut next = self.items[index].updated(update);
                next.processed = processed;
                next.transform = transform;
                self.items[index] = next;
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: PhotoId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.selection.retain(|selected| *selected != id);
        let removed = self.items.len() != before;
        if removed {
            debug!("🗑️  Deleted photo {}", id);
        }
        removed
    }

    /// Append `count` copies of each photo in `ids`
    ///
    /// The k-th copy of a photo with lineage counter `d` gets `d + k`.
    pub fn duplicate(&mut self, ids: &[PhotoId], count: u32) -> Vec<PhotoId> {
        let originals: Vec<PhotoItem> = ids
            .iter()
            .filter_map(|id| self.get(*id).cloned())
            .collect();

        let mut created = Vec::new();
        for original in &originals {
            for k in 1..=count {
                let id = self.allocate_id();
                self.items.push(original.duplicate(id, original.duplicate_count + k));
                created.push(id);
            }
        }
        if !created.is_empty() {
            info!("📑 Duplicated {} photo(s) into {} copies", originals.len(), created.len());
        }
        created
    }

    // ========== Selection ==========

    /// Replace the selection, ignoring unknown ids and repeats
    pub fn select(&mut self, ids: &[PhotoId]) {
        self.selection.clear();
        for id in ids {
            if self.contains(*id) && !self.selection.contains(id) {
                self.selection.push(*id);
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ========== Sizes ==========

    /// Make `preset` active and apply it to every selected photo
    pub fn set_preset(&mut self, preset: SizePreset) -> Result<(), InvalidDimensionError> {
        let mut sizes = Vec::with_capacity(self.selection.len());
        for id in &self.selection {
            if let Some(item) = self.get(*id) {
                sizes.push((*id, preset.target_size_mm(item.source_size)?));
            }
        }

        self.preset = preset;
        for (id, size) in sizes {
            if let Some(index) = self.position_of(id) {
                self.items[index].target_size = size;
            }
        }
        Ok(())
    }

    /// Resize one photo from the resize dialog
    pub fn resize(
        &mut self,
        id: PhotoId,
        edit: ResizeEdit,
        unit: Unit,
        lock_aspect: bool,
    ) -> Result<SizeMm, EditorError> {
        let current = self.get(id).ok_or(EditorError::UnknownPhoto(id))?.target_size;
        let size = resize_target(current, edit, unit, lock_aspect)?;
        self.update(
            id,
            &PhotoUpdate {
                target_size: Some(size),
                ..Default::default()
            },
        )?;
        Ok(size)
    }

    // ========== Layout ==========

    pub fn update_settings(&mut self, update: LayoutUpdate) -> Result<(), InvalidDimensionError> {
        self.settings.apply(update)
    }

    pub fn pack(&self) -> Result<PackedLayout, InvalidDimensionError> {
        let sizes: Vec<SizeMm> = self.items.iter().map(|item| item.target_size).collect();
        packing::pack(&sizes, self.settings.gap_mm, &self.page)
    }

    pub fn pagination(&self) -> Result<Pagination, InvalidDimensionError> {
        let pages = self.pack()?.page_count();
        let (advisory_per_page, advisory_pages) = match self.items.first() {
            Some(first) => {
                let per_page = packing::photos_per_page(
                    first.target_size.width,
                    first.target_size.height,
                    self.settings.gap_mm,
                    &self.page,
                )?;
                let advisory_pages = if per_page == 0 {
                    0
                } else {
                    self.items.len().div_ceil(per_page)
                };
                (per_page, advisory_pages)
            }
            None => (0, 0),
        };
        Ok(Pagination {
            advisory_per_page,
            advisory_pages,
            pages,
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            items: self.items.clone(),
            settings: self.settings,
            page: self.page,
        }
    }

    // ========== Arrange (manual position overrides) ==========

    /// Selected photos with their current position: the override if set,
    /// otherwise where the packer puts them
    fn selected_positions(&self) -> Result<Vec<(PhotoId, ManualPosition, SizeMm)>, InvalidDimensionError> {
        let layout = self.pack()?;
        let mut positions = Vec::new();
        for id in &self.selection {
            let Some(index) = self.position_of(*id) else {
                continue;
            };
            let item = &self.items[index];
            let position = item.position.or_else(|| {
                layout.items[index].placement().map(|p| ManualPosition {
                    x: p.x,
                    y: p.y,
                    page: p.page_index,
                })
            });
            if let Some(position) = position {
                positions.push((*id, position, item.target_size));
            }
        }
        Ok(positions)
    }

    fn set_positions(&mut self, positions: Vec<(PhotoId, ManualPosition)>) -> usize {
        let mut changed = 0;
        for (id, position) in positions {
            if let Some(index) = self.position_of(id) {
                self.items[index].position = Some(position);
                changed += 1;
            }
        }
        changed
    }

    /// Align the selected photos; needs at least two. Returns how many moved.
    pub fn align(&mut self, alignment: Alignment) -> Result<usize, InvalidDimensionError> {
        self.settings.alignment = alignment;
        let selected = self.selected_positions()?;
        if selected.len() < 2 {
            return Ok(0);
        }

        let xs: Vec<f64> = selected.iter().map(|(_, p, _)| p.x).collect();
        let target = match alignment {
            Alignment::Left => xs.iter().copied().fold(f64::INFINITY, f64::min),
            Alignment::Right => xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Alignment::Center => xs.iter().sum::<f64>() / xs.len() as f64,
            Alignment::Top => selected
                .iter()
                .map(|(_, p, _)| p.y)
                .fold(f64::INFINITY, f64::min),
        };

        let moved = selected
            .into_iter()
            .map(|(id, position, _)| {
                let position = match alignment {
                    Alignment::Top => ManualPosition { y: target, ..position },
                    _ => ManualPosition { x: target, ..position },
                };
                (id, position)
            })
            .collect();
        Ok(self.set_positions(moved))
    }

    /// Spread the selected photos evenly; needs at least three
    pub fn distribute(&mut self, distribution: Distribution) -> Result<usize, InvalidDimensionError> {
        self.settings.distribution = distribution;
        let mut selected = self.selected_positions()?;
        if selected.len() < 3 {
            return Ok(0);
        }

        let vertical = distribution == Distribution::VerticalCenter;
        if vertical {
            selected.sort_by(|a, b| a.1.y.total_cmp(&b.1.y));
        } else {
            selected.sort_by(|a, b| a.1.x.total_cmp(&b.1.x));
        }

        let top = selected.iter().map(|(_, p, _)| p.y).fold(f64::INFINITY, f64::min);
        let bottom = selected
            .iter()
            .map(|(_, p, s)| p.y + s.height)
            .fold(f64::NEG_INFINITY, f64::max);
        let left = selected.iter().map(|(_, p, _)| p.x).fold(f64::INFINITY, f64::min);
        let right = selected
            .iter()
            .map(|(_, p, s)| p.x + s.width)
            .fold(f64::NEG_INFINITY, f64::max);

        let first = &selected[0].1;
        let last = &selected[selected.len() - 1].1;
        let (start, end) = if vertical { (first.y, last.y) } else { (first.x, last.x) };
        let step = (end - start) / (selected.len() - 1) as f64;

        let moved = selected
            .into_iter()
            .enumerate()
            .map(|(i, (id, position, size))| {
                let along = start + step * i as f64;
                let position = match distribution {
                    Distribution::HorizontalTop => ManualPosition { x: along, y: top, ..position },
                    Distribution::HorizontalCenter => ManualPosition {
                        x: along,
                        y: (top + bottom) / 2.0 - size.height / 2.0,
                        ..position
                    },
                    Distribution::HorizontalBottom => ManualPosition {
                        x: along,
                        y: bottom - size.height,
                        ..position
                    },
                    Distribution::VerticalCenter => ManualPosition {
                        x: (left + right) / 2.0 - size.width / 2.0,
                        y: along,
                        ..position
                    },
                };
                (id, position)
            })
            .collect();
        Ok(self.set_positions(moved))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(PageGeometry::A4, LayoutSettings::default(), SizePreset::default())
    }
}
