/// Sheet packing engine
///
/// Places an ordered list of item sizes onto fixed-size pages, row by row,
/// left to right then top to bottom, starting a new page whenever the next
/// item would run past the bottom margin. The same ordered input always
/// yields the same placements.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{InvalidDimensionError, UnplaceableItemError};
use crate::units::{RectMm, SizeMm, EXPORT_DPI};

/// Fixed page size and export resolution
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_mm: f64,
    pub height_mm: f64,
    pub dpi: f64,
}

impl PageGeometry {
    /// A4 portrait (210mm × 297mm) at 300 DPI
    pub const A4: PageGeometry = PageGeometry {
        width_mm: 210.0,
        height_mm: 297.0,
        dpi: EXPORT_DPI,
    };

    pub fn validate(&self) -> Result<(), InvalidDimensionError> {
        InvalidDimensionError::check("page width", self.width_mm)?;
        InvalidDimensionError::check("page height", self.height_mm)?;
        InvalidDimensionError::check("page dpi", self.dpi)?;
        Ok(())
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// Where one item lands: millimeters from the page's top-left corner
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub page_index: usize,
}

/// Packing result for one input item
#[derive(Debug, Clone, PartialEq)]
pub enum PackedItem {
    Placed(Placement),
    /// The item is larger than an empty page's usable area
    Unplaceable(UnplaceableItemError),
}

impl PackedItem {
    pub fn placement(&self) -> Option<&Placement> {
        match self {
            PackedItem::Placed(placement) => Some(placement),
            PackedItem::Unplaceable(_) => None,
        }
    }

    pub fn is_unplaceable(&self) -> bool {
        matches!(self, PackedItem::Unplaceable(_))
    }
}

/// Output of [`pack`], index-aligned with the input sizes
#[derive(Debug, Clone, PartialEq)]
pub struct PackedLayout {
    pub items: Vec<PackedItem>,
}

impl PackedLayout {
    /// `max(page_index) + 1`, or 0 when nothing was placed
    pub fn page_count(&self) -> usize {
        self.items
            .iter()
            .filter_map(PackedItem::placement)
            .map(|p| p.page_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Input indices grouped by page, each group in input order
    pub fn pages(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut pages: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (index, item) in self.items.iter().enumerate() {
            if let Some(placement) = item.placement() {
                pages.entry(placement.page_index).or_default().push(index);
            }
        }
        pages
    }

    /// Input indices that landed on `page_index`, in input order
    pub fn items_on_page(&self, page_index: usize) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.placement().map(|p| p.page_index) == Some(page_index))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn unplaceable(&self) -> Vec<&UnplaceableItemError> {
        self.items
            .iter()
            .filter_map(|item| match item {
                PackedItem::Unplaceable(error) => Some(error),
                PackedItem::Placed(_) => None,
            })
            .collect()
    }
}

/// Shelf-pack `sizes` onto pages
///
/// Rejects a negative or non-finite gap and any non-positive item size before
/// placing anything. Items that can never fit are flagged, not dropped, and do
/// not move the cursor.
pub fn pack(
    sizes: &[SizeMm],
    gap_mm: f64,
    page: &PageGeometry,
) -> Result<PackedLayout, InvalidDimensionError> {
    validate_gap(gap_mm)?;
    page.validate()?;
    for size in sizes {
        InvalidDimensionError::check("item width", size.width)?;
        InvalidDimensionError::check("item height", size.height)?;
    }

    let usable_width = page.width_mm - 2.0 * gap_mm;
    let usable_height = page.height_mm - 2.0 * gap_mm;

    let mut x = gap_mm;
    let mut y = gap_mm;
    let mut row_height: f64 = 0.0;
    let mut page_index = 0;

    let mut items = Vec::with_capacity(sizes.len());
    for (index, size) in sizes.iter().enumerate() {
        if size.width > usable_width || size.height > usable_height {
            let error = UnplaceableItemError {
                index,
                width: size.width,
                height: size.height,
                usable_width,
                usable_height,
            };
            warn!("⚠️  {}", error);
            items.push(PackedItem::Unplaceable(error));
            continue;
        }

        if x + size.width > page.width_mm - gap_mm {
            x = gap_mm;
            y += row_height + gap_mm;
            row_height = 0.0;
        }

        if y + size.height > page.height_mm - gap_mm {
            page_index += 1;
            x = gap_mm;
            y = gap_mm;
            row_height = 0.0;
        }

        items.push(PackedItem::Placed(Placement { x, y, page_index }));
        x += size.width + gap_mm;
        row_height = row_height.max(size.height);
    }

    Ok(PackedLayout { items })
}

/// Capacity estimate for a page of identical items
///
/// Advisory only (page counters in the UI). Final layout always comes from
/// [`pack`], which handles mixed sizes.
pub fn photos_per_page(
    width_mm: f64,
    height_mm: f64,
    gap_mm: f64,
    page: &PageGeometry,
) -> Result<usize, InvalidDimensionError> {
    InvalidDimensionError::check("item width", width_mm)?;
    InvalidDimensionError::check("item height", height_mm)?;
    validate_gap(gap_mm)?;

    let per_row = ((page.width_mm - gap_mm) / (width_mm + gap_mm)).floor().max(0.0);
    let per_column = ((page.height_mm - gap_mm) / (height_mm + gap_mm)).floor().max(0.0);
    Ok((per_row * per_column) as usize)
}

/// Page rectangle for a placed item of `size`
pub fn slot_rect(placement: &Placement, size: SizeMm) -> RectMm {
    RectMm::new(placement.x, placement.y, size.width, size.height)
}

fn validate_gap(gap_mm: f64) -> Result<f64, InvalidDimensionError> {
    if gap_mm.is_finite() && gap_mm >= 0.0 {
        Ok(gap_mm)
    } else {
        Err(InvalidDimensionError {
            field: "gap",
            value: gap_mm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passports(count: usize) -> Vec<SizeMm> {
        vec![SizeMm::new(40.0, 50.0); count]
    }

    #[test]
    fn test_passport_capacity_on_a4() {
        // floor(208/42) * floor(295/52) = 4 * 5
        assert_eq!(photos_per_page(40.0, 50.0, 2.0, &PageGeometry::A4).unwrap(), 20);
    }

    #[test]
    fn test_ten_passports_fit_one_page() {
        let layout = pack(&passports(10), 2.0, &PageGeometry::A4).unwrap();
        assert_eq!(layout.page_count(), 1);
        assert!(layout.items.iter().all(|i| i.placement().unwrap().page_index == 0));
    }

    #[test]
    fn test_twenty_five_passports_split_20_5() {
        let layout = pack(&passports(25), 2.0, &PageGeometry::A4).unwrap();
        assert_eq!(layout.page_count(), 2);
        assert_eq!(layout.items_on_page(0).len(), 20);
        assert_eq!(layout.items_on_page(1).len(), 5);
        assert_eq!(layout.items_on_page(1), vec![20, 21, 22, 23, 24]);
    }

    #[test]
    fn test_first_row_positions() {
        let layout = pack(&passports(6), 2.0, &PageGeometry::A4).unwrap();
        let xs: Vec<(f64, f64)> = layout
            .items
            .iter()
            .map(|i| {
                let p = i.placement().unwrap();
                (p.x, p.y)
            })
            .collect();
        assert_eq!(
            xs,
            vec![(2.0, 2.0), (44.0, 2.0), (86.0, 2.0), (128.0, 2.0), (2.0, 54.0), (44.0, 54.0)]
        );
    }

    #[test]
    fn test_capacity_k_times_3_plus_1() {
        for (w, h, gap) in [(40.0, 50.0, 2.0), (22.0, 27.0, 1.0), (63.0, 88.0, 0.0), (35.0, 45.0, 5.0)] {
            let k = photos_per_page(w, h, gap, &PageGeometry::A4).unwrap();
            assert!(k > 0);
            let layout = pack(&vec![SizeMm::new(w, h); k * 3 + 1], gap, &PageGeometry::A4).unwrap();
            assert_eq!(layout.page_count(), 4, "{w}x{h} gap {gap}");
            assert_eq!(layout.items_on_page(3).len(), 1);
        }
    }

    #[test]
    fn test_packing_is_deterministic() {
        let sizes: Vec<SizeMm> = (0..60)
            .map(|i| SizeMm::new(20.0 + (i * 7 % 30) as f64, 25.0 + (i * 13 % 40) as f64))
            .collect();
        let first = pack(&sizes, 1.5, &PageGeometry::A4).unwrap();
        let second = pack(&sizes, 1.5, &PageGeometry::A4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mixed_sizes_never_overlap() {
        let sizes: Vec<SizeMm> = (0..80)
            .map(|i| SizeMm::new(15.0 + (i * 11 % 50) as f64, 20.0 + (i * 17 % 60) as f64))
            .collect();
        let page = PageGeometry::A4;
        let gap = 2.0;
        let layout = pack(&sizes, gap, &page).unwrap();

        let rects: Vec<(usize, RectMm)> = layout
            .items
            .iter()
            .zip(&sizes)
            .map(|(item, size)| {
                let p = item.placement().unwrap();
                (p.page_index, slot_rect(p, *size))
            })
            .collect();

        for (i, (page_a, a)) in rects.iter().enumerate() {
            assert!(a.x >= gap && a.y >= gap);
            assert!(a.right() <= page.width_mm - gap + 1e-9);
            assert!(a.bottom() <= page.height_mm - gap + 1e-9);
            for (page_b, b) in &rects[i + 1..] {
                if page_a == page_b {
                    assert!(!a.overlaps(b));
                }
            }
        }
    }

    #[test]
    fn test_unplaceable_is_flagged_not_dropped() {
        let sizes = vec![
            SizeMm::new(40.0, 50.0),
            SizeMm::new(300.0, 50.0),
            SizeMm::new(40.0, 50.0),
        ];
        let layout = pack(&sizes, 2.0, &PageGeometry::A4).unwrap();
        assert_eq!(layout.items.len(), 3);
        assert!(layout.items[1].is_unplaceable());
        // Cursor does not advance past the flagged item
        assert_eq!(layout.items[2].placement().unwrap().x, 44.0);
        assert_eq!(layout.unplaceable().len(), 1);
        assert_eq!(layout.unplaceable()[0].index, 1);
    }

    #[test]
    fn test_item_exactly_filling_usable_area() {
        let page = PageGeometry::A4;
        let layout = pack(&[SizeMm::new(206.0, 293.0)], 2.0, &page).unwrap();
        assert_eq!(layout.items[0], PackedItem::Placed(Placement { x: 2.0, y: 2.0, page_index: 0 }));
    }

    #[test]
    fn test_rejects_invalid_dimensions() {
        assert!(pack(&[SizeMm::new(0.0, 10.0)], 1.0, &PageGeometry::A4).is_err());
        assert!(pack(&[SizeMm::new(10.0, -1.0)], 1.0, &PageGeometry::A4).is_err());
        assert!(pack(&[SizeMm::new(10.0, 10.0)], -1.0, &PageGeometry::A4).is_err());
        assert!(photos_per_page(0.0, 10.0, 1.0, &PageGeometry::A4).is_err());
    }

    #[test]
    fn test_empty_input() {
        let layout = pack(&[], 2.0, &PageGeometry::A4).unwrap();
        assert_eq!(layout.page_count(), 0);
        assert!(layout.pages().is_empty());
    }

    #[test]
    fn test_tall_item_starts_new_page() {
        let sizes = vec![SizeMm::new(100.0, 200.0), SizeMm::new(100.0, 200.0)];
        let layout = pack(&sizes, 0.0, &PageGeometry::A4).unwrap();
        assert_eq!(layout.items[1].placement().unwrap().page_index, 0);
        let sizes = vec![SizeMm::new(150.0, 200.0), SizeMm::new(150.0, 200.0)];
        let layout = pack(&sizes, 0.0, &PageGeometry::A4).unwrap();
        assert_eq!(layout.items[1], PackedItem::Placed(Placement { x: 0.0, y: 0.0, page_index: 1 }));
    }
}
