/// Photo size presets and the resize dialog math

use serde::{Deserialize, Serialize};

use crate::error::InvalidDimensionError;
use crate::units::{round2, SizeMm, Unit, EXPORT_DPI};

/// Icon shown next to a preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetIcon {
    CreditCard,
    Stamp,
    Ruler,
}

/// Supported print sizes
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SizePreset {
    /// 40 × 50 mm
    #[default]
    Passport,
    /// 22 × 27 mm
    Stamp,
    /// User-entered size
    Custom { width: f64, height: f64, unit: Unit },
    /// The source's own pixel size printed at 300 DPI
    Original,
}

impl SizePreset {
    pub fn name(&self) -> String {
        match self {
            SizePreset::Passport => "Passport Size".to_string(),
            SizePreset::Stamp => "Stamp Size".to_string(),
            SizePreset::Custom { width, height, unit } => {
                format!("Custom {}×{}{}", width, height, unit.suffix())
            }
            SizePreset::Original => "Original Size".to_string(),
        }
    }

    pub fn icon(&self) -> PresetIcon {
        match self {
            SizePreset::Passport => PresetIcon::CreditCard,
            SizePreset::Stamp => PresetIcon::Stamp,
            SizePreset::Custom { .. } | SizePreset::Original => PresetIcon::Ruler,
        }
    }

    /// Printed size for a photo whose source is `source_px` pixels
    pub fn target_size_mm(&self, source_px: (u32, u32)) -> Result<SizeMm, InvalidDimensionError> {
        match *self {
            SizePreset::Passport => Ok(SizeMm::new(40.0, 50.0)),
            SizePreset::Stamp => Ok(SizeMm::new(22.0, 27.0)),
            SizePreset::Custom { width, height, unit } => {
                InvalidDimensionError::check("custom width", width)?;
                InvalidDimensionError::check("custom height", height)?;
                Ok(SizeMm::new(unit.to_mm(width), unit.to_mm(height)))
            }
            SizePreset::Original => {
                let (w, h) = source_px;
                let size = SizeMm::from_pixels(w, h, EXPORT_DPI);
                InvalidDimensionError::check("source width", size.width)?;
                InvalidDimensionError::check("source height", size.height)?;
                Ok(size)
            }
        }
    }

    /// The fixed presets offered in the size picker
    pub fn builtin() -> [SizePreset; 2] {
        [SizePreset::Passport, SizePreset::Stamp]
    }
}

/// Which side the user edited in the resize dialog
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeEdit {
    Width(f64),
    Height(f64),
}

/// Resize a printed size
///
/// With `lock_aspect`, the other side follows the current aspect ratio
/// (rounded to 2 decimals, like the dialog shows it). Values are given in
/// `unit` and returned in millimeters.
pub fn resize_target(
    current: SizeMm,
    edit: ResizeEdit,
    unit: Unit,
    lock_aspect: bool,
) -> Result<SizeMm, InvalidDimensionError> {
    InvalidDimensionError::check("current width", current.width)?;
    InvalidDimensionError::check("current height", current.height)?;
    let ratio = current.aspect_ratio();

    let current_w = unit.from_mm(current.width);
    let current_h = unit.from_mm(current.height);

    let (width, height) = match edit {
        ResizeEdit::Width(width) => {
            InvalidDimensionError::check("width", width)?;
            let height = if lock_aspect { round2(width / ratio) } else { current_h };
            (width, height)
        }
        ResizeEdit::Height(height) => {
            InvalidDimensionError::check("height", height)?;
            let width = if lock_aspect { round2(height * ratio) } else { current_w };
            (width, height)
        }
    };

    Ok(SizeMm::new(unit.to_mm(width), unit.to_mm(height)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_sizes() {
        assert_eq!(SizePreset::Passport.target_size_mm((1, 1)).unwrap(), SizeMm::new(40.0, 50.0));
        assert_eq!(SizePreset::Stamp.target_size_mm((1, 1)).unwrap(), SizeMm::new(22.0, 27.0));
    }

    #[test]
    fn test_icons_are_exhaustive() {
        assert_eq!(SizePreset::Passport.icon(), PresetIcon::CreditCard);
        assert_eq!(SizePreset::Stamp.icon(), PresetIcon::Stamp);
        assert_eq!(SizePreset::Original.icon(), PresetIcon::Ruler);
    }

    #[test]
    fn test_custom_inches() {
        let preset = SizePreset::Custom { width: 2.0, height: 2.0, unit: Unit::Inch };
        assert_eq!(preset.target_size_mm((1, 1)).unwrap(), SizeMm::new(50.8, 50.8));
        assert_eq!(preset.name(), "Custom 2×2in");
    }

    #[test]
    fn test_custom_rejects_non_positive() {
        let preset = SizePreset::Custom { width: 0.0, height: 10.0, unit: Unit::Mm };
        assert!(preset.target_size_mm((1, 1)).is_err());
    }

    #[test]
    fn test_original_uses_300_dpi() {
        let size = SizePreset::Original.target_size_mm((1200, 600)).unwrap();
        assert_eq!(size, SizeMm::new(101.6, 50.8));
    }

    #[test]
    fn test_aspect_locked_resize() {
        let current = SizeMm::new(40.0, 50.0);
        let locked = resize_target(current, ResizeEdit::Width(80.0), Unit::Mm, true).unwrap();
        assert_eq!(locked, SizeMm::new(80.0, 100.0));

        let free = resize_target(current, ResizeEdit::Width(80.0), Unit::Mm, false).unwrap();
        assert_eq!(free, SizeMm::new(80.0, 50.0));
    }

    #[test]
    fn test_aspect_locked_resize_by_height() {
        let current = SizeMm::new(40.0, 50.0);
        let locked = resize_target(current, ResizeEdit::Height(25.0), Unit::Mm, true).unwrap();
        assert_eq!(locked, SizeMm::new(20.0, 25.0));
    }

    #[test]
    fn test_resize_in_inches() {
        let current = SizeMm::new(50.8, 50.8);
        let size = resize_target(current, ResizeEdit::Width(1.0), Unit::Inch, true).unwrap();
        assert_eq!(size, SizeMm::new(25.4, 25.4));
    }

    #[test]
    fn test_resize_rejects_zero() {
        let current = SizeMm::new(40.0, 50.0);
        assert!(resize_target(current, ResizeEdit::Width(0.0), Unit::Mm, true).is_err());
    }

    #[test]
    fn test_preset_serde() {
        let json = serde_json::to_string(&SizePreset::Stamp).unwrap();
        assert_eq!(json, r#"{"kind":"stamp"}"#);
        let custom: SizePreset =
            serde_json::from_str(r#"{"kind":"custom","width":35,"height":45,"unit":"mm"}"#).unwrap();
        assert_eq!(custom, SizePreset::Custom { width: 35.0, height: 45.0, unit: Unit::Mm });
    }
}
