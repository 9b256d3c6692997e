/// Application configuration
///
/// Loaded from a JSON file; every field is optional and falls back to its
/// default. The page resolution is fixed at 300 DPI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::packing::PageGeometry;
use crate::presets::SizePreset;
use crate::state::edit::LayoutSettings;
use crate::units::EXPORT_DPI;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Page size; `dpi` must stay at 300
    pub page: PageGeometry,
    /// Preview density relative to export resolution, in (0, 1]
    pub preview_scale: f64,
    /// Preset applied to newly ingested photos
    pub default_preset: SizePreset,
    /// Initial layout settings
    pub layout: LayoutSettings,
    /// Where exports are written; `None` means the documents folder
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page: PageGeometry::A4,
            preview_scale: 0.3,
            default_preset: SizePreset::Passport,
            layout: LayoutSettings::default(),
            output_dir: None,
        }
    }
}

impl Config {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// `load` if the file exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.page
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.page.dpi != EXPORT_DPI {
            return Err(ConfigError::Invalid(format!(
                "page dpi must be {}, got {}",
                EXPORT_DPI, self.page.dpi
            )));
        }
        if !(self.preview_scale > 0.0 && self.preview_scale <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "preview_scale must be in (0, 1], got {}",
                self.preview_scale
            )));
        }
        self.layout
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.default_preset
            .target_size_mm((1, 1))
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// Configured export directory, else documents, else home
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output_dir
            .clone()
            .or_else(dirs::document_dir)
            .or_else(dirs::home_dir)
    }
}
