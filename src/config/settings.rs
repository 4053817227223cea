use std::path::Path;

use serde::Deserialize;

use super::criteria::{AcceptanceCriteria, QualitySchedule};
use crate::error::BudgetPdfError;
use crate::pdf::layout::PageGeometry;
use crate::raster::asset::QualityLevel;

/// Process-wide settings, loaded once at startup.
///
/// Every field has a default matching the upload service's fixed contract,
/// so an empty YAML document is a valid settings file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub min_width: u32,
    pub min_height: u32,
    /// Hard byte budget for every produced asset.
    pub max_bytes: usize,
    pub quality_start: u8,
    pub quality_step: u8,
    /// Lowest quality the search may reach (inclusive).
    pub quality_floor: u8,
    /// Page size in PDF points (1/72 inch).
    pub page_width: f64,
    pub page_height: f64,
    pub page_margin: f64,
    pub max_compression_passes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            min_width: 420,
            min_height: 540,
            max_bytes: 4 * 1024 * 1024,
            quality_start: 85,
            quality_step: 10,
            quality_floor: 30,
            page_width: 612.0,
            page_height: 792.0,
            page_margin: 20.0,
            max_compression_passes: 10,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let settings: Settings = serde_yml::from_str(yaml).map_err(|e| {
            BudgetPdfError::config(format!("Failed to parse settings YAML: {e}"))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                BudgetPdfError::config(format!("settings file not found: {}", path.display()))
            }
            _ => BudgetPdfError::from(e),
        })?;
        Self::from_yaml(&content)
    }

    /// Reject combinations that would make a component unusable.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.min_width == 0 || self.min_height == 0 {
            return Err(BudgetPdfError::config(
                "min_width and min_height must be positive",
            ));
        }
        if self.max_bytes == 0 {
            return Err(BudgetPdfError::config("max_bytes must be positive"));
        }
        QualityLevel::new(self.quality_start)?;
        QualityLevel::new(self.quality_floor)?;
        if self.quality_step == 0 {
            return Err(BudgetPdfError::config("quality_step must be positive"));
        }
        if self.quality_floor > self.quality_start {
            return Err(BudgetPdfError::config(format!(
                "quality_floor ({}) is above quality_start ({})",
                self.quality_floor, self.quality_start
            )));
        }
        if self.max_compression_passes == 0 {
            return Err(BudgetPdfError::config(
                "max_compression_passes must be at least 1",
            ));
        }
        PageGeometry::new(self.page_width, self.page_height, self.page_margin)?;
        Ok(())
    }

    pub fn acceptance_criteria(&self) -> AcceptanceCriteria {
        AcceptanceCriteria::new(self.min_width, self.min_height, self.max_bytes)
    }

    pub fn quality_schedule(&self) -> crate::error::Result<QualitySchedule> {
        QualitySchedule::new(self.quality_start, self.quality_step, self.quality_floor)
    }

    pub fn page_geometry(&self) -> crate::error::Result<PageGeometry> {
        PageGeometry::new(self.page_width, self.page_height, self.page_margin)
    }
}
