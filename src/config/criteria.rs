use image::ImageFormat;

use crate::error::BudgetPdfError;
use crate::raster::ColorModel;
use crate::raster::asset::QualityLevel;

/// What a normalized image must satisfy to be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceCriteria {
    pub min_width: u32,
    pub min_height: u32,
    pub max_bytes: usize,
    pub format: ImageFormat,
    pub color_model: ColorModel,
}

impl AcceptanceCriteria {
    /// Criteria with the canonical encoding: 8-bit RGB JPEG.
    pub fn new(min_width: u32, min_height: u32, max_bytes: usize) -> Self {
        Self {
            min_width,
            min_height,
            max_bytes,
            format: ImageFormat::Jpeg,
            color_model: ColorModel::Rgb,
        }
    }
}

/// Descending JPEG quality levels tried by the image-quality search.
///
/// `start`, `start - step`, ... down to and including `floor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualitySchedule {
    start: QualityLevel,
    step: u8,
    floor: QualityLevel,
}

impl QualitySchedule {
    pub fn new(start: u8, step: u8, floor: u8) -> crate::error::Result<Self> {
        if step == 0 {
            return Err(BudgetPdfError::config("quality step must be positive"));
        }
        let start = QualityLevel::new(start)?;
        let floor = QualityLevel::new(floor)?;
        if floor > start {
            return Err(BudgetPdfError::config(format!(
                "quality floor {floor} is above start {start}"
            )));
        }
        Ok(Self { start, step, floor })
    }

    pub fn start(&self) -> QualityLevel {
        self.start
    }

    pub fn floor(&self) -> QualityLevel {
        self.floor
    }

    /// All levels in the order they are tried.
    pub fn levels(&self) -> impl Iterator<Item = QualityLevel> + use<> {
        let floor = self.floor.get();
        let step = self.step;
        std::iter::successors(Some(self.start.get()), move |&q| q.checked_sub(step))
            .take_while(move |&q| q >= floor)
            .filter_map(|q| QualityLevel::new(q).ok())
    }
}

impl Default for QualitySchedule {
    fn default() -> Self {
        Self {
            start: QualityLevel::DEFAULT,
            step: 10,
            floor: QualityLevel::MIN_SEARCH,
        }
    }
}
