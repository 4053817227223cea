pub mod asset;
pub mod jpeg;
pub mod normalizer;
pub mod validator;

use image::{ColorType, DynamicImage, ImageFormat};
use serde::Serialize;

use crate::error::BudgetPdfError;

/// Channel layout of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorModel {
    Rgb,
    Rgba,
    Luma,
    LumaAlpha,
    /// 16-bit or floating point layouts.
    Other,
}

impl From<ColorType> for ColorModel {
    fn from(color: ColorType) -> Self {
        match color {
            ColorType::Rgb8 => ColorModel::Rgb,
            ColorType::Rgba8 => ColorModel::Rgba,
            ColorType::L8 => ColorModel::Luma,
            ColorType::La8 => ColorModel::LumaAlpha,
            _ => ColorModel::Other,
        }
    }
}

/// A decoded upload.
pub struct RasterImage {
    image: DynamicImage,
}

impl RasterImage {
    /// Decode PNG or JPEG bytes. Any other format is rejected.
    pub fn decode(data: &[u8]) -> crate::error::Result<Self> {
        let format = image::guess_format(data)
            .map_err(|e| BudgetPdfError::decode(format!("unrecognized image data: {e}")))?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
            return Err(BudgetPdfError::decode(format!(
                "unsupported image format {format:?}, expected PNG or JPEG"
            )));
        }
        let image = image::load_from_memory_with_format(data, format)
            .map_err(|e| BudgetPdfError::decode(format!("failed to decode image: {e}")))?;
        Ok(Self { image })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn color_model(&self) -> ColorModel {
        self.image.color().into()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}
