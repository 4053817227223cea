use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use tracing::debug;

use super::RasterImage;
use super::asset::{EncodedAsset, QualityLevel};
use super::jpeg::encode_rgb_to_jpeg;
use crate::error::BudgetPdfError;

/// JPEG stores each dimension in 16 bits.
const MAX_JPEG_SIDE: u32 = u16::MAX as u32;

/// Converts decoded uploads to the canonical encoding: 8-bit RGB JPEG no
/// smaller than the minimum footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    min_width: u32,
    min_height: u32,
}

impl Normalizer {
    pub fn new(min_width: u32, min_height: u32) -> Self {
        Self {
            min_width,
            min_height,
        }
    }

    /// Convert to RGB, enlarge if under the minimum footprint, then encode.
    pub fn normalize(
        &self,
        image: &RasterImage,
        quality: QualityLevel,
    ) -> crate::error::Result<EncodedAsset> {
        let (width, height) = image.dimensions();
        let target = self.target_dimensions(width, height);
        if target.0 > MAX_JPEG_SIDE || target.1 > MAX_JPEG_SIDE {
            return Err(BudgetPdfError::invalid_input(format!(
                "{width}x{height} image would need enlarging to {}x{}, beyond the JPEG limit of {MAX_JPEG_SIDE}px per side",
                target.0, target.1
            )));
        }

        let rgb = canonical_pixels(image.as_dynamic(), target);
        let bytes = encode_rgb_to_jpeg(&rgb, quality)?;
        debug!(
            width = rgb.width(),
            height = rgb.height(),
            %quality,
            bytes = bytes.len(),
            "image normalized"
        );
        Ok(EncodedAsset::jpeg(bytes, quality))
    }

    /// Output dimensions for an input of `width` x `height`.
    ///
    /// Undersized images are scaled up uniformly until both axes reach the
    /// minimum; anything else keeps its size.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if width == 0 || height == 0 {
            return (width, height);
        }
        if width >= self.min_width && height >= self.min_height {
            return (width, height);
        }

        // Integer arithmetic keeps the binding axis exactly at its minimum.
        let (w, h) = (u64::from(width), u64::from(height));
        let (min_w, min_h) = (u64::from(self.min_width), u64::from(self.min_height));
        let (new_w, new_h) = if min_w * h >= min_h * w {
            (min_w, (h * min_w).div_ceil(w))
        } else {
            ((w * min_h).div_ceil(h), min_h)
        };
        (
            u32::try_from(new_w).unwrap_or(u32::MAX),
            u32::try_from(new_h).unwrap_or(u32::MAX),
        )
    }
}

fn canonical_pixels(image: &DynamicImage, (target_w, target_h): (u32, u32)) -> RgbImage {
    let (width, height) = (image.width(), image.height());
    if (target_w, target_h) == (width, height) {
        return image.to_rgb8();
    }

    debug!(
        from_w = width,
        from_h = height,
        to_w = target_w,
        to_h = target_h,
        "enlarging undersized image"
    );
    image
        .resize_exact(target_w, target_h, FilterType::Lanczos3)
        .to_rgb8()
}
