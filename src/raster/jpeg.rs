use std::io::Cursor;

use image::{ImageDecoder, ImageFormat, ImageReader, RgbImage};

use crate::error::BudgetPdfError;
use crate::raster::ColorModel;
use crate::raster::asset::QualityLevel;

/// Format, size and channel layout read from an encoded image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    pub format: Option<ImageFormat>,
    pub width: u32,
    pub height: u32,
    pub color_model: ColorModel,
}

/// Encode an RGB image to JPEG bytes at the given quality.
pub fn encode_rgb_to_jpeg(rgb: &RgbImage, quality: QualityLevel) -> crate::error::Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.get());
    rgb.write_with_encoder(encoder).map_err(|e| {
        BudgetPdfError::encode(format!("JPEG encoding at quality {quality} failed: {e}"))
    })?;

    Ok(buf.into_inner())
}

/// Read the header of an encoded image without decoding its pixels.
pub fn read_header(data: &[u8]) -> crate::error::Result<HeaderInfo> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| BudgetPdfError::decode(format!("cannot read image header: {e}")))?;
    let format = reader.format();
    let decoder = reader
        .into_decoder()
        .map_err(|e| BudgetPdfError::decode(format!("cannot read image header: {e}")))?;
    let (width, height) = decoder.dimensions();

    Ok(HeaderInfo {
        format,
        width,
        height,
        color_model: decoder.color_type().into(),
    })
}

/// Number of colour components declared in a JPEG's frame header.
///
/// Scans the marker segments up to the first SOF. Returns `None` for data
/// that is not a well-formed JPEG prefix. A CMYK JPEG reports 4 here even
/// though [`read_header`] reports it as RGB.
pub fn component_count(data: &[u8]) -> Option<u8> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    loop {
        if *data.get(pos)? != 0xFF {
            return None;
        }
        // Fill bytes between markers.
        while *data.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        let marker = *data.get(pos + 1)?;
        pos += 2;
        match marker {
            0x01 | 0xD0..=0xD7 => continue,
            // Start of scan before any frame header.
            0xD9 | 0xDA => return None,
            _ => {}
        }
        let length = usize::from(u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]));
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            // length(2) precision(1) height(2) width(2) components(1)
            return data.get(pos + 7).copied();
        }
        if length < 2 {
            return None;
        }
        pos += length;
    }
}
