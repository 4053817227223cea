use std::fmt;

use crate::error::BudgetPdfError;

/// JPEG encoder quality (1 = worst, 100 = best).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualityLevel(u8);

impl QualityLevel {
    /// Quality used for single-image processing and the first search attempt.
    pub const DEFAULT: Self = Self(85);
    /// The image-quality search never goes below this level.
    pub const MIN_SEARCH: Self = Self(30);

    pub fn new(value: u8) -> crate::error::Result<Self> {
        if !(1..=100).contains(&value) {
            return Err(BudgetPdfError::config(format!(
                "JPEG quality must be 1-100, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the bytes of an [`EncodedAsset`] were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Jpeg(QualityLevel),
    /// A PDF; `image_quality` is set when the pages were rasterized at a
    /// known JPEG quality, and `None` for merged documents.
    Pdf { image_quality: Option<QualityLevel> },
}

/// An encoded byte stream plus the encoding it carries.
///
/// The length is always read from the bytes themselves.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedAsset {
    bytes: Vec<u8>,
    encoding: Encoding,
}

impl EncodedAsset {
    pub fn new(bytes: Vec<u8>, encoding: Encoding) -> Self {
        Self { bytes, encoding }
    }

    pub fn jpeg(bytes: Vec<u8>, quality: QualityLevel) -> Self {
        Self::new(bytes, Encoding::Jpeg(quality))
    }

    pub fn pdf(bytes: Vec<u8>, image_quality: Option<QualityLevel>) -> Self {
        Self::new(bytes, Encoding::Pdf { image_quality })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The JPEG quality the asset (or its embedded pages) was encoded at.
    pub fn quality(&self) -> Option<QualityLevel> {
        match self.encoding {
            Encoding::Jpeg(q) => Some(q),
            Encoding::Pdf { image_quality } => image_quality,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn fits(&self, budget: usize) -> bool {
        self.len() <= budget
    }
}

// Keep multi-megabyte payloads out of debug output.
impl fmt::Debug for EncodedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedAsset")
            .field("encoding", &self.encoding)
            .field("len", &self.bytes.len())
            .finish()
    }
}
