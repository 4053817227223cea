// 構造的圧縮サーチ: パスごとに圧縮を強め、予算内に収まらなくても最善の結果を返す

use tracing::{info, instrument, warn};

use crate::error::BudgetPdfError;
use crate::pdf::optimizer;
use crate::pdf::reader::PdfReader;
use crate::raster::asset::EncodedAsset;

/// Result of the structural-compression search.
///
/// Unlike the image-quality search this never fails on budget: exhausting
/// every pass yields [`CompressionOutcome::BestEffort`] and the caller decides
/// whether that is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionOutcome {
    /// Pass `passes` produced a document within budget.
    Fitted { asset: EncodedAsset, passes: u32 },
    /// Every pass ran; `asset` is the smallest document produced.
    BestEffort { asset: EncodedAsset, passes: u32 },
}

impl CompressionOutcome {
    pub fn asset(&self) -> &EncodedAsset {
        match self {
            Self::Fitted { asset, .. } | Self::BestEffort { asset, .. } => asset,
        }
    }

    pub fn into_asset(self) -> EncodedAsset {
        match self {
            Self::Fitted { asset, .. } | Self::BestEffort { asset, .. } => asset,
        }
    }

    pub fn passes(&self) -> u32 {
        match self {
            Self::Fitted { passes, .. } | Self::BestEffort { passes, .. } => *passes,
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, Self::Fitted { .. })
    }
}

/// Run passes `1..=max_passes` in order until one fits `budget`.
///
/// `run_pass` returns the serialized document for a pass number.
pub fn search<F>(
    max_passes: u32,
    budget: usize,
    mut run_pass: F,
) -> crate::error::Result<CompressionOutcome>
where
    F: FnMut(u32) -> crate::error::Result<Vec<u8>>,
{
    let mut smallest: Option<Vec<u8>> = None;

    for pass in 1..=max_passes {
        let bytes = run_pass(pass)?;
        let size = bytes.len();
        info!(pass, size, budget, "compression pass measured");

        if size <= budget {
            return Ok(CompressionOutcome::Fitted {
                asset: EncodedAsset::pdf(bytes, None),
                passes: pass,
            });
        }
        // Ties go to the later pass.
        if smallest.as_ref().is_none_or(|best| size <= best.len()) {
            smallest = Some(bytes);
        }
    }

    let bytes = smallest.ok_or_else(|| {
        BudgetPdfError::config("compression search needs at least one pass")
    })?;
    warn!(
        budget,
        size = bytes.len(),
        passes = max_passes,
        "compression passes exhausted, returning best effort"
    );
    Ok(CompressionOutcome::BestEffort {
        asset: EncodedAsset::pdf(bytes, None),
        passes: max_passes,
    })
}

/// Structurally recompress an existing PDF until it fits `budget`.
///
/// Embedded images are never re-encoded.
#[instrument(skip_all, fields(input = document_bytes.len(), budget, max_passes))]
pub fn compress_under_budget(
    document_bytes: &[u8],
    budget: usize,
    max_passes: u32,
) -> crate::error::Result<CompressionOutcome> {
    let mut doc = PdfReader::from_bytes(document_bytes)?.into_document();
    search(max_passes, budget, |pass| optimizer::run_pass(&mut doc, pass))
}
