// 画像品質サーチ: 品質を下げながら文書を再構築し、予算内に収まる最初の結果を返す

use rayon::prelude::*;
use tracing::{info, instrument, warn};

use crate::config::criteria::QualitySchedule;
use crate::error::BudgetPdfError;
use crate::pdf::writer::DocumentAssembler;
use crate::raster::RasterImage;
use crate::raster::asset::{EncodedAsset, QualityLevel};
use crate::raster::normalizer::Normalizer;

/// Try each scheduled quality in order and return the first attempt that fits.
///
/// `attempt` produces the asset for one quality level. An attempt error ends
/// the search immediately. When every level has been tried without fitting,
/// the search fails with [`BudgetPdfError::BudgetExceeded`]; no asset is kept.
pub fn search<F>(
    schedule: &QualitySchedule,
    budget: usize,
    mut attempt: F,
) -> crate::error::Result<EncodedAsset>
where
    F: FnMut(QualityLevel) -> crate::error::Result<EncodedAsset>,
{
    let mut attempts = 0;
    let mut last_size = None;

    for quality in schedule.levels() {
        attempts += 1;
        let asset = attempt(quality)?;
        let size = asset.len();
        info!(%quality, size, budget, "quality attempt measured");

        if size <= budget {
            return Ok(asset);
        }
        last_size = Some(size);
    }

    warn!(budget, attempts, "no quality level fits the budget");
    Err(BudgetPdfError::BudgetExceeded {
        budget,
        achieved: last_size,
        attempts,
    })
}

/// Re-encodes a batch of images into a document at decreasing quality until
/// the document fits.
#[derive(Debug, Clone)]
pub struct ImageQualitySearch {
    normalizer: Normalizer,
    assembler: DocumentAssembler,
    schedule: QualitySchedule,
}

impl ImageQualitySearch {
    pub fn new(
        normalizer: Normalizer,
        assembler: DocumentAssembler,
        schedule: QualitySchedule,
    ) -> Self {
        Self {
            normalizer,
            assembler,
            schedule,
        }
    }

    #[instrument(skip_all, fields(images = images.len(), budget))]
    pub fn encode_under_budget(
        &self,
        images: &[RasterImage],
        budget: usize,
    ) -> crate::error::Result<EncodedAsset> {
        if images.is_empty() {
            return Err(BudgetPdfError::invalid_input("no images to encode"));
        }
        search(&self.schedule, budget, |quality| {
            self.assemble_at(images, quality)
        })
    }

    /// One attempt: normalize every image at `quality`, then assemble.
    pub fn assemble_at(
        &self,
        images: &[RasterImage],
        quality: QualityLevel,
    ) -> crate::error::Result<EncodedAsset> {
        let normalized: Vec<crate::error::Result<EncodedAsset>> = images
            .par_iter()
            .map(|image| self.normalizer.normalize(image, quality))
            .collect();

        // Report the earliest failing image, regardless of completion order.
        let mut assets = Vec::with_capacity(normalized.len());
        for (i, result) in normalized.into_iter().enumerate() {
            assets.push(result.map_err(|e| e.at_input(i + 1))?);
        }

        self.assembler.assemble(&assets)
    }
}
