// リクエスト単位の3操作: 単一画像処理、画像からのPDF生成、PDF結合

use tracing::{info, instrument, warn};

use super::compression_search::{CompressionOutcome, compress_under_budget};
use super::quality_search::ImageQualitySearch;
use crate::config::criteria::QualitySchedule;
use crate::config::settings::Settings;
use crate::error::BudgetPdfError;
use crate::pdf::merge;
use crate::pdf::writer::DocumentAssembler;
use crate::raster::RasterImage;
use crate::raster::asset::EncodedAsset;
use crate::raster::normalizer::Normalizer;
use crate::raster::validator::{ValidationReport, Validator};

/// Result of processing a single uploaded image.
#[derive(Debug, Clone)]
pub struct SingleImageOutcome {
    pub asset: EncodedAsset,
    pub report: ValidationReport,
}

impl SingleImageOutcome {
    pub fn accepted(&self) -> bool {
        self.report.passed()
    }
}

/// The three core operations, wired from immutable settings.
///
/// A `Pipeline` holds no per-request state and can be shared across threads.
#[derive(Debug, Clone)]
pub struct Pipeline {
    normalizer: Normalizer,
    validator: Validator,
    image_search: ImageQualitySearch,
    schedule: QualitySchedule,
    max_bytes: usize,
    max_compression_passes: u32,
}

impl Pipeline {
    pub fn new(settings: &Settings) -> crate::error::Result<Self> {
        settings.validate()?;
        let normalizer = Normalizer::new(settings.min_width, settings.min_height);
        let assembler = DocumentAssembler::new(settings.page_geometry()?);
        let schedule = settings.quality_schedule()?;

        Ok(Self {
            normalizer,
            validator: Validator::new(settings.acceptance_criteria()),
            image_search: ImageQualitySearch::new(normalizer, assembler, schedule),
            schedule,
            max_bytes: settings.max_bytes,
            max_compression_passes: settings.max_compression_passes,
        })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Normalize one image at the starting quality and validate the result.
    #[instrument(skip_all, fields(input = raw.len()))]
    pub fn process_single_image(&self, raw: &[u8]) -> crate::error::Result<SingleImageOutcome> {
        let image = RasterImage::decode(raw)?;
        let asset = self.normalizer.normalize(&image, self.schedule.start())?;
        let report = self.validator.validate(&asset);

        if report.passed() {
            info!(bytes = asset.len(), "image accepted");
        } else {
            warn!(failed = ?report.failed(), "image does not meet all criteria");
        }
        Ok(SingleImageOutcome { asset, report })
    }

    /// Build one PDF page per image, lowering JPEG quality until it fits.
    ///
    /// Every image is decoded before the search starts; the first one that
    /// fails aborts the whole batch.
    #[instrument(skip_all, fields(images = raw_images.len()))]
    pub fn generate_document_from_images<B: AsRef<[u8]>>(
        &self,
        raw_images: &[B],
    ) -> crate::error::Result<EncodedAsset> {
        if raw_images.is_empty() {
            return Err(BudgetPdfError::invalid_input("no images supplied"));
        }

        let images = raw_images
            .iter()
            .enumerate()
            .map(|(i, raw)| RasterImage::decode(raw.as_ref()).map_err(|e| e.at_input(i + 1)))
            .collect::<crate::error::Result<Vec<_>>>()?;

        let document = self
            .image_search
            .encode_under_budget(&images, self.max_bytes)?;
        info!(
            bytes = document.len(),
            quality = ?document.quality(),
            "document generated"
        );
        Ok(document)
    }

    /// Concatenate PDFs; recompress structurally if the result is over budget.
    #[instrument(skip_all, fields(documents = raw_documents.len()))]
    pub fn merge_documents<B: AsRef<[u8]>>(
        &self,
        raw_documents: &[B],
    ) -> crate::error::Result<EncodedAsset> {
        let merged = merge::merge_documents(raw_documents)?;
        if merged.fits(self.max_bytes) {
            return Ok(merged);
        }

        info!(
            bytes = merged.len(),
            budget = self.max_bytes,
            "merged document over budget, compressing"
        );
        let outcome = compress_under_budget(
            merged.bytes(),
            self.max_bytes,
            self.max_compression_passes,
        )?;
        let passes = outcome.passes();
        if let CompressionOutcome::BestEffort { asset, .. } = &outcome {
            warn!(bytes = asset.len(), "using best-effort compression result");
        }
        let asset = outcome.into_asset();

        // A best-effort result is still checked against the budget here.
        if !asset.fits(self.max_bytes) {
            return Err(BudgetPdfError::BudgetExceeded {
                budget: self.max_bytes,
                achieved: Some(asset.len()),
                attempts: passes,
            });
        }
        Ok(asset)
    }
}
