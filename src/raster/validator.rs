use serde::Serialize;
use tracing::debug;

use super::asset::EncodedAsset;
use super::jpeg::read_header;
use crate::config::criteria::AcceptanceCriteria;

/// Per-criterion outcome of validating one asset.
///
/// Serializes as `{"size": bool, "dimensions": bool, "format": bool, "color_mode": bool}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub size: bool,
    pub dimensions: bool,
    pub format: bool,
    pub color_mode: bool,
}

impl ValidationReport {
    /// Criterion names paired with their outcome, in report order.
    pub fn criteria(&self) -> [(&'static str, bool); 4] {
        [
            ("size", self.size),
            ("dimensions", self.dimensions),
            ("format", self.format),
            ("color_mode", self.color_mode),
        ]
    }

    pub fn passed(&self) -> bool {
        self.criteria().iter().all(|&(_, ok)| ok)
    }

    pub fn failed(&self) -> Vec<&'static str> {
        self.criteria()
            .into_iter()
            .filter_map(|(name, ok)| (!ok).then_some(name))
            .collect()
    }
}

/// Checks encoded images against [`AcceptanceCriteria`].
#[derive(Debug, Clone)]
pub struct Validator {
    criteria: AcceptanceCriteria,
}

impl Validator {
    pub fn new(criteria: AcceptanceCriteria) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &AcceptanceCriteria {
        &self.criteria
    }

    /// Judge the asset from its bytes alone; the encoding tag is ignored.
    ///
    /// An unreadable header fails every criterion except `size`.
    pub fn validate(&self, asset: &EncodedAsset) -> ValidationReport {
        let size = asset.len() <= self.criteria.max_bytes;

        let report = match read_header(asset.bytes()) {
            Ok(header) => ValidationReport {
                size,
                dimensions: header.width >= self.criteria.min_width
                    && header.height >= self.criteria.min_height,
                format: header.format == Some(self.criteria.format),
                color_mode: header.color_model == self.criteria.color_model,
            },
            Err(e) => {
                debug!(error = %e, "asset header unreadable");
                ValidationReport {
                    size,
                    dimensions: false,
                    format: false,
                    color_mode: false,
                }
            }
        };

        debug!(?report, bytes = asset.len(), "asset validated");
        report
    }
}
