//! Selection between the likelihood and posterior families of results.

use std::sync::RwLockReadGuard;

use phz_core::{ResultKind, StateError};
use phz_grid::{Axis, CellIndex, DoubleGrid, DoubleListGrid, Ebv, Pdf1D, ReddeningCurve, Sed, Z};

use crate::region::{self, RegionResultType, RegionResults};
use crate::source::{self, SourceResultType};

/// Which probability surface a stage reads: the likelihood or the posterior
/// (likelihood with priors applied).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GridType {
    /// The likelihood surface.
    Likelihood,
    /// The posterior surface.
    Posterior,
}

impl GridType {
    /// Log-probability grid of this family.
    pub fn log_grid(self, results: &RegionResults) -> Result<RwLockReadGuard<'_, DoubleGrid>, StateError> {
        match self {
            Self::Likelihood => results.get::<region::LikelihoodLogGrid>(),
            Self::Posterior => results.get::<region::PosteriorLogGrid>(),
        }
    }

    /// Linear probability grid of this family (peak normalized to one).
    pub fn grid(self, results: &RegionResults) -> Result<RwLockReadGuard<'_, DoubleGrid>, StateError> {
        match self {
            Self::Likelihood => results.get::<region::LikelihoodGrid>(),
            Self::Posterior => results.get::<region::PosteriorGrid>(),
        }
    }

    /// Per-scale-sample log-probability grid of this family.
    pub fn scaling_log_grid(
        self,
        results: &RegionResults,
    ) -> Result<RwLockReadGuard<'_, DoubleListGrid>, StateError> {
        match self {
            Self::Likelihood => results.get::<region::LikelihoodScalingLogGrid>(),
            Self::Posterior => results.get::<region::PosteriorScalingLogGrid>(),
        }
    }

    /// Log value subtracted when building the linear grid.
    pub fn normalization_log(self, results: &RegionResults) -> Result<f64, StateError> {
        match self {
            Self::Likelihood => results.get::<region::LikelihoodNormalizationLog>().map(|v| *v),
            Self::Posterior => results.get::<region::NormalizationLog>().map(|v| *v),
        }
    }

    /// Best model of this family.
    pub fn best_model(self, results: &RegionResults) -> Result<CellIndex, StateError> {
        match self {
            Self::Likelihood => results.get::<region::BestLikelihoodModel>().map(|v| *v),
            Self::Posterior => results.get::<region::BestModel>().map(|v| *v),
        }
    }
}

/// An axis with 1-D PDF result kinds at region and source level.
pub trait PdfAxis: Axis {
    /// Region-level posterior PDF kind.
    type RegionPosterior: ResultKind<Key = RegionResultType, Value = Pdf1D<Self::Value>>;
    /// Region-level likelihood PDF kind.
    type RegionLikelihood: ResultKind<Key = RegionResultType, Value = Pdf1D<Self::Value>>;
    /// Source-level posterior PDF kind.
    type SourcePosterior: ResultKind<Key = SourceResultType, Value = Pdf1D<Self::Value>>;
    /// Source-level likelihood PDF kind.
    type SourceLikelihood: ResultKind<Key = SourceResultType, Value = Pdf1D<Self::Value>>;
}

impl PdfAxis for Z {
    type RegionPosterior = region::Z1dPdf;
    type RegionLikelihood = region::LikelihoodZ1dPdf;
    type SourcePosterior = source::Z1dPdf;
    type SourceLikelihood = source::LikelihoodZ1dPdf;
}

impl PdfAxis for Ebv {
    type RegionPosterior = region::Ebv1dPdf;
    type RegionLikelihood = region::LikelihoodEbv1dPdf;
    type SourcePosterior = source::Ebv1dPdf;
    type SourceLikelihood = source::LikelihoodEbv1dPdf;
}

impl PdfAxis for ReddeningCurve {
    type RegionPosterior = region::ReddeningCurve1dPdf;
    type RegionLikelihood = region::LikelihoodReddeningCurve1dPdf;
    type SourcePosterior = source::ReddeningCurve1dPdf;
    type SourceLikelihood = source::LikelihoodReddeningCurve1dPdf;
}

impl PdfAxis for Sed {
    type RegionPosterior = region::Sed1dPdf;
    type RegionLikelihood = region::LikelihoodSed1dPdf;
    type SourcePosterior = source::Sed1dPdf;
    type SourceLikelihood = source::LikelihoodSed1dPdf;
}
