//! Results of one source, combined over its regions.

use indexmap::IndexMap;
use phz_core::{result_kinds, TypedEnumMap};
use phz_grid::{CellIndex, Pdf1D, QualifiedName};

use crate::region::RegionResults;
use crate::sample::GridSample;

result_kinds! {
    /// Kinds of results stored per source.
    pub enum SourceResultType {
        /// Per-region results, keyed by region name.
        RegionResultsMap => IndexMap<String, RegionResults>,
        /// Region holding the best posterior model.
        BestRegion => String,
        /// Best posterior model within [`BestRegion`].
        BestModel => CellIndex,
        /// Scale factor of the best posterior model.
        BestModelScaleFactor => f64,
        /// Log-posterior of the best posterior model.
        BestModelPosteriorLog => f64,
        /// Region holding the best likelihood model.
        BestLikelihoodRegion => String,
        /// Best likelihood model within [`BestLikelihoodRegion`].
        BestLikelihoodModel => CellIndex,
        /// Scale factor of the best likelihood model.
        BestLikelihoodModelScaleFactor => f64,
        /// Log-likelihood of the best likelihood model.
        BestModelLikelihoodLog => f64,
        /// Posterior redshift PDF combined over regions.
        Z1dPdf => Pdf1D<f64>,
        /// Posterior E(B-V) PDF combined over regions.
        Ebv1dPdf => Pdf1D<f64>,
        /// Posterior reddening-curve PDF combined over regions.
        ReddeningCurve1dPdf => Pdf1D<QualifiedName>,
        /// Posterior SED PDF combined over regions.
        Sed1dPdf => Pdf1D<QualifiedName>,
        /// Likelihood redshift PDF combined over regions.
        LikelihoodZ1dPdf => Pdf1D<f64>,
        /// Likelihood E(B-V) PDF combined over regions.
        LikelihoodEbv1dPdf => Pdf1D<f64>,
        /// Likelihood reddening-curve PDF combined over regions.
        LikelihoodReddeningCurve1dPdf => Pdf1D<QualifiedName>,
        /// Likelihood SED PDF combined over regions.
        LikelihoodSed1dPdf => Pdf1D<QualifiedName>,
        /// Natural log of the factor the posterior redshift PDF was divided by.
        Log1dPdfNorm => f64,
        /// Points drawn from the posterior grid.
        GridSamples => Vec<GridSample>,
    }
}

/// Typed result store of one source.
pub type SourceResults = TypedEnumMap<SourceResultType>;
