//! Results of one parameter-space region of one source.
//!
//! Kinds are grouped by the stage that sets them: the upstream likelihood
//! computation, the posterior pipeline, and the marginalizations.

use phz_core::{result_kinds, TypedEnumMap};
use phz_grid::{CellIndex, DoubleGrid, DoubleListGrid, Pdf1D, QualifiedName};

result_kinds! {
    /// Kinds of results stored per region.
    pub enum RegionResultType {
        /// Whether the scale factor is sampled (list-valued grids are present).
        SampleScaleFactor => bool,
        /// Best-fit scale factor of every model.
        ScaleFactorGrid => DoubleGrid,
        /// Uncertainty of the scale factor of every model.
        SigmaScaleFactorGrid => DoubleGrid,
        /// Log-likelihood of every model.
        LikelihoodLogGrid => DoubleGrid,
        /// Log-likelihood per scale-factor sample.
        LikelihoodScalingLogGrid => DoubleListGrid,
        /// Model with the highest likelihood.
        BestLikelihoodModel => CellIndex,
        /// Maximum log-likelihood, subtracted before exponentiation.
        LikelihoodNormalizationLog => f64,
        /// Likelihood in linear space, peak at one.
        LikelihoodGrid => DoubleGrid,
        /// Log-posterior of every model.
        PosteriorLogGrid => DoubleGrid,
        /// Log-posterior per scale-factor sample.
        PosteriorScalingLogGrid => DoubleListGrid,
        /// Model with the highest posterior.
        BestModel => CellIndex,
        /// Maximum log-posterior, subtracted before exponentiation.
        NormalizationLog => f64,
        /// Posterior in linear space, peak at one.
        PosteriorGrid => DoubleGrid,
        /// Posterior marginalized on redshift.
        Z1dPdf => Pdf1D<f64>,
        /// Posterior marginalized on E(B-V).
        Ebv1dPdf => Pdf1D<f64>,
        /// Posterior marginalized on the reddening curve.
        ReddeningCurve1dPdf => Pdf1D<QualifiedName>,
        /// Posterior marginalized on the SED.
        Sed1dPdf => Pdf1D<QualifiedName>,
        /// Likelihood marginalized on redshift.
        LikelihoodZ1dPdf => Pdf1D<f64>,
        /// Likelihood marginalized on E(B-V).
        LikelihoodEbv1dPdf => Pdf1D<f64>,
        /// Likelihood marginalized on the reddening curve.
        LikelihoodReddeningCurve1dPdf => Pdf1D<QualifiedName>,
        /// Likelihood marginalized on the SED.
        LikelihoodSed1dPdf => Pdf1D<QualifiedName>,
    }
}

/// Typed result store of one region.
pub type RegionResults = TypedEnumMap<RegionResultType>;
