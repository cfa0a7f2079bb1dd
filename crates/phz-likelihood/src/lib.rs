//! From a likelihood grid to per-source posterior products.
//!
//! - [`stage`]: the [`Prior`] and [`Marginalization`] stage traits
//! - [`marginalize`]: Sum, Max and Bayesian reducers and axis corrections
//! - [`prior`]: axis-weight, axis-function, weight-grid and volume priors
//! - [`posterior`]: the per-region pipeline ([`RegionPosterior`])
//! - [`combine`]: merging region results into one source result

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod combine;
pub mod marginalize;
pub mod posterior;
pub mod prior;
pub mod stage;

pub use combine::{combine_regions, PdfKnot};
pub use marginalize::{
    max_marginalize, sum_marginalize, AxisCorrection, BayesianMarginalization,
    GroupedAxisCorrection, MaxMarginalization, NumericalAxisCorrection, ProbabilitySpace,
    SumMarginalization,
};
pub use posterior::{best_cell, RegionPosterior};
pub use prior::{
    fold_weights, AxisFunctionPrior, AxisWeightPrior, Cosmology, GenericGridPrior, KnotFunction,
    VolumePrior,
};
pub use stage::{Marginalization, Prior};
