//! phz: grid-based photometric redshift posteriors.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! phz sub-crates. For most users, adding `phz` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use phz::prelude::*;
//! use phz::model::region;
//!
//! // Three redshifts, one E(B-V), one reddening curve, two SEDs.
//! let axes = AxesTuple::new(
//!     vec![0.0, 0.5, 1.0],
//!     vec![0.0],
//!     vec!["calzetti".into()],
//!     vec!["ell".into(), "sb".into()],
//! )
//! .unwrap();
//! // Values walk redshift fastest, then SED.
//! let likelihood = Grid::from_vec(axes, vec![-2.0, 0.0, -2.0, -3.0, -1.0, -3.0]).unwrap();
//!
//! let mut results = RegionResults::new();
//! results.set::<region::LikelihoodLogGrid>(likelihood).unwrap();
//!
//! let posterior = RegionPosterior::new()
//!     .with_marginalization(Arc::new(SumMarginalization::<Z>::new(GridType::Posterior)));
//! posterior.process(&mut results).unwrap();
//!
//! let pdf = results.get::<region::Z1dPdf>().unwrap();
//! assert_eq!(pdf.len(), 3);
//! assert!(pdf.values()[1] > pdf.values()[0]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `phz-core` | Errors, `SourceId`, the typed result map |
//! | [`grid`] | `phz-grid` | Axes, four-axis grids, slices, 1-D PDFs |
//! | [`model`] | `phz-model` | Region and source result kinds, grid samples |
//! | [`likelihood`] | `phz-likelihood` | Region posterior, marginalizations, region combination |
//! | [`luminosity`] | `phz-luminosity` | Luminosity functions and the luminosity prior |
//! | [`output`] | `phz-output` | Enclosing volumes and the grid sampler |
//! | [`engine`] | `phz-engine` | Run configuration, worker pool, ordered dispatch |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Errors, source ids and the typed result map.
///
/// Re-exports [`phz_core`]: [`types::PhzError`], [`types::SourceId`],
/// [`types::TypedEnumMap`].
pub use phz_core as types;

/// Parameter-space axes, grids and 1-D PDFs.
///
/// Re-exports [`phz_grid`]: [`grid::AxesTuple`], [`grid::Grid`],
/// [`grid::Pdf1D`].
pub use phz_grid as grid;

/// Result kinds stored per region and per source.
///
/// Re-exports [`phz_model`]: [`model::RegionResults`],
/// [`model::SourceResults`], [`model::GridSample`].
pub use phz_model as model;

/// Posterior computation and marginalization of one region.
///
/// Re-exports [`phz_likelihood`]: [`likelihood::RegionPosterior`],
/// [`likelihood::combine_regions`].
pub use phz_likelihood as likelihood;

/// Luminosity functions and the luminosity prior.
///
/// Re-exports [`phz_luminosity`]: [`luminosity::LuminosityPrior`].
pub use phz_luminosity as luminosity;

/// Volumes and sampling of posterior grids.
///
/// Re-exports [`phz_output`]: [`output::GridSampler`].
pub use phz_output as output;

/// Catalog runs: configuration, workers and ordered output.
///
/// Re-exports [`phz_engine`]: [`engine::RunConfig`],
/// [`engine::OrderedDispatcher`], [`engine::run_sources`].
pub use phz_engine as engine;

/// Common imports for typical phz usage.
///
/// ```rust
/// use phz::prelude::*;
/// ```
///
/// This imports the most frequently used types: axes and grids, the result
/// stores, the region posterior and its stages, the sampler and the run
/// engine.
pub mod prelude {
    // Core types and errors
    pub use phz_core::{DeepClone, PhzError, SourceId, StateError};

    // Grids
    pub use phz_grid::{
        AxesTuple, CellIndex, DoubleGrid, Ebv, Grid, Pdf1D, QualifiedName, ReddeningCurve, Sed, Z,
    };

    // Result stores
    pub use phz_model::{GridSample, GridType, RegionResults, SourceResults};

    // Region posterior
    pub use phz_likelihood::{
        combine_regions, AxisFunctionPrior, AxisWeightPrior, BayesianMarginalization,
        GenericGridPrior, Marginalization, MaxMarginalization, Prior, RegionPosterior,
        SumMarginalization, VolumePrior,
    };

    // Luminosity
    pub use phz_luminosity::{LuminosityFunction, LuminosityPrior};

    // Sampling
    pub use phz_output::GridSampler;

    // Engine
    pub use phz_engine::{
        run_sources, CollapseType, MultiHandler, OrderedDispatcher, OutputHandler, RunConfig,
        RunContext, SourcePipeline,
    };
}
