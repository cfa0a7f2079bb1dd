//! Per-region posterior pipeline.
//!
//! Turns the `LikelihoodLogGrid` of one region into posterior grids, best
//! models and 1-D PDFs:
//!
//! 1. copy the likelihood log grid (and the scale-sample grid when
//!    `SampleScaleFactor` is set) into the posterior kinds
//! 2. record the best likelihood model
//! 3. apply every [`Prior`] in registration order
//! 4. record the best posterior model
//! 5. store both linear grids as `exp(log - max)`, keeping `max` as the
//!    normalization log
//! 6. run every [`Marginalization`] in registration order

use std::sync::Arc;

use log::debug;
use phz_core::PhzError;
use phz_grid::{CellIndex, DoubleGrid};
use phz_model::region;
use phz_model::RegionResults;

use crate::stage::{Marginalization, Prior};

/// Index and value of the largest cell, first in walk order on ties.
///
/// NaN cells are ignored; a grid of NaN only yields its first cell and
/// `f64::NEG_INFINITY`.
pub fn best_cell(grid: &DoubleGrid) -> (CellIndex, f64) {
    let mut best = (CellIndex::default(), f64::NEG_INFINITY);
    for (index, &value) in grid.iter() {
        if value > best.1 {
            best = (index, value);
        }
    }
    best
}

fn normalized(grid: &DoubleGrid, max: f64) -> DoubleGrid {
    grid.map(|v| (v - max).exp())
}

/// Ordered list of priors and marginalizations run for every region.
#[derive(Clone, Default)]
pub struct RegionPosterior {
    priors: Vec<Arc<dyn Prior>>,
    marginalizations: Vec<Arc<dyn Marginalization>>,
}

impl RegionPosterior {
    /// An empty pipeline: posterior equals likelihood, no PDF produced.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a prior.
    pub fn with_prior(mut self, prior: Arc<dyn Prior>) -> Self {
        self.priors.push(prior);
        self
    }

    /// Append a marginalization.
    pub fn with_marginalization(mut self, marginalization: Arc<dyn Marginalization>) -> Self {
        self.marginalizations.push(marginalization);
        self
    }

    /// Number of registered priors.
    pub fn prior_count(&self) -> usize {
        self.priors.len()
    }

    /// Number of registered marginalizations.
    pub fn marginalization_count(&self) -> usize {
        self.marginalizations.len()
    }

    /// Run the pipeline on one region.
    ///
    /// `results` must hold `LikelihoodLogGrid`, plus
    /// `LikelihoodScalingLogGrid` when `SampleScaleFactor` is true.
    pub fn process(&self, results: &mut RegionResults) -> Result<(), PhzError> {
        let likelihood = results.get::<region::LikelihoodLogGrid>()?.clone();

        let sampled = results.contains::<region::SampleScaleFactor>()
            && *results.get::<region::SampleScaleFactor>()?;
        if sampled {
            let scaling = results.get::<region::LikelihoodScalingLogGrid>()?.clone();
            results.set::<region::PosteriorScalingLogGrid>(scaling)?;
        }

        let (best_likelihood, likelihood_max) = best_cell(&likelihood);
        results.set::<region::BestLikelihoodModel>(best_likelihood)?;
        results.set::<region::PosteriorLogGrid>(likelihood.clone())?;

        for prior in &self.priors {
            prior.apply(results)?;
            debug!("applied prior {}", prior.name());
        }

        let (best, posterior_max, posterior_grid) = {
            let posterior = results.get::<region::PosteriorLogGrid>()?;
            let (best, max) = best_cell(&posterior);
            (best, max, normalized(&posterior, max))
        };
        results.set::<region::BestModel>(best)?;
        results.set::<region::NormalizationLog>(posterior_max)?;
        results.set::<region::PosteriorGrid>(posterior_grid)?;

        results.set::<region::LikelihoodNormalizationLog>(likelihood_max)?;
        results.set::<region::LikelihoodGrid>(normalized(&likelihood, likelihood_max))?;

        for marginalization in &self.marginalizations {
            marginalization.marginalize(results)?;
        }
        Ok(())
    }
}
