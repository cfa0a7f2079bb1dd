//! Scoring of one source from its per-region likelihoods.

use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;
use phz_core::{PhzError, SourceId, StateError};
use phz_likelihood::{combine_regions, Prior, RegionPosterior};
use phz_model::{source, GridType, RegionResults, SourceResults};
use phz_output::GridSampler;

use crate::context::RunContext;

/// Region posterior, source combination and grid sampling for one source.
///
/// Stateless between sources; one instance is shared by every worker.
#[derive(Clone)]
pub struct SourcePipeline {
    region: RegionPosterior,
    sampler: GridSampler,
    sample_number: usize,
}

impl SourcePipeline {
    /// Pipeline with the marginalizations and sampling settings of `ctx`.
    pub fn new(ctx: &RunContext) -> Result<Self, StateError> {
        let config = ctx.config();
        let region = config
            .marginalization
            .build()?
            .into_iter()
            .fold(RegionPosterior::new(), RegionPosterior::with_marginalization);
        let sampler = if config.sample_scale_factor {
            GridSampler::scaled(GridType::Posterior, config.scale_sigma_range)
        } else {
            GridSampler::new(GridType::Posterior)
        };
        Ok(Self {
            region,
            sampler,
            sample_number: config.sample_number,
        })
    }

    /// Append a prior applied to every region.
    pub fn with_prior(mut self, prior: Arc<dyn Prior>) -> Self {
        self.region = self.region.with_prior(prior);
        self
    }

    /// Score source `id` from the likelihood results of its regions.
    ///
    /// Each region must hold its likelihood log grid and scale factor
    /// grids. Samples are drawn from the source's own stream of `ctx`, so
    /// the outcome does not depend on the worker running it.
    pub fn process(
        &self,
        ctx: &RunContext,
        id: SourceId,
        mut regions: IndexMap<String, RegionResults>,
    ) -> Result<SourceResults, PhzError> {
        for results in regions.values_mut() {
            self.region.process(results)?;
        }
        let mut results = combine_regions(regions, true)?;
        let samples = {
            let regions = results.get::<source::RegionResultsMap>()?;
            let mut rng = ctx.source_rng(id);
            self.sampler.draw(self.sample_number, &regions, &mut rng)?
        };
        debug!("source {id}: drew {} grid samples", samples.len());
        results.set::<source::GridSamples>(samples)?;
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use phz_grid::{Pdf1D, QualifiedName};
    use phz_test_utils::{axes, grid, likelihood_region};

    fn context(sample_number: usize) -> RunContext {
        let mut config = RunConfig {
            sample_number,
            seed: 5,
            ..RunConfig::default()
        };
        config.marginalization.sed_pdf = true;
        RunContext::new(config).unwrap()
    }

    fn regions() -> IndexMap<String, RegionResults> {
        let shared = axes(&[0.0, 0.5, 1.0], &[0.0], &["r"], &["a", "b"]);
        let low = grid(shared.clone(), &[-3.0, -1.0, -2.0, -4.0, -4.0, -4.0]);
        let high = grid(shared, &[-5.0, -5.0, -5.0, -0.5, -2.0, -3.0]);
        [("low", likelihood_region(low, 2.0, 0.1)), ("high", likelihood_region(high, 3.0, 0.1))]
            .into_iter()
            .map(|(name, r)| (name.to_string(), r))
            .collect()
    }

    #[test]
    fn scores_a_source() {
        let ctx = context(300);
        let pipeline = SourcePipeline::new(&ctx).unwrap();
        let results = pipeline.process(&ctx, SourceId(1), regions()).unwrap();

        assert_eq!(*results.get::<source::BestRegion>().unwrap(), "high");
        assert_eq!(*results.get::<source::BestModelScaleFactor>().unwrap(), 3.0);
        assert_eq!(*results.get::<source::BestModelPosteriorLog>().unwrap(), -0.5);

        let z: Pdf1D<f64> = results.get::<source::Z1dPdf>().unwrap().clone();
        assert!((z.integral() - 1.0).abs() < 1e-9);
        let sed = results.get::<source::Sed1dPdf>().unwrap().clone();
        assert_eq!(sed.knots(), &[QualifiedName::from("a"), QualifiedName::from("b")]);
        assert!((sed.sum() - 1.0).abs() < 1e-9);

        let samples = results.get::<source::GridSamples>().unwrap();
        assert_eq!(samples.len(), 300);
        assert!(samples.iter().all(|s| (0.0..=1.0).contains(&s.z)));
        assert!(samples
            .iter()
            .all(|s| (s.alpha - [2.0, 3.0][s.region_index]).abs() < 1e-12));
        assert_eq!(results.get::<source::RegionResultsMap>().unwrap().len(), 2);
    }

    #[test]
    fn samples_depend_only_on_seed_and_source() {
        let ctx = context(50);
        let pipeline = SourcePipeline::new(&ctx).unwrap();
        let a = pipeline.process(&ctx, SourceId(7), regions()).unwrap();
        let b = pipeline.process(&ctx, SourceId(7), regions()).unwrap();
        let c = pipeline.process(&ctx, SourceId(8), regions()).unwrap();
        let a = a.get::<source::GridSamples>().unwrap().clone();
        assert_eq!(a, *b.get::<source::GridSamples>().unwrap());
        assert_ne!(a, *c.get::<source::GridSamples>().unwrap());
    }

    #[test]
    fn missing_likelihood_fails() {
        let ctx = context(10);
        let pipeline = SourcePipeline::new(&ctx).unwrap();
        let mut map = regions();
        map.insert("empty".to_string(), RegionResults::new());
        assert!(matches!(
            pipeline.process(&ctx, SourceId(0), map),
            Err(PhzError::State(StateError::NotSet { .. }))
        ));
    }
}
