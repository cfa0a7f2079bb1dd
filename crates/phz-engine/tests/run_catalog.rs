//! End-to-end run: luminosity prior, region posteriors, source combination,
//! sampling and ordered output over a worker pool.

use std::sync::Arc;

use indexmap::IndexMap;
use phz_core::{PhzError, SourceId};
use phz_engine::{run_sources, MultiHandler, OrderedDispatcher, RunConfig, RunContext, SourcePipeline};
use phz_grid::{QualifiedName, Z};
use phz_likelihood::NumericalAxisCorrection;
use phz_luminosity::{LuminosityFunctionSet, ValidityDomain};
use phz_model::{region, source, GroupManager, RegionResults, SourceResults};
use phz_test_utils::{axes, grid, likelihood_region, Recorder};

fn catalog_regions(id: SourceId) -> IndexMap<String, RegionResults> {
    let shared = axes(&[0.0, 0.5, 1.0], &[0.0, 0.1], &["calzetti"], &["ell/E", "sp/Sb"]);
    let shift = id.0 as f64 * 0.001;
    let low = grid(
        shared.clone(),
        &[
            -3.0, -1.0, -2.0, -3.5, -1.5, -2.5, // ell/E
            -4.0, -4.0, -4.0, -4.5, -4.5, -4.5, // sp/Sb
        ],
    );
    let high = grid(
        shared,
        &[
            -5.0, -5.0, -5.0, -5.0, -5.0, -5.0, // ell/E
            -0.5 - shift, -2.0, -3.0, -1.0, -2.5, -3.5, // sp/Sb
        ],
    );
    [("low", likelihood_region(low, 2.0, 0.2)), ("high", likelihood_region(high, 3.0, 0.2))]
        .into_iter()
        .map(|(name, r)| (name.to_string(), r))
        .collect()
}

fn luminosity_functions() -> LuminosityFunctionSet {
    let bright = |l: f64| if l > 2.5 { 1.0 } else { 0.5 };
    LuminosityFunctionSet::new()
        .with(ValidityDomain::new("ell", 0.0, 10.0), Arc::new(bright))
        .with(ValidityDomain::new("sp", 0.0, 10.0), Arc::new(bright))
}

fn groups() -> GroupManager {
    GroupManager::new([
        ("ell", vec![QualifiedName::from("ell/E")]),
        ("sp", vec![QualifiedName::from("sp/Sb")]),
    ])
    .unwrap()
}

#[test]
fn catalog_flows_through_the_pool_in_order() {
    let mut config = RunConfig {
        worker_count: Some(4),
        sample_number: 40,
        seed: 11,
        luminosity_effectiveness: 1.0,
        ..RunConfig::default()
    };
    config.marginalization.ebv_pdf = true;
    config.marginalization.sed_pdf = true;
    config.marginalization.likelihood_pdfs = true;
    config.marginalization.posterior_collapse = phz_engine::CollapseType::Bayesian;
    config
        .marginalization
        .add_correction(phz_grid::ModelParameter::Z, Arc::new(NumericalAxisCorrection::<Z>::new()))
        .unwrap();
    let ctx = RunContext::new(config).unwrap();

    let prior = ctx
        .config()
        .luminosity_prior(groups(), luminosity_functions(), false)
        .unwrap();
    let pipeline = SourcePipeline::new(&ctx).unwrap().with_prior(Arc::new(prior));

    let ids_seen = Recorder::new();
    let ids_sink = ids_seen.clone();
    let best = Recorder::new();
    let best_sink = best.clone();
    let handler = MultiHandler::new()
        .with(move |id: SourceId, _: &SourceResults| -> Result<(), PhzError> {
            ids_sink.push(id);
            Ok(())
        })
        .with(move |_: SourceId, results: &SourceResults| -> Result<(), PhzError> {
            let regions = results.get::<source::RegionResultsMap>()?;
            let low_best = *regions["low"].get::<region::BestModel>()?;
            let low_log = regions["low"].get::<region::PosteriorLogGrid>()?[low_best];
            best_sink.push((
                results.get::<source::BestRegion>()?.clone(),
                *results.get::<source::BestModelPosteriorLog>()?,
                low_log,
                results.get::<source::GridSamples>()?.len(),
                results.contains::<source::LikelihoodSed1dPdf>(),
            ));
            Ok(())
        });

    let order: Vec<SourceId> = (0..60).map(SourceId).collect();
    let dispatcher = OrderedDispatcher::new(&ctx, order.clone(), handler).unwrap();
    let done = run_sources(
        &ctx,
        order.clone(),
        |id| pipeline.process(&ctx, id, catalog_regions(id)),
        &dispatcher,
    )
    .unwrap();

    assert_eq!(done, 60);
    assert_eq!(ids_seen.snapshot(), order);
    for (i, (region, best_log, low_log, samples, likelihood_pdf)) in best.snapshot().into_iter().enumerate() {
        assert_eq!(region, "high");
        assert!((best_log - (-0.5 - i as f64 * 0.001)).abs() < 1e-12);
        assert!((low_log - (-1.0 + 0.5f64.ln())).abs() < 1e-12);
        assert_eq!(samples, 40);
        assert!(likelihood_pdf);
    }
}

#[test]
fn pipeline_failure_cancels_the_run() {
    let ctx = RunContext::new(RunConfig {
        worker_count: Some(2),
        sample_number: 5,
        ..RunConfig::default()
    })
    .unwrap();
    let pipeline = SourcePipeline::new(&ctx).unwrap();
    let order: Vec<SourceId> = (0..20).map(SourceId).collect();
    let dispatcher = OrderedDispatcher::new(&ctx, order.clone(), MultiHandler::new()).unwrap();
    let err = run_sources(
        &ctx,
        order,
        |id| {
            let mut regions = catalog_regions(id);
            if id == SourceId(3) {
                regions.insert("broken".to_string(), RegionResults::new());
            }
            pipeline.process(&ctx, id, regions)
        },
        &dispatcher,
    )
    .unwrap_err();
    assert!(matches!(err, PhzError::State(_)));
    assert!(ctx.is_cancelled());
    assert!(dispatcher.flushed() <= 3);
}
