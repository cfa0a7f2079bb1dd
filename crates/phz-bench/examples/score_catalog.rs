//! End-to-end catalog scoring example.
//!
//! Demonstrates: build config → context → source pipeline → ordered
//! dispatcher → worker pool, then prints one line per source in catalog
//! order.

use phz_bench::reference_source;
use phz_core::{PhzError, SourceId};
use phz_engine::{run_sources, CollapseType, OrderedDispatcher, RunConfig, RunContext, SourcePipeline};
use phz_model::{source, SourceResults};

fn main() {
    println!("=== phz catalog scoring example ===\n");

    let mut config = RunConfig {
        worker_count: Some(4),
        sample_number: 200,
        seed: 42,
        ..RunConfig::default()
    };
    config.marginalization.posterior_collapse = CollapseType::Bayesian;
    config.marginalization.sed_pdf = true;
    let ctx = RunContext::new(config).unwrap();
    let pipeline = SourcePipeline::new(&ctx).unwrap();

    let handler = |id: SourceId, results: &SourceResults| -> Result<(), PhzError> {
        let region = results.get::<source::BestRegion>()?;
        let best = *results.get::<source::BestModel>()?;
        let z = results.get::<source::Z1dPdf>()?;
        let (peak, _) = z
            .iter()
            .fold((0.0, f64::NEG_INFINITY), |acc, (k, v)| if v > acc.1 { (*k, v) } else { acc });
        let samples = results.get::<source::GridSamples>()?;
        let mean_z = samples.iter().map(|s| s.z).sum::<f64>() / samples.len() as f64;
        println!(
            "source {id:>3}: best region {region}, model {best:?}, pdf peak z={peak:.2}, sample mean z={mean_z:.3}"
        );
        Ok(())
    };

    let order: Vec<SourceId> = (0..16).map(SourceId).collect();
    let dispatcher = OrderedDispatcher::new(&ctx, order.clone(), handler).unwrap();
    let done = run_sources(
        &ctx,
        order,
        |id| pipeline.process(&ctx, id, reference_source(id.0 * 7, 2)),
        &dispatcher,
    )
    .unwrap();

    println!("\nscored {done} sources, {} flushed", dispatcher.flushed());
}
