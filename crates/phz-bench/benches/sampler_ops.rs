//! Criterion micro-benchmarks for enclosing volumes and grid sampling.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use phz_bench::reference_source;
use phz_likelihood::RegionPosterior;
use phz_model::{region, GridType};
use phz_output::{enclosing_volume, GridSampler};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_enclosing_volume(c: &mut Criterion) {
    let source = reference_source(10, 1);
    let log = source[0].get::<region::LikelihoodLogGrid>().unwrap().clone();
    c.bench_function("enclosing_volume_14k", |b| {
        b.iter(|| black_box(enclosing_volume(black_box(&log))));
    });
}

fn bench_draw_1000(c: &mut Criterion) {
    let mut source = reference_source(20, 2);
    let pipeline = RegionPosterior::new();
    for results in source.values_mut() {
        pipeline.process(results).unwrap();
    }
    let sampler = GridSampler::new(GridType::Posterior);
    c.bench_function("draw_1000_two_regions", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        b.iter(|| black_box(sampler.draw(1000, &source, &mut rng).unwrap()));
    });
}

criterion_group!(benches, bench_enclosing_volume, bench_draw_1000);
criterion_main!(benches);
