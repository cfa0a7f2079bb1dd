//! Benchmark profiles for the phz posterior engine.
//!
//! - [`reference_axes`]: 121 redshifts, 6 E(B-V) values, 2 reddening
//!   curves and 10 SEDs (14 520 models)
//! - [`reference_region`]: one region of seeded likelihoods over those axes
//! - [`reference_source`]: the regions of one source

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use indexmap::IndexMap;
use phz_grid::{AxesTuple, Grid, QualifiedName};
use phz_model::{region, RegionResults};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Axes of the reference profile.
pub fn reference_axes() -> AxesTuple {
    let z = (0..121).map(|i| i as f64 * 0.05).collect();
    let ebv = vec![0.0, 0.05, 0.1, 0.2, 0.3, 0.5];
    let reddening_curves = ["calzetti", "smc"]
        .iter()
        .map(|name| QualifiedName::from(*name))
        .collect();
    let seds = (0..10)
        .map(|i| QualifiedName::from(format!("templates/sed{i}")))
        .collect();
    AxesTuple::new(z, ebv, reddening_curves, seds).expect("reference axes are valid")
}

/// A region of the reference profile with a smooth likelihood peak at a
/// seeded redshift, seeded noise, and seeded scale factors.
pub fn reference_region(seed: u64) -> RegionResults {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let peak = rng.random_range(0.5..5.5);
    let axes = reference_axes();
    let log = Grid::from_fn(axes.clone(), |i| {
        let z = i.z as f64 * 0.05;
        -0.5 * ((z - peak) / 0.3).powi(2) - 2.0 * i.ebv as f64 - rng.random::<f64>()
    });
    let scale = log.map(|_| rng.random_range(0.5..2.0));
    let sigma = scale.map(|s| 0.1 * s);

    let mut results = RegionResults::new();
    results
        .set::<region::ScaleFactorGrid>(scale)
        .expect("fresh store");
    results
        .set::<region::SigmaScaleFactorGrid>(sigma)
        .expect("fresh store");
    results
        .set::<region::LikelihoodLogGrid>(log)
        .expect("fresh store");
    results
}

/// The `regions` regions of one source, named `region0`, `region1`, ...
pub fn reference_source(seed: u64, regions: usize) -> IndexMap<String, RegionResults> {
    (0..regions)
        .map(|i| (format!("region{i}"), reference_region(seed.wrapping_add(i as u64))))
        .collect()
}
