//! Test fixtures and recorders for phz development.
//!
//! Builders for axes, grids and region stores used across the workspace's
//! unit and integration tests, plus a thread-safe [`Recorder`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::{Arc, Mutex};

use phz_grid::{AxesTuple, CellIndex, DoubleGrid, Grid, QualifiedName};
use phz_model::{region, RegionResults};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

pub fn names(list: &[&str]) -> Vec<QualifiedName> {
    list.iter().map(|s| QualifiedName::from(*s)).collect()
}

/// Axes from explicit knots. Panics on invalid knots.
pub fn axes(z: &[f64], ebv: &[f64], reddening_curves: &[&str], seds: &[&str]) -> AxesTuple {
    AxesTuple::new(z.to_vec(), ebv.to_vec(), names(reddening_curves), names(seds))
        .expect("fixture axes must be valid")
}

/// Axes with evenly spaced numeric knots and generated identifiers.
pub fn uniform_axes(nz: usize, nebv: usize, nred: usize, nsed: usize) -> AxesTuple {
    AxesTuple::new(
        (0..nz).map(|i| i as f64 * 0.1).collect(),
        (0..nebv).map(|i| i as f64 * 0.05).collect(),
        (0..nred).map(|i| QualifiedName::from(format!("red{i}"))).collect(),
        (0..nsed).map(|i| QualifiedName::from(format!("sed{i}"))).collect(),
    )
    .expect("fixture axes must be valid")
}

/// Grid from values listed in walk order (redshift fastest).
pub fn grid(axes: AxesTuple, values: &[f64]) -> DoubleGrid {
    Grid::from_vec(axes, values.to_vec()).expect("fixture values must match the axes")
}

/// Log-probability grid with values uniform in `[low, 0)`, seeded.
pub fn random_log_grid(axes: AxesTuple, low: f64, seed: u64) -> DoubleGrid {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Grid::from_fn(axes, |_| low * rng.random::<f64>())
}

/// Region store holding a likelihood log grid and constant scale factors.
pub fn likelihood_region(log_grid: DoubleGrid, scale: f64, sigma: f64) -> RegionResults {
    let mut results = RegionResults::new();
    results
        .set::<region::ScaleFactorGrid>(log_grid.map(|_| scale))
        .expect("fresh store");
    results
        .set::<region::SigmaScaleFactorGrid>(log_grid.map(|_| sigma))
        .expect("fresh store");
    results
        .set::<region::LikelihoodLogGrid>(log_grid)
        .expect("fresh store");
    results
}

/// Region store holding only a posterior log grid and scale factors, as the
/// sampler reads it.
pub fn posterior_region(log_grid: DoubleGrid, scale: f64) -> RegionResults {
    let mut results = RegionResults::new();
    results
        .set::<region::ScaleFactorGrid>(log_grid.map(|_| scale))
        .expect("fresh store");
    results
        .set::<region::PosteriorLogGrid>(log_grid)
        .expect("fresh store");
    results
}

pub fn cell(z: usize, ebv: usize, reddening_curve: usize, sed: usize) -> CellIndex {
    CellIndex::new(z, ebv, reddening_curve, sed)
}

/// Thread-safe append-only log of values.
#[derive(Debug)]
pub struct Recorder<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: T) {
        self.items.lock().unwrap().push(item);
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
