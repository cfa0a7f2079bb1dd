//! Priors over the model axes.
//!
//! Every prior here builds a weight for each posterior cell and adds its
//! logarithm to `PosteriorLogGrid`, and to every scale sample of
//! `PosteriorScalingLogGrid` when the scale factor is sampled. A zero
//! weight excludes the model: its log value drops to `f64::MIN`.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;
use phz_core::{IndexError, PhzError};
use phz_grid::{AxesTuple, Axis, DoubleGrid, Grid, QualifiedName, Z};
use phz_model::{region, RegionResults};

use crate::stage::Prior;

fn add_log(log_value: &mut f64, weight: f64) {
    if weight == 0.0 {
        *log_value = f64::MIN;
    } else {
        *log_value += weight.ln();
    }
}

fn check_weight(what: &str, weight: f64) -> Result<f64, PhzError> {
    if weight >= 0.0 && weight.is_finite() {
        Ok(weight)
    } else {
        Err(PhzError::InvalidInput {
            reason: format!("{what} weight {weight} must be finite and non-negative"),
        })
    }
}

fn posterior_axes(results: &RegionResults) -> Result<AxesTuple, PhzError> {
    let posterior = results.get::<region::PosteriorLogGrid>()?;
    Ok(posterior.axes().clone())
}

/// Fold `weights` into the posterior log grid and, when the scale factor is
/// sampled, into every scale sample.
///
/// Fails with [`IndexError::IncompatibleAxes`] if either posterior grid has
/// other axes than `weights`.
pub fn fold_weights(results: &RegionResults, weights: &DoubleGrid) -> Result<(), PhzError> {
    {
        let mut posterior = results.get_mut::<region::PosteriorLogGrid>()?;
        posterior.check_compatible(weights, "prior weight grid")?;
        for (log_value, &weight) in posterior.as_mut_slice().iter_mut().zip(weights.as_slice()) {
            add_log(log_value, weight);
        }
    }

    let sampled = results.contains::<region::SampleScaleFactor>()
        && *results.get::<region::SampleScaleFactor>()?;
    if sampled {
        let mut scaling = results.get_mut::<region::PosteriorScalingLogGrid>()?;
        scaling.check_compatible(weights, "prior weight grid")?;
        for (samples, &weight) in scaling.as_mut_slice().iter_mut().zip(weights.as_slice()) {
            for log_value in samples {
                add_log(log_value, weight);
            }
        }
    }
    Ok(())
}

/// Spread one weight per knot of axis `A` over every cell of `axes`.
fn knot_weight_grid<A: Axis>(axes: AxesTuple, knot_weights: &[f64]) -> DoubleGrid {
    Grid::from_fn(axes, |index| knot_weights[index.axis::<A>()])
}

/// Fixed weights for the knots of a categorical axis.
///
/// Every knot of the posterior grid needs a weight; a missing one fails
/// with [`IndexError::ValueNotFound`].
pub struct AxisWeightPrior<A> {
    name: String,
    weights: IndexMap<QualifiedName, f64>,
    axis: PhantomData<fn() -> A>,
}

impl<A: Axis<Value = QualifiedName>> AxisWeightPrior<A> {
    /// Prior named `name` with the given knot weights.
    ///
    /// Weights must be finite and non-negative.
    pub fn new(
        name: impl Into<String>,
        weights: IndexMap<QualifiedName, f64>,
    ) -> Result<Self, PhzError> {
        for (knot, &weight) in &weights {
            check_weight(knot.as_str(), weight)?;
        }
        Ok(Self {
            name: name.into(),
            weights,
            axis: PhantomData,
        })
    }

    fn knot_weights(&self, knots: &[QualifiedName]) -> Result<Vec<f64>, IndexError> {
        knots
            .iter()
            .map(|knot| {
                self.weights
                    .get(knot)
                    .copied()
                    .ok_or_else(|| IndexError::ValueNotFound {
                        axis: A::PARAM.name(),
                        value: knot.to_string(),
                    })
            })
            .collect()
    }
}

impl<A> fmt::Debug for AxisWeightPrior<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisWeightPrior")
            .field("name", &self.name)
            .field("weights", &self.weights)
            .finish()
    }
}

impl<A: Axis<Value = QualifiedName>> Prior for AxisWeightPrior<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, results: &RegionResults) -> Result<(), PhzError> {
        let axes = posterior_axes(results)?;
        let knot_weights = self.knot_weights(A::knots(&axes))?;
        fold_weights(results, &knot_weight_grid::<A>(axes, &knot_weights))
    }
}

/// Weight of a numeric knot.
pub type KnotFunction = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// A function of the knot value of a numeric axis.
///
/// The function is evaluated once per knot; a negative or non-finite result
/// fails with [`PhzError::InvalidInput`].
pub struct AxisFunctionPrior<A> {
    name: String,
    function: KnotFunction,
    axis: PhantomData<fn() -> A>,
}

impl<A: Axis<Value = f64>> AxisFunctionPrior<A> {
    /// Prior named `name` weighting each knot `x` by `function(x)`.
    pub fn new(name: impl Into<String>, function: KnotFunction) -> Self {
        Self {
            name: name.into(),
            function,
            axis: PhantomData,
        }
    }

    fn knot_weights(&self, knots: &[f64]) -> Result<Vec<f64>, PhzError> {
        knots
            .iter()
            .map(|&x| check_weight(&format!("{} at {x}", A::PARAM), (self.function)(x)))
            .collect()
    }
}

impl<A> fmt::Debug for AxisFunctionPrior<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisFunctionPrior")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<A: Axis<Value = f64>> Prior for AxisFunctionPrior<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, results: &RegionResults) -> Result<(), PhzError> {
        let axes = posterior_axes(results)?;
        let knot_weights = self.knot_weights(A::knots(&axes))?;
        fold_weights(results, &knot_weight_grid::<A>(axes, &knot_weights))
    }
}

/// Full weight grids, one per parameter space a region may use.
///
/// The first grid sharing the posterior's axes is applied; if none does,
/// applying fails with [`IndexError::IncompatibleAxes`].
#[derive(Debug)]
pub struct GenericGridPrior {
    name: String,
    grids: Vec<DoubleGrid>,
}

impl GenericGridPrior {
    /// Prior named `name` over `grids`, whose cells must be finite and
    /// non-negative.
    pub fn new(name: impl Into<String>, grids: Vec<DoubleGrid>) -> Result<Self, PhzError> {
        let name = name.into();
        for grid in &grids {
            for &weight in grid.as_slice() {
                check_weight(&name, weight)?;
            }
        }
        Ok(Self { name, grids })
    }
}

impl Prior for GenericGridPrior {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, results: &RegionResults) -> Result<(), PhzError> {
        let axes = posterior_axes(results)?;
        let grid = self
            .grids
            .iter()
            .find(|grid| grid.axes().is_compatible(&axes))
            .ok_or_else(|| IndexError::IncompatibleAxes {
                reason: format!(
                    "none of the {} grids of prior {} has shape {:?}",
                    self.grids.len(),
                    self.name,
                    axes.shape()
                ),
            })?;
        fold_weights(results, grid)
    }
}

/// Density parameters of a Lambda-CDM cosmology.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cosmology {
    /// Matter density.
    pub omega_m: f64,
    /// Dark-energy density.
    pub omega_lambda: f64,
}

impl Default for Cosmology {
    /// Planck 2015.
    fn default() -> Self {
        Self {
            omega_m: 0.3089,
            omega_lambda: 0.6911,
        }
    }
}

const SIMPSON_INTERVALS: usize = 1000;

impl Cosmology {
    /// Curvature density, `1 - omega_m - omega_lambda`.
    pub fn omega_k(&self) -> f64 {
        1.0 - self.omega_m - self.omega_lambda
    }

    /// Hubble parameter in units of `H0`.
    pub fn hubble_ratio(&self, z: f64) -> f64 {
        let a = 1.0 + z;
        (self.omega_m * a.powi(3) + self.omega_k() * a * a + self.omega_lambda).sqrt()
    }

    /// Line-of-sight comoving distance in Hubble distances.
    pub fn comoving_distance(&self, z: f64) -> f64 {
        if z <= 0.0 {
            return 0.0;
        }
        let h = z / SIMPSON_INTERVALS as f64;
        let f = |x: f64| 1.0 / self.hubble_ratio(x);
        let inner: f64 = (1..SIMPSON_INTERVALS)
            .map(|i| {
                let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
                weight * f(i as f64 * h)
            })
            .sum();
        h / 3.0 * (f(0.0) + inner + f(z))
    }

    /// Transverse comoving distance in Hubble distances.
    pub fn transverse_distance(&self, z: f64) -> f64 {
        let d = self.comoving_distance(z);
        let k = self.omega_k();
        if k > 0.0 {
            (k.sqrt() * d).sinh() / k.sqrt()
        } else if k < 0.0 {
            ((-k).sqrt() * d).sin() / (-k).sqrt()
        } else {
            d
        }
    }

    /// Comoving volume per unit redshift and solid angle, in cubic Hubble
    /// distances.
    pub fn comoving_volume_element(&self, z: f64) -> f64 {
        let d = self.transverse_distance(z);
        d * d / self.hubble_ratio(z)
    }
}

/// Redshift shifted in for a zero-volume zero-redshift knot.
const NEAR_ZERO_REDSHIFT: f64 = 1e-4;

/// Weights redshifts by the comoving volume they enclose.
///
/// Volumes are computed up front for the expected redshift knots,
/// normalized to a peak of one and blended towards a flat prior:
/// `w = (1 - e) + e V(z) / max V`. With full effectiveness a zero redshift
/// would get zero volume, so it takes the volume at `z = 1e-4` instead.
#[derive(Clone, Debug)]
pub struct VolumePrior {
    weights: Vec<(f64, f64)>,
}

impl VolumePrior {
    /// Prior for `redshifts` under `cosmology`.
    ///
    /// `effectiveness` must lie in `[0, 1]`.
    pub fn new(cosmology: Cosmology, redshifts: &[f64], effectiveness: f64) -> Result<Self, PhzError> {
        if !(0.0..=1.0).contains(&effectiveness) {
            return Err(PhzError::InvalidInput {
                reason: format!("effectiveness {effectiveness} outside [0, 1]"),
            });
        }
        let volumes: Vec<f64> = redshifts
            .iter()
            .map(|&z| cosmology.comoving_volume_element(z))
            .collect();
        let max = volumes.iter().copied().fold(0.0, f64::max);
        let blend = |volume: f64| {
            if max > 0.0 {
                (1.0 - effectiveness) + effectiveness * volume / max
            } else {
                1.0
            }
        };
        let weights = redshifts
            .iter()
            .zip(volumes)
            .map(|(&z, volume)| {
                let mut weight = blend(volume);
                if z == 0.0 && weight == 0.0 {
                    weight = blend(cosmology.comoving_volume_element(NEAR_ZERO_REDSHIFT));
                }
                (z, weight)
            })
            .collect();
        debug!("volume prior over {} redshifts, peak volume {max}", redshifts.len());
        Ok(Self { weights })
    }

    fn weight_at(&self, z: f64) -> Result<f64, IndexError> {
        self.weights
            .iter()
            .find(|(knot, _)| *knot == z)
            .map(|&(_, weight)| weight)
            .ok_or_else(|| IndexError::ValueNotFound {
                axis: Z::PARAM.name(),
                value: z.to_string(),
            })
    }
}

impl Prior for VolumePrior {
    fn name(&self) -> &str {
        "volume"
    }

    fn apply(&self, results: &RegionResults) -> Result<(), PhzError> {
        let axes = posterior_axes(results)?;
        let knot_weights = axes
            .z()
            .iter()
            .map(|&z| self.weight_at(z))
            .collect::<Result<Vec<_>, _>>()?;
        fold_weights(results, &knot_weight_grid::<Z>(axes, &knot_weights))
    }
}
