//! Reducers collapsing a four-axis grid onto one target axis.
//!
//! Every reducer visits, for each knot of the target axis, the hyperslice
//! holding the target at that knot. None of them normalizes its output.
//!
//! | Reducer | Statistic per target knot |
//! |---------|---------------------------|
//! | [`SumMarginalization`] | sum of probabilities (marginal) |
//! | [`MaxMarginalization`] | maximum probability (profile) |
//! | [`BayesianMarginalization`] | sum after log-space axis corrections |

mod bayesian;
mod correction;

use std::marker::PhantomData;

use phz_core::PhzError;
use phz_grid::{Axis, DoubleGrid, Pdf1D};
use phz_model::{GridType, PdfAxis, RegionResults};

use crate::stage::Marginalization;

pub use bayesian::BayesianMarginalization;
pub use correction::{AxisCorrection, GroupedAxisCorrection, NumericalAxisCorrection};

/// How the values of a grid encode probability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbabilitySpace {
    /// Values are probabilities.
    Linear,
    /// Values are natural-log probabilities.
    Log,
}

impl ProbabilitySpace {
    fn to_linear(self, v: f64) -> f64 {
        match self {
            Self::Linear => v,
            Self::Log => v.exp(),
        }
    }
}

/// Sum of the probabilities of all cells sharing each knot of axis `A`.
pub fn sum_marginalize<A: Axis>(grid: &DoubleGrid, space: ProbabilitySpace) -> Pdf1D<A::Value> {
    reduce::<A>(grid, |slice| slice.map(|v| space.to_linear(v)).sum())
}

/// Maximum probability among the cells sharing each knot of axis `A`.
pub fn max_marginalize<A: Axis>(grid: &DoubleGrid, space: ProbabilitySpace) -> Pdf1D<A::Value> {
    reduce::<A>(grid, |slice| {
        slice.map(|v| space.to_linear(v)).fold(0.0, f64::max)
    })
}

fn reduce<A: Axis>(
    grid: &DoubleGrid,
    mut f: impl FnMut(&mut dyn Iterator<Item = f64>) -> f64,
) -> Pdf1D<A::Value> {
    let knots = A::knots(grid.axes());
    let mut pdf = Pdf1D::zeros(knots);
    for (i, out) in pdf.values_mut().iter_mut().enumerate() {
        // `i` is a valid knot index, so fixing cannot fail.
        if let Ok(slice) = grid.slice().fix_index::<A>(i) {
            let mut values = slice.iter().map(|(_, v)| *v);
            *out = f(&mut values);
        }
    }
    pdf
}

pub(crate) fn store_pdf<A: PdfAxis>(
    results: &mut RegionResults,
    grid_type: GridType,
    pdf: Pdf1D<A::Value>,
) -> Result<(), PhzError> {
    match grid_type {
        GridType::Posterior => results.set::<A::RegionPosterior>(pdf)?,
        GridType::Likelihood => results.set::<A::RegionLikelihood>(pdf)?,
    }
    Ok(())
}

/// Sum-marginalizes the linear grid of a family onto axis `A`.
///
/// Reads `PosteriorGrid` or `LikelihoodGrid` and sets the matching 1-D PDF
/// kind of axis `A`.
#[derive(Debug)]
pub struct SumMarginalization<A> {
    grid_type: GridType,
    _axis: PhantomData<fn() -> A>,
}

impl<A: PdfAxis> SumMarginalization<A> {
    /// Reducer over the `grid_type` family.
    pub fn new(grid_type: GridType) -> Self {
        Self {
            grid_type,
            _axis: PhantomData,
        }
    }
}

impl<A: PdfAxis> Marginalization for SumMarginalization<A> {
    fn name(&self) -> &str {
        "sum"
    }

    fn marginalize(&self, results: &mut RegionResults) -> Result<(), PhzError> {
        let pdf = {
            let grid = self.grid_type.grid(results)?;
            sum_marginalize::<A>(&grid, ProbabilitySpace::Linear)
        };
        store_pdf::<A>(results, self.grid_type, pdf)
    }
}

/// Max-marginalizes the linear grid of a family onto axis `A`.
#[derive(Debug)]
pub struct MaxMarginalization<A> {
    grid_type: GridType,
    _axis: PhantomData<fn() -> A>,
}

impl<A: PdfAxis> MaxMarginalization<A> {
    /// Reducer over the `grid_type` family.
    pub fn new(grid_type: GridType) -> Self {
        Self {
            grid_type,
            _axis: PhantomData,
        }
    }
}

impl<A: PdfAxis> Marginalization for MaxMarginalization<A> {
    fn name(&self) -> &str {
        "max"
    }

    fn marginalize(&self, results: &mut RegionResults) -> Result<(), PhzError> {
        let pdf = {
            let grid = self.grid_type.grid(results)?;
            max_marginalize::<A>(&grid, ProbabilitySpace::Linear)
        };
        store_pdf::<A>(results, self.grid_type, pdf)
    }
}
