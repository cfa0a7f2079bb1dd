//! Log-space corrections applied to a grid before Bayesian summation.

use std::marker::PhantomData;

use phz_core::PhzError;
use phz_grid::{Axis, DoubleGrid, QualifiedName};
use phz_model::GroupManager;

/// A log-space additive weight folded into a copy of the grid.
pub trait AxisCorrection: Send + Sync {
    /// Add the correction to every cell of `log_grid`.
    fn apply(&self, log_grid: &mut DoubleGrid) -> Result<(), PhzError>;
}

/// Trapezoid-rule knot widths of a continuous axis.
///
/// Knot `i` gets weight `(x[i+1] - x[i-1]) / 2`, halved at both ends; an
/// axis with a single knot gets weight one.
#[derive(Debug)]
pub struct NumericalAxisCorrection<A> {
    _axis: PhantomData<fn() -> A>,
}

impl<A: Axis<Value = f64>> NumericalAxisCorrection<A> {
    /// Correction for axis `A`.
    pub fn new() -> Self {
        Self { _axis: PhantomData }
    }

    /// Integration weight of every knot of `knots`.
    pub fn weights(knots: &[f64]) -> Vec<f64> {
        let n = knots.len();
        if n < 2 {
            return vec![1.0; n];
        }
        (0..n)
            .map(|i| {
                let lo = knots[i.saturating_sub(1)];
                let hi = knots[(i + 1).min(n - 1)];
                (hi - lo) / 2.0
            })
            .collect()
    }
}

impl<A: Axis<Value = f64>> Default for NumericalAxisCorrection<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Axis<Value = f64>> AxisCorrection for NumericalAxisCorrection<A> {
    fn apply(&self, log_grid: &mut DoubleGrid) -> Result<(), PhzError> {
        let weights = Self::weights(A::knots(log_grid.axes()));
        for (index, cell) in log_grid.iter_mut() {
            *cell += weights[index.axis::<A>()].ln();
        }
        Ok(())
    }
}

/// Divides every categorical knot by the size of its group.
///
/// Fails if a knot of the axis belongs to no group.
#[derive(Debug)]
pub struct GroupedAxisCorrection<A> {
    groups: GroupManager,
    _axis: PhantomData<fn() -> A>,
}

impl<A: Axis<Value = QualifiedName>> GroupedAxisCorrection<A> {
    /// Correction for axis `A` using `groups`.
    pub fn new(groups: GroupManager) -> Self {
        Self {
            groups,
            _axis: PhantomData,
        }
    }
}

impl<A: Axis<Value = QualifiedName>> AxisCorrection for GroupedAxisCorrection<A> {
    fn apply(&self, log_grid: &mut DoubleGrid) -> Result<(), PhzError> {
        let mut offsets = Vec::new();
        for knot in A::knots(log_grid.axes()) {
            let group = self.groups.group_of(knot)?;
            let size = self.groups.members(group)?.len();
            offsets.push(-(size as f64).ln());
        }
        for (index, cell) in log_grid.iter_mut() {
            *cell += offsets[index.axis::<A>()];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phz_grid::{AxesTuple, CellIndex, Ebv, Grid, Sed};

    #[test]
    fn trapezoid_weights() {
        let w = NumericalAxisCorrection::<Ebv>::weights(&[0.0, 0.1, 0.3, 0.7]);
        let expected = [0.05, 0.15, 0.3, 0.2];
        for (got, want) in w.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
        assert_eq!(NumericalAxisCorrection::<Ebv>::weights(&[0.4]), vec![1.0]);
    }

    #[test]
    fn numerical_correction_adds_log_width() {
        let axes = AxesTuple::new(vec![0.0], vec![0.0, 0.2, 1.0], vec!["r".into()], vec!["s".into()])
            .unwrap();
        let mut grid: DoubleGrid = Grid::new(axes);
        NumericalAxisCorrection::<Ebv>::new().apply(&mut grid).unwrap();
        assert!((grid[CellIndex::new(0, 0, 0, 0)] - 0.1f64.ln()).abs() < 1e-12);
        assert!((grid[CellIndex::new(0, 1, 0, 0)] - 0.5f64.ln()).abs() < 1e-12);
        assert!((grid[CellIndex::new(0, 2, 0, 0)] - 0.4f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn grouped_correction_divides_by_group_size() {
        let groups = GroupManager::new([
            ("one", vec!["a".into()]),
            ("two", vec!["b".into(), "c".into()]),
        ])
        .unwrap();
        let axes = AxesTuple::new(
            vec![0.0],
            vec![0.0],
            vec!["r".into()],
            vec!["a".into(), "b".into()],
        )
        .unwrap();
        let mut grid: DoubleGrid = Grid::new(axes);
        GroupedAxisCorrection::<Sed>::new(groups).apply(&mut grid).unwrap();
        assert_eq!(grid[CellIndex::new(0, 0, 0, 0)], 0.0);
        assert!((grid[CellIndex::new(0, 0, 0, 1)] + 2.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn grouped_correction_rejects_ungrouped_knot() {
        let groups = GroupManager::new([("one", vec!["a".into()])]).unwrap();
        let axes = AxesTuple::new(vec![0.0], vec![0.0], vec!["r".into()], vec!["x".into()]).unwrap();
        let mut grid: DoubleGrid = Grid::new(axes);
        match GroupedAxisCorrection::<Sed>::new(groups).apply(&mut grid) {
            Err(PhzError::Index(_)) => {}
            other => panic!("expected Index error, got {other:?}"),
        }
    }
}
