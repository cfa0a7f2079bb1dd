use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use phz_core::{PhzError, StateError};
use phz_grid::{Ebv, ModelParameter};
use phz_model::{GridType, PdfAxis, RegionResults};

use super::correction::{AxisCorrection, NumericalAxisCorrection};
use super::{store_pdf, sum_marginalize, ProbabilitySpace};
use crate::stage::Marginalization;

/// Sum-marginalization of a corrected copy of the log grid.
///
/// Corrections are registered per axis and weight the integration over
/// that axis, so corrections of the target axis `A` itself are skipped.
/// The E(B-V) trapezoid correction is registered on construction.
///
/// The output is scaled by the family's normalization log, like the linear
/// grid read by [`SumMarginalization`](super::SumMarginalization): with no
/// applicable correction both reducers agree.
pub struct BayesianMarginalization<A> {
    grid_type: GridType,
    corrections: Vec<(ModelParameter, Arc<dyn AxisCorrection>)>,
    started: AtomicBool,
    _axis: PhantomData<fn() -> A>,
}

impl<A: PdfAxis> BayesianMarginalization<A> {
    /// Reducer over `grid_type` with the E(B-V) trapezoid correction.
    pub fn new(grid_type: GridType) -> Self {
        let mut reducer = Self::without_corrections(grid_type);
        reducer
            .corrections
            .push((ModelParameter::Ebv, Arc::new(NumericalAxisCorrection::<Ebv>::new())));
        reducer
    }

    /// Reducer over `grid_type` with no correction.
    pub fn without_corrections(grid_type: GridType) -> Self {
        Self {
            grid_type,
            corrections: Vec::new(),
            started: AtomicBool::new(false),
            _axis: PhantomData,
        }
    }

    /// Register `correction` for the integration over `axis`.
    ///
    /// Fails with [`StateError::AlreadyStarted`] once the reducer has
    /// produced output.
    pub fn add_correction(
        &mut self,
        axis: ModelParameter,
        correction: Arc<dyn AxisCorrection>,
    ) -> Result<(), StateError> {
        if self.started.load(Ordering::Acquire) {
            return Err(StateError::AlreadyStarted {
                what: "bayesian marginalization",
            });
        }
        self.corrections.push((axis, correction));
        Ok(())
    }

    /// Number of registered corrections.
    pub fn correction_count(&self) -> usize {
        self.corrections.len()
    }
}

impl<A: PdfAxis> Marginalization for BayesianMarginalization<A> {
    fn name(&self) -> &str {
        "bayesian"
    }

    fn marginalize(&self, results: &mut RegionResults) -> Result<(), PhzError> {
        self.started.store(true, Ordering::Release);
        let norm = self.grid_type.normalization_log(results)?;
        let mut grid = self.grid_type.log_grid(results)?.clone();
        for (axis, correction) in &self.corrections {
            if *axis != A::PARAM {
                correction.apply(&mut grid)?;
            }
        }
        for v in grid.as_mut_slice() {
            *v -= norm;
        }
        let pdf = sum_marginalize::<A>(&grid, ProbabilitySpace::Log);
        store_pdf::<A>(results, self.grid_type, pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marginalize::{GroupedAxisCorrection, SumMarginalization};
    use phz_grid::{AxesTuple, Grid, Sed, Z};
    use phz_model::{region, GroupManager};

    fn results(ebv: Vec<f64>) -> RegionResults {
        let axes = AxesTuple::new(
            vec![0.0, 1.0],
            ebv,
            vec!["r".into()],
            vec!["a".into(), "b".into()],
        )
        .unwrap();
        let log = Grid::from_fn(axes, |i| -(i.z as f64) - 0.5 * i.sed as f64);
        let max = log.as_slice().iter().copied().fold(f64::MIN, f64::max);
        let mut r = RegionResults::new();
        r.set::<region::PosteriorGrid>(log.map(|v| (v - max).exp())).unwrap();
        r.set::<region::PosteriorLogGrid>(log).unwrap();
        r.set::<region::NormalizationLog>(max).unwrap();
        r
    }

    #[test]
    fn without_corrections_matches_sum() {
        let mut a = results(vec![0.0, 0.5]);
        let mut b = results(vec![0.0, 0.5]);
        BayesianMarginalization::<Z>::without_corrections(GridType::Posterior)
            .marginalize(&mut a)
            .unwrap();
        SumMarginalization::<Z>::new(GridType::Posterior)
            .marginalize(&mut b)
            .unwrap();
        let pa = a.get::<region::Z1dPdf>().unwrap();
        let pb = b.get::<region::Z1dPdf>().unwrap();
        for (x, y) in pa.values().iter().zip(pb.values()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn ebv_widths_weight_redshift_pdf() {
        let mut r = results(vec![0.0, 0.5]);
        BayesianMarginalization::<Z>::new(GridType::Posterior)
            .marginalize(&mut r)
            .unwrap();
        let pdf = r.get::<region::Z1dPdf>().unwrap();
        // Both E(B-V) knots have width 0.25.
        let expected_z0 = 0.25 * 2.0 * (1.0 + (-0.5f64).exp());
        assert!((pdf.values()[0] - expected_z0).abs() < 1e-12);
        assert!((pdf.values()[1] - expected_z0 * (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn corrections_on_target_axis_are_skipped() {
        let groups = GroupManager::new([("ab", vec!["a".into(), "b".into()])]).unwrap();
        let mut reducer = BayesianMarginalization::<Sed>::without_corrections(GridType::Posterior);
        reducer
            .add_correction(ModelParameter::Sed, Arc::new(GroupedAxisCorrection::<Sed>::new(groups)))
            .unwrap();
        let mut a = results(vec![0.0]);
        reducer.marginalize(&mut a).unwrap();
        let mut b = results(vec![0.0]);
        SumMarginalization::<Sed>::new(GridType::Posterior)
            .marginalize(&mut b)
            .unwrap();
        assert_eq!(
            a.get::<region::Sed1dPdf>().unwrap().values(),
            b.get::<region::Sed1dPdf>().unwrap().values()
        );
    }

    #[test]
    fn multiple_corrections_add_up() {
        let groups = GroupManager::new([("ab", vec!["a".into(), "b".into()])]).unwrap();
        let mut reducer = BayesianMarginalization::<Z>::without_corrections(GridType::Posterior);
        for _ in 0..2 {
            reducer
                .add_correction(
                    ModelParameter::Sed,
                    Arc::new(GroupedAxisCorrection::<Sed>::new(groups.clone())),
                )
                .unwrap();
        }
        let mut r = results(vec![0.0]);
        reducer.marginalize(&mut r).unwrap();
        let pdf = r.get::<region::Z1dPdf>().unwrap();
        let expected = 0.25 * (1.0 + (-0.5f64).exp());
        assert!((pdf.values()[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn registering_after_start_fails() {
        let mut reducer = BayesianMarginalization::<Z>::new(GridType::Posterior);
        assert_eq!(reducer.correction_count(), 1);
        let mut r = results(vec![0.0, 0.5]);
        reducer.marginalize(&mut r).unwrap();
        match reducer.add_correction(ModelParameter::Ebv, Arc::new(NumericalAxisCorrection::<Ebv>::new())) {
            Err(StateError::AlreadyStarted { .. }) => {}
            other => panic!("expected AlreadyStarted, got {other:?}"),
        }
    }
}
