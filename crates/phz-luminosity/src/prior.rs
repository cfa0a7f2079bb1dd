//! The luminosity prior.
//!
//! For every model, the scale factor is turned into a luminosity (or an
//! absolute magnitude), the luminosity function of the model's SED group
//! at its redshift is evaluated there, and the resulting weights are
//! blended towards a flat prior by the effectiveness before being added in
//! log space to the posterior. When the scale factor is sampled, the same
//! runs on every scale sample of every model.

use log::debug;
use phz_core::{IndexError, PhzError};
use phz_grid::{DoubleGrid, DoubleListGrid, Grid, Sed, Z};
use phz_likelihood::Prior;
use phz_model::{region, GroupManager, RegionResults};

use crate::domain::LuminosityFunctionSet;

/// AB zero point of a flux in microjansky.
const AB_ZERO_POINT_UJY: f64 = 3631e6;

/// AB magnitude of a flux in microjansky:
/// `-2.5 log10(f) + 2.5 log10(3631e6)`, about `-2.5 log10(f) + 23.9`.
pub fn mag_from_flux(flux: f64) -> f64 {
    -2.5 * (flux / AB_ZERO_POINT_UJY).log10()
}

/// Luminosity of scale sample `index` out of `count` samples spread evenly
/// over `[alpha - half_range, alpha + half_range]`.
///
/// `index` may be fractional. A single sample sits at `alpha`.
pub fn luminosity_in_sample(alpha: f64, half_range: f64, count: usize, index: f64) -> f64 {
    if count < 2 {
        return alpha;
    }
    alpha - half_range + index * 2.0 * half_range / (count - 1) as f64
}

/// Blend `weights` towards `max`: `w' = max (1 - e) + e w`.
pub fn apply_effectiveness(weights: &mut DoubleGrid, max: f64, effectiveness: f64) {
    for w in weights.as_mut_slice() {
        *w = blend(*w, max, effectiveness);
    }
}

/// [`apply_effectiveness`] on every scale sample.
pub fn apply_sample_effectiveness(weights: &mut DoubleListGrid, max: f64, effectiveness: f64) {
    for list in weights.as_mut_slice() {
        for w in list {
            *w = blend(*w, max, effectiveness);
        }
    }
}

fn blend(w: f64, max: f64, effectiveness: f64) -> f64 {
    max * (1.0 - effectiveness) + effectiveness * w
}

fn fold(log_value: &mut f64, weight: f64) {
    if weight == 0.0 {
        *log_value = f64::MIN;
    } else {
        *log_value += weight.ln();
    }
}

/// Add `ln(weight)` to every posterior cell; zero weights set the cell to
/// `f64::MIN`.
///
/// Fails with [`IndexError::IncompatibleAxes`] if the grids differ in axes.
pub fn apply_prior(
    weights: &DoubleGrid,
    posterior_log: &mut DoubleGrid,
) -> Result<(), IndexError> {
    posterior_log.check_compatible(weights, "prior weight grid")?;
    for (log_value, &weight) in posterior_log.as_mut_slice().iter_mut().zip(weights.as_slice()) {
        fold(log_value, weight);
    }
    Ok(())
}

/// [`apply_prior`] on every scale sample.
///
/// Also fails if a cell holds a different number of weights than of log
/// values.
pub fn apply_sample_prior(
    weights: &DoubleListGrid,
    posterior_log: &mut DoubleListGrid,
) -> Result<(), IndexError> {
    posterior_log.check_compatible(weights, "prior weight grid")?;
    for (logs, ws) in posterior_log.as_mut_slice().iter_mut().zip(weights.as_slice()) {
        if logs.len() != ws.len() {
            return Err(IndexError::IncompatibleAxes {
                reason: format!("{} prior weights for {} scale samples", ws.len(), logs.len()),
            });
        }
        for (log_value, &weight) in logs.iter_mut().zip(ws) {
            fold(log_value, weight);
        }
    }
    Ok(())
}

/// Luminosity prior over SED groups.
#[derive(Clone, Debug)]
pub struct LuminosityPrior {
    groups: GroupManager,
    functions: LuminosityFunctionSet,
    in_magnitude: bool,
    effectiveness: f64,
    scale_sigma_range: f64,
}

impl LuminosityPrior {
    /// Prior using `functions` for the SED groups of `groups`.
    ///
    /// With `in_magnitude`, functions are evaluated at the AB magnitude of
    /// the scale factor instead of the scale factor itself. Effectiveness
    /// defaults to one and the scale-sample range to five sigma.
    pub fn new(groups: GroupManager, functions: LuminosityFunctionSet, in_magnitude: bool) -> Self {
        Self {
            groups,
            functions,
            in_magnitude,
            effectiveness: 1.0,
            scale_sigma_range: 5.0,
        }
    }

    /// Set the effectiveness, which must lie in `[0, 1]`.
    pub fn with_effectiveness(mut self, effectiveness: f64) -> Result<Self, PhzError> {
        if !(0.0..=1.0).contains(&effectiveness) {
            return Err(PhzError::InvalidInput {
                reason: format!("effectiveness {effectiveness} outside [0, 1]"),
            });
        }
        self.effectiveness = effectiveness;
        Ok(self)
    }

    /// Set the half width of the scale-sample range, in sigmas.
    pub fn with_scale_sigma_range(mut self, n_sigma: f64) -> Result<Self, PhzError> {
        if !(n_sigma > 0.0 && n_sigma.is_finite()) {
            return Err(PhzError::InvalidInput {
                reason: format!("scale sigma range {n_sigma} must be finite and positive"),
            });
        }
        self.scale_sigma_range = n_sigma;
        Ok(self)
    }

    /// The luminosity-function argument for a scale factor.
    ///
    /// Non-positive fluxes have no magnitude and yield `None`.
    fn argument(&self, scale: f64) -> Option<f64> {
        if !self.in_magnitude {
            Some(scale)
        } else if scale > 0.0 {
            Some(mag_from_flux(scale))
        } else {
            None
        }
    }

    /// Raw weights of every model and their maximum.
    pub fn weights(&self, scale: &DoubleGrid) -> Result<(DoubleGrid, f64), PhzError> {
        let mut weights: DoubleGrid = Grid::new(scale.axes().clone());
        let mut max = 0.0f64;
        let axes = scale.axes().clone();
        for (sed_index, sed) in axes.seds().iter().enumerate() {
            let group = self.groups.group_of(sed)?;
            for (z_index, &z) in axes.z().iter().enumerate() {
                let function = self.functions.function_for(group, z)?;
                let cells = weights
                    .slice_mut()
                    .fix_index::<Sed>(sed_index)?
                    .fix_index::<Z>(z_index)?;
                for (index, w) in cells {
                    *w = self
                        .argument(scale[index])
                        .map_or(0.0, |x| function.evaluate(x));
                    max = max.max(*w);
                }
            }
        }
        Ok((weights, max))
    }

    /// Raw weights of every scale sample and their maximum.
    ///
    /// `samples` gives the number of scale samples of each model.
    pub fn sample_weights(
        &self,
        scale: &DoubleGrid,
        sigma: &DoubleGrid,
        samples: &Grid<usize>,
    ) -> Result<(DoubleListGrid, f64), PhzError> {
        scale.check_compatible(sigma, "sigma scale factor grid")?;
        scale.check_compatible(samples, "scale sample counts")?;
        let mut weights: DoubleListGrid = Grid::new(scale.axes().clone());
        let mut max = 0.0f64;
        let axes = scale.axes().clone();
        for (sed_index, sed) in axes.seds().iter().enumerate() {
            let group = self.groups.group_of(sed)?;
            for (z_index, &z) in axes.z().iter().enumerate() {
                let function = self.functions.function_for(group, z)?;
                let cells = weights
                    .slice_mut()
                    .fix_index::<Sed>(sed_index)?
                    .fix_index::<Z>(z_index)?;
                for (index, list) in cells {
                    let count = samples[index];
                    let half_range = self.scale_sigma_range * sigma[index];
                    *list = (0..count)
                        .map(|i| {
                            let lum = luminosity_in_sample(scale[index], half_range, count, i as f64);
                            self.argument(lum).map_or(0.0, |x| function.evaluate(x))
                        })
                        .collect();
                    max = list.iter().copied().fold(max, f64::max);
                }
            }
        }
        Ok((weights, max))
    }
}

impl Prior for LuminosityPrior {
    fn name(&self) -> &str {
        "luminosity"
    }

    fn apply(&self, results: &RegionResults) -> Result<(), PhzError> {
        let scale = results.get::<region::ScaleFactorGrid>()?;
        let (mut weights, max) = self.weights(&scale)?;
        debug!("luminosity prior maximum weight {max}");
        apply_effectiveness(&mut weights, max, self.effectiveness);
        {
            let mut posterior = results.get_mut::<region::PosteriorLogGrid>()?;
            apply_prior(&weights, &mut posterior)?;
        }

        let sampled = results.contains::<region::SampleScaleFactor>()
            && *results.get::<region::SampleScaleFactor>()?;
        if sampled {
            let sigma = results.get::<region::SigmaScaleFactorGrid>()?;
            let mut posterior = results.get_mut::<region::PosteriorScalingLogGrid>()?;
            let counts = posterior.map(Vec::len);
            let (mut weights, max) = self.sample_weights(&scale, &sigma, &counts)?;
            apply_sample_effectiveness(&mut weights, max, self.effectiveness);
            apply_sample_prior(&weights, &mut posterior)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ValidityDomain;
    use phz_grid::{AxesTuple, CellIndex};
    use std::sync::Arc;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn magnitude_of_flux() {
        assert!((mag_from_flux(1.0) - 23.9).abs() < 1e-3);
        assert!(close(mag_from_flux(1.0), 2.5 * 3631e6f64.log10()));
        assert!(close(mag_from_flux(3631e6), 0.0));
        assert!(close(mag_from_flux(3631e8), -5.0));
    }

    #[test]
    fn sample_luminosities() {
        assert_eq!(luminosity_in_sample(0.0, 1.0, 3, 0.0), -1.0);
        assert_eq!(luminosity_in_sample(1.0, 0.5, 3, 0.0), 0.5);
        assert!(close(luminosity_in_sample(1.0, 1.0, 3, 0.7), 0.7));
        assert!(close(luminosity_in_sample(1.0, 0.5, 11, 1.0), 0.6));
        assert_eq!(luminosity_in_sample(2.0, 0.5, 1, 0.0), 2.0);
    }

    #[test]
    fn effectiveness_blend() {
        let axes = AxesTuple::new(
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![0.0],
            vec!["r".into()],
            vec!["s".into()],
        )
        .unwrap();
        let mut w = Grid::from_vec(axes, (0..7).map(f64::from).collect()).unwrap();
        apply_effectiveness(&mut w, 6.0, 0.7);
        let expected = [1.8, 2.5, 3.2, 3.9, 4.6, 5.3, 6.0];
        for (got, want) in w.as_slice().iter().zip(expected) {
            assert!(close(*got, want), "{got} != {want}");
        }
    }

    #[test]
    fn zero_weight_floors_posterior() {
        let axes = AxesTuple::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0], vec!["r".into()], vec!["s".into()])
            .unwrap();
        let mut post = Grid::from_vec(axes.clone(), vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        let prior = Grid::from_vec(axes, vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]).unwrap();
        apply_prior(&prior, &mut post).unwrap();
        let expected = [f64::MIN, 0.0, 2f64.ln(), f64::MIN, 1.0, 1.0 + 2f64.ln()];
        assert_eq!(post.as_slice(), &expected);
    }

    #[test]
    fn mismatched_weight_grid_rejected() {
        let axes = AxesTuple::new(vec![0.0, 1.0], vec![0.0], vec!["r".into()], vec!["s".into()]).unwrap();
        let other = AxesTuple::new(vec![0.0], vec![0.0], vec!["r".into()], vec!["s".into()]).unwrap();
        let mut post = Grid::from_vec(axes, vec![0.0, 0.0]).unwrap();
        let prior = Grid::from_vec(other, vec![1.0]).unwrap();
        assert!(matches!(
            apply_prior(&prior, &mut post),
            Err(IndexError::IncompatibleAxes { .. })
        ));
        assert_eq!(post.as_slice(), &[0.0, 0.0]);

        let mut samples = post.map(|_| vec![0.0; 3]);
        let short = post.map(|_| vec![1.0; 2]);
        assert!(matches!(
            apply_sample_prior(&short, &mut samples),
            Err(IndexError::IncompatibleAxes { .. })
        ));
    }

    #[test]
    fn scale_grid_over_other_axes_is_an_error() {
        let axes = AxesTuple::new(vec![0.0, 1.0], vec![0.0], vec!["r".into()], vec!["a".into()]).unwrap();
        let other = AxesTuple::new(vec![0.0], vec![0.0], vec!["r".into()], vec!["a".into()]).unwrap();
        let mut results = RegionResults::new();
        results
            .set::<region::PosteriorLogGrid>(Grid::from_vec(axes, vec![0.0, 0.0]).unwrap())
            .unwrap();
        results
            .set::<region::ScaleFactorGrid>(Grid::from_vec(other, vec![2.0]).unwrap())
            .unwrap();
        assert!(matches!(
            identity_prior(false).apply(&results),
            Err(PhzError::Index(IndexError::IncompatibleAxes { .. }))
        ));
    }

    fn identity_prior(in_magnitude: bool) -> LuminosityPrior {
        let groups = GroupManager::new([("g1", vec!["a".into()]), ("g2", vec!["b".into()])]).unwrap();
        let functions = LuminosityFunctionSet::new()
            .with(ValidityDomain::new("g1", 0.0, 10.0), Arc::new(|x: f64| x.abs()))
            .with(ValidityDomain::new("g2", 0.0, 10.0), Arc::new(|x: f64| 2.0 * x.abs()));
        LuminosityPrior::new(groups, functions, in_magnitude)
    }

    #[test]
    fn group_weights_track_maximum() {
        let axes = AxesTuple::new(vec![0.0, 1.0], vec![0.0], vec!["r".into()], vec!["a".into(), "b".into()])
            .unwrap();
        let scale = Grid::from_vec(axes, vec![5.0, 4.0, 1.0, 3.0]).unwrap();
        let (w, max) = identity_prior(false).weights(&scale).unwrap();
        assert_eq!(w.as_slice(), &[5.0, 4.0, 2.0, 6.0]);
        assert_eq!(max, 6.0);
    }

    #[test]
    fn sampled_weights_span_sigma_range() {
        let axes = AxesTuple::new(vec![0.0], vec![0.0], vec!["r".into()], vec!["a".into()]).unwrap();
        let scale = Grid::from_vec(axes.clone(), vec![5.0]).unwrap();
        let sigma = Grid::from_vec(axes.clone(), vec![0.5]).unwrap();
        let counts = Grid::from_vec(axes, vec![3usize]).unwrap();
        let prior = identity_prior(false).with_scale_sigma_range(2.0).unwrap();
        let (w, max) = prior.sample_weights(&scale, &sigma, &counts).unwrap();
        assert_eq!(w[CellIndex::default()], vec![4.0, 5.0, 6.0]);
        assert_eq!(max, 6.0);
    }

    #[test]
    fn sampled_magnitudes() {
        let axes = AxesTuple::new(vec![0.0], vec![0.0], vec!["r".into()], vec!["a".into()]).unwrap();
        let scale = Grid::from_vec(axes.clone(), vec![3631e8]).unwrap();
        let sigma = Grid::from_vec(axes.clone(), vec![0.5 * 3631e8]).unwrap();
        let counts = Grid::from_vec(axes, vec![3usize]).unwrap();
        let prior = identity_prior(true).with_scale_sigma_range(1.0).unwrap();
        let (w, _) = prior.sample_weights(&scale, &sigma, &counts).unwrap();
        let got = &w[CellIndex::default()];
        assert!(close(got[0], 4.247425010840046));
        assert!(close(got[1], 5.0));
        assert!(close(got[2], 5.4402281476392025));
    }

    #[test]
    fn ungrouped_sed_fails() {
        let axes = AxesTuple::new(vec![0.0], vec![0.0], vec!["r".into()], vec!["zz".into()]).unwrap();
        let scale = Grid::from_vec(axes, vec![1.0]).unwrap();
        assert!(matches!(identity_prior(false).weights(&scale), Err(PhzError::Index(_))));
    }

    #[test]
    fn effectiveness_must_be_a_fraction() {
        assert!(identity_prior(false).with_effectiveness(1.5).is_err());
        assert!(identity_prior(false).with_effectiveness(0.0).is_ok());
        assert!(identity_prior(false).with_scale_sigma_range(0.0).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn blend_stays_between_weight_and_max(
                weights in prop::collection::vec(0.0f64..10.0, 4),
                effectiveness in 0.0f64..=1.0,
            ) {
                let axes = AxesTuple::new(
                    vec![0.0, 1.0, 2.0, 3.0],
                    vec![0.0],
                    vec!["r".into()],
                    vec!["a".into()],
                )
                .unwrap();
                let max = weights.iter().copied().fold(0.0, f64::max);
                let mut grid = Grid::from_vec(axes, weights.clone()).unwrap();
                apply_effectiveness(&mut grid, max, effectiveness);
                for (&before, &after) in weights.iter().zip(grid.as_slice()) {
                    prop_assert!(after >= before - 1e-12);
                    prop_assert!(after <= max + 1e-12);
                }
            }
        }
    }
}
