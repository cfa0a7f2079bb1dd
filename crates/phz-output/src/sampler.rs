//! Drawing representative points from region posterior grids.

use std::sync::RwLockReadGuard;

use indexmap::IndexMap;
use log::debug;
use phz_core::{IndexError, PhzError};
use phz_grid::{CellIndex, DoubleGrid, DoubleListGrid, Grid};
use phz_luminosity::luminosity_in_sample;
use phz_model::{region, GridSample, GridType, RegionResults};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

use crate::volume::{
    enclosing_volume, posterior_cells, scaled_enclosing_volume, LogValues, PosteriorCell,
};

/// Draws [`GridSample`]s from the regions of one source.
///
/// A region is picked with probability proportional to its enclosing
/// volume, then a hyper-cell of that region by its own volume, then a
/// reddening curve and SED by their share of the cell, and finally a
/// continuous position inside the cell from the multilinear density of its
/// corners. Draws never leave the range spanned by the knots; an axis with a
/// single knot always reports that knot.
///
/// The scaled variant reads the per-scale-sample log grids and treats the
/// sample index as a third continuous axis of unit spacing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSampler {
    grid_type: GridType,
    n_sigma: Option<f64>,
}

enum LogGuard<'a> {
    Plain(RwLockReadGuard<'a, DoubleGrid>),
    Scaled(RwLockReadGuard<'a, DoubleListGrid>),
}

impl LogGuard<'_> {
    fn values(&self) -> LogValues<'_> {
        match self {
            Self::Plain(g) => LogValues::Plain(&**g),
            Self::Scaled(g) => LogValues::Scaled(&**g),
        }
    }

    fn check_compatible<U>(&self, other: &Grid<U>, what: &str) -> Result<(), IndexError> {
        match self {
            Self::Plain(g) => g.check_compatible(other, what),
            Self::Scaled(g) => g.check_compatible(other, what),
        }
    }
}

struct RegionView<'a> {
    log: LogGuard<'a>,
    alpha: RwLockReadGuard<'a, DoubleGrid>,
    sigma: Option<RwLockReadGuard<'a, DoubleGrid>>,
    samples: usize,
}

struct RegionCells {
    cells: Vec<PosteriorCell>,
    pick: Option<WeightedIndex<f64>>,
}

fn weight_error(e: rand::distr::weighted::Error) -> PhzError {
    PhzError::InvalidInput {
        reason: format!("cannot sample weights: {e}"),
    }
}

impl GridSampler {
    /// Sampler over the plain log grid of `grid_type`.
    pub fn new(grid_type: GridType) -> Self {
        Self {
            grid_type,
            n_sigma: None,
        }
    }

    /// Sampler over the per-scale-sample log grid of `grid_type`, where the
    /// samples span `n_sigma` sigmas either side of the scale factor.
    pub fn scaled(grid_type: GridType, n_sigma: f64) -> Self {
        Self {
            grid_type,
            n_sigma: Some(n_sigma),
        }
    }

    /// Whether this sampler reads scale-sample grids.
    pub fn is_scaled(&self) -> bool {
        self.n_sigma.is_some()
    }

    /// Total enclosing volume of one region.
    pub fn region_volume(&self, results: &RegionResults) -> Result<f64, PhzError> {
        if self.is_scaled() {
            let grid = self.grid_type.scaling_log_grid(results)?;
            scaled_enclosing_volume(&grid)
        } else {
            Ok(enclosing_volume(&*self.grid_type.log_grid(results)?))
        }
    }

    fn view<'a>(&self, results: &'a RegionResults) -> Result<RegionView<'a>, PhzError> {
        let log = if self.is_scaled() {
            LogGuard::Scaled(self.grid_type.scaling_log_grid(results)?)
        } else {
            LogGuard::Plain(self.grid_type.log_grid(results)?)
        };
        let samples = log.values().samples()?;
        let alpha = results.get::<region::ScaleFactorGrid>()?;
        log.check_compatible(&alpha, "scale factor grid")?;
        let sigma = match self.n_sigma {
            Some(_) => {
                let sigma = results.get::<region::SigmaScaleFactorGrid>()?;
                log.check_compatible(&sigma, "sigma scale factor grid")?;
                Some(sigma)
            }
            None => None,
        };
        Ok(RegionView {
            log,
            alpha,
            sigma,
            samples,
        })
    }

    /// Draw `n` samples from `regions`.
    ///
    /// Fails if a region misses the grids this sampler reads or holds them
    /// over different axes, or if `n > 0` and no region carries any
    /// probability.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        n: usize,
        regions: &IndexMap<String, RegionResults>,
        rng: &mut R,
    ) -> Result<Vec<GridSample>, PhzError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let views = regions
            .values()
            .map(|r| self.view(r))
            .collect::<Result<Vec<_>, _>>()?;

        let offset = views
            .iter()
            .map(|v| v.log.values().max())
            .fold(f64::NEG_INFINITY, f64::max);
        let offset = if offset.is_finite() { offset } else { 0.0 };

        let mut prepared = Vec::with_capacity(views.len());
        let mut totals = Vec::with_capacity(views.len());
        for (name, view) in regions.keys().zip(&views) {
            let cells = posterior_cells(&view.log.values(), view.samples, offset);
            let total: f64 = cells.iter().map(|c| c.volume).sum();
            debug!("region {name}: relative enclosing volume {total}");
            let pick = if total > 0.0 {
                Some(WeightedIndex::new(cells.iter().map(|c| c.volume)).map_err(weight_error)?)
            } else {
                None
            };
            prepared.push(RegionCells { cells, pick });
            totals.push(total);
        }
        if totals.is_empty() {
            return Err(PhzError::InvalidInput {
                reason: "no regions to sample from".into(),
            });
        }
        let pick_region: WeightedIndex<f64> =
            WeightedIndex::new(totals.iter().copied()).map_err(weight_error)?;

        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let region_index = pick_region.sample(rng);
            let RegionCells { cells, pick } = &prepared[region_index];
            let pick = pick.as_ref().ok_or_else(|| PhzError::InvalidInput {
                reason: "picked a region without probability".into(),
            })?;
            let cell = &cells[pick.sample(rng)];
            out.push(self.draw_in_cell(region_index, &views[region_index], cell, offset, rng)?);
        }
        Ok(out)
    }

    fn draw_in_cell<R: Rng + ?Sized>(
        &self,
        region_index: usize,
        view: &RegionView<'_>,
        cell: &PosteriorCell,
        offset: f64,
        rng: &mut R,
    ) -> Result<GridSample, PhzError> {
        let values = view.log.values();
        let axes = values.axes();
        let reds = axes.reddening_curves().len();

        let shares = (0..axes.seds().len())
            .flat_map(|sed| (0..reds).map(move |red| (red, sed)))
            .map(|(red, sed)| cell.contribution(&values, red, sed, offset));
        let pair = WeightedIndex::<f64>::new(shares).map_err(weight_error)?.sample(rng);
        let (red, sed) = (pair % reds, pair / reds);

        let linear = |z, e, k| (values.at(CellIndex::new(z, e, red, sed), k) - offset).exp();
        let bound = cell.corner_max(linear);
        let t = loop {
            let t = [rng.random::<f64>(), rng.random::<f64>(), rng.random::<f64>()];
            if rng.random::<f64>() * bound <= cell.interpolate(t, linear) {
                break t;
            }
        };

        let log_probability = cell.interpolate(t, |z, e, k| values.at(CellIndex::new(z, e, red, sed), k));
        let at_model =
            |grid: &DoubleGrid| cell.interpolate(t, |z, e, _| grid[CellIndex::new(z, e, red, sed)]);
        let alpha_c = at_model(&*view.alpha);
        let alpha = match (self.n_sigma, &view.sigma) {
            (Some(n_sigma), Some(sigma)) => luminosity_in_sample(
                alpha_c,
                n_sigma * at_model(&**sigma),
                view.samples,
                cell.scale.index_position(t[2]),
            ),
            _ => alpha_c,
        };

        Ok(GridSample {
            region_index,
            sed_index: sed,
            sed: axes.seds()[sed].clone(),
            reddening_curve: axes.reddening_curves()[red].clone(),
            ebv: cell.ebv.position(axes.ebv(), t[1]),
            z: cell.z.position(axes.z(), t[0]),
            alpha,
            log_probability,
        })
    }
}
