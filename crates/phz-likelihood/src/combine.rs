//! Merging the results of all regions of a source.
//!
//! Each region's PDFs are on the scale `exp(-normalization_log)` of that
//! region, so they are weighted by `exp(norm_log - max_norm_log)` before
//! merging. Numeric PDFs are merged on the union of their knots by linear
//! interpolation (a single-knot PDF acts as a spike at its knot);
//! categorical PDFs are summed per identifier.

use std::sync::RwLockReadGuard;

use indexmap::IndexMap;
use log::debug;
use phz_core::{PhzError, StateError};
use phz_grid::{Ebv, Pdf1D, QualifiedName, ReddeningCurve, Sed, Z};
use phz_model::{region, source, GridType, PdfAxis, RegionResults, SourceResults};

/// Knot types whose PDFs can be merged across regions.
pub trait PdfKnot: Clone + Sized {
    /// Weighted sum of `parts`, as `(pdf, weight)` pairs.
    fn merge(parts: &[(&Pdf1D<Self>, f64)]) -> Pdf1D<Self>;

    /// Normalize `pdf` in place, returning the divisor.
    fn normalize(pdf: &mut Pdf1D<Self>) -> Option<f64>;
}

impl PdfKnot for f64 {
    fn merge(parts: &[(&Pdf1D<f64>, f64)]) -> Pdf1D<f64> {
        let mut knots: Vec<f64> = parts.iter().flat_map(|(p, _)| p.knots().iter().copied()).collect();
        knots.sort_by(f64::total_cmp);
        knots.dedup();
        let mut merged = Pdf1D::zeros(&knots);
        for (x, out) in knots.iter().zip(merged.values_mut()) {
            *out = parts.iter().map(|(p, w)| w * p.interpolate(*x)).sum();
        }
        merged
    }

    fn normalize(pdf: &mut Pdf1D<f64>) -> Option<f64> {
        pdf.normalize_trapezoid()
    }
}

impl PdfKnot for QualifiedName {
    fn merge(parts: &[(&Pdf1D<QualifiedName>, f64)]) -> Pdf1D<QualifiedName> {
        let mut sums: IndexMap<QualifiedName, f64> = IndexMap::new();
        for (pdf, weight) in parts {
            for (knot, value) in pdf.iter() {
                *sums.entry(knot.clone()).or_insert(0.0) += weight * value;
            }
        }
        let knots: Vec<QualifiedName> = sums.keys().cloned().collect();
        let mut merged = Pdf1D::zeros(&knots);
        merged.values_mut().copy_from_slice(&sums.values().copied().collect::<Vec<_>>());
        merged
    }

    fn normalize(pdf: &mut Pdf1D<QualifiedName>) -> Option<f64> {
        pdf.normalize_sum()
    }
}

/// Build the results of a source from its processed regions.
///
/// Every region must carry its best posterior model and posterior log
/// grid; the likelihood best model is combined when every region has one.
/// A PDF kind is combined when every region holds it. With `normalize`,
/// combined PDFs are normalized and `Log1dPdfNorm` records the log of the
/// integral of the unnormalized posterior redshift PDF.
pub fn combine_regions(
    regions: IndexMap<String, RegionResults>,
    normalize: bool,
) -> Result<SourceResults, PhzError> {
    if regions.is_empty() {
        return Err(PhzError::InvalidInput {
            reason: "source has no region results".into(),
        });
    }
    let mut results = SourceResults::new();
    set_best(&regions, GridType::Posterior, &mut results)?;
    if regions.values().all(|r| {
        r.contains::<region::BestLikelihoodModel>() && r.contains::<region::LikelihoodLogGrid>()
    }) {
        set_best(&regions, GridType::Likelihood, &mut results)?;
    }

    for grid_type in [GridType::Posterior, GridType::Likelihood] {
        let z_norm = combine_axis::<Z>(&regions, grid_type, normalize, &mut results)?;
        combine_axis::<Ebv>(&regions, grid_type, normalize, &mut results)?;
        combine_axis::<ReddeningCurve>(&regions, grid_type, normalize, &mut results)?;
        combine_axis::<Sed>(&regions, grid_type, normalize, &mut results)?;
        if grid_type == GridType::Posterior {
            if let Some(log_norm) = z_norm {
                results.set::<source::Log1dPdfNorm>(log_norm)?;
            }
        }
    }

    results.set::<source::RegionResultsMap>(regions)?;
    Ok(results)
}

fn set_best(
    regions: &IndexMap<String, RegionResults>,
    grid_type: GridType,
    results: &mut SourceResults,
) -> Result<(), PhzError> {
    let mut best: Option<(&str, phz_grid::CellIndex, f64)> = None;
    for (name, region) in regions {
        let cell = grid_type.best_model(region)?;
        let value = *grid_type.log_grid(region)?.get(cell)?;
        if best.is_none_or(|(_, _, v)| value > v) {
            best = Some((name, cell, value));
        }
    }
    let Some((name, cell, value)) = best else {
        return Ok(());
    };
    let winner = &regions[name];
    let scale = match winner.get::<region::ScaleFactorGrid>() {
        Ok(grid) => {
            grid_type
                .log_grid(winner)?
                .check_compatible(&grid, "scale factor grid")?;
            Some(grid[cell])
        }
        Err(StateError::NotSet { .. }) => None,
        Err(e) => return Err(e.into()),
    };
    debug!("best {grid_type:?} model in region {name} at {cell:?}");
    match grid_type {
        GridType::Posterior => {
            results.set::<source::BestRegion>(name.to_string())?;
            results.set::<source::BestModel>(cell)?;
            results.set::<source::BestModelPosteriorLog>(value)?;
            if let Some(scale) = scale {
                results.set::<source::BestModelScaleFactor>(scale)?;
            }
        }
        GridType::Likelihood => {
            results.set::<source::BestLikelihoodRegion>(name.to_string())?;
            results.set::<source::BestLikelihoodModel>(cell)?;
            results.set::<source::BestModelLikelihoodLog>(value)?;
            if let Some(scale) = scale {
                results.set::<source::BestLikelihoodModelScaleFactor>(scale)?;
            }
        }
    }
    Ok(())
}

fn region_pdf<A: PdfAxis>(
    region: &RegionResults,
    grid_type: GridType,
) -> Result<RwLockReadGuard<'_, Pdf1D<A::Value>>, StateError> {
    match grid_type {
        GridType::Posterior => region.get::<A::RegionPosterior>(),
        GridType::Likelihood => region.get::<A::RegionLikelihood>(),
    }
}

/// Returns the log normalization (`max_norm_log + ln divisor`) when the
/// PDF was combined and normalized.
fn combine_axis<A>(
    regions: &IndexMap<String, RegionResults>,
    grid_type: GridType,
    normalize: bool,
    results: &mut SourceResults,
) -> Result<Option<f64>, PhzError>
where
    A: PdfAxis,
    A::Value: PdfKnot,
{
    let present = regions.values().all(|r| match grid_type {
        GridType::Posterior => r.contains::<A::RegionPosterior>(),
        GridType::Likelihood => r.contains::<A::RegionLikelihood>(),
    });
    if !present {
        return Ok(None);
    }

    let norms = regions
        .values()
        .map(|r| grid_type.normalization_log(r))
        .collect::<Result<Vec<f64>, _>>()?;
    let max_norm = norms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let guards = regions
        .values()
        .map(|r| region_pdf::<A>(r, grid_type))
        .collect::<Result<Vec<_>, _>>()?;
    let parts: Vec<(&Pdf1D<A::Value>, f64)> = guards
        .iter()
        .zip(&norms)
        .map(|(pdf, norm)| (&**pdf, (norm - max_norm).exp()))
        .collect();

    let mut merged = A::Value::merge(&parts);
    drop(parts);
    drop(guards);

    let divisor = if normalize {
        A::Value::normalize(&mut merged)
    } else {
        None
    };
    match grid_type {
        GridType::Posterior => results.set::<A::SourcePosterior>(merged)?,
        GridType::Likelihood => results.set::<A::SourceLikelihood>(merged)?,
    }
    Ok(divisor.map(|d| max_norm + d.ln()))
}
