//! Trapezoid-rule enclosing volumes of grid hyper-cells.
//!
//! A hyper-cell spans two consecutive knots on each continuous axis. Its
//! volume is the mean of `exp(log p)` over its corners times its extent,
//! summed over every reddening curve and SED. An axis with a single knot
//! contributes that knot alone with extent one. The scale-sample axis has
//! unit spacing.

use phz_core::PhzError;
use phz_grid::{AxesTuple, CellIndex, DoubleGrid, DoubleListGrid};
use smallvec::{smallvec, SmallVec};

/// The knots bounding a hyper-cell along one axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Span {
    pub lo: usize,
    pub hi: usize,
    pub width: f64,
}

impl Span {
    /// Corner knots with their linear interpolation weights at fraction `t`.
    pub fn corners(&self, t: f64) -> SmallVec<[(usize, f64); 2]> {
        if self.lo == self.hi {
            smallvec![(self.lo, 1.0)]
        } else {
            smallvec![(self.lo, 1.0 - t), (self.hi, t)]
        }
    }

    /// Coordinate at fraction `t` of the span.
    pub fn position(&self, knots: &[f64], t: f64) -> f64 {
        if self.lo == self.hi {
            knots[self.lo]
        } else {
            knots[self.lo] + t * (knots[self.hi] - knots[self.lo])
        }
    }

    /// Fractional sample index at fraction `t` of the span.
    pub fn index_position(&self, t: f64) -> f64 {
        if self.lo == self.hi {
            self.lo as f64
        } else {
            self.lo as f64 + t
        }
    }
}

fn spans(knots: &[f64]) -> Vec<Span> {
    if knots.len() == 1 {
        return vec![Span {
            lo: 0,
            hi: 0,
            width: 1.0,
        }];
    }
    knots
        .windows(2)
        .enumerate()
        .map(|(i, w)| Span {
            lo: i,
            hi: i + 1,
            width: w[1] - w[0],
        })
        .collect()
}

fn index_spans(count: usize) -> Vec<Span> {
    if count <= 1 {
        return vec![Span {
            lo: 0,
            hi: 0,
            width: 1.0,
        }];
    }
    (0..count - 1)
        .map(|i| Span {
            lo: i,
            hi: i + 1,
            width: 1.0,
        })
        .collect()
}

/// Log-probability values, one per model or one list per model.
#[derive(Clone, Copy, Debug)]
pub(crate) enum LogValues<'a> {
    Plain(&'a DoubleGrid),
    Scaled(&'a DoubleListGrid),
}

impl LogValues<'_> {
    pub fn axes(&self) -> &AxesTuple {
        match self {
            Self::Plain(g) => g.axes(),
            Self::Scaled(g) => g.axes(),
        }
    }

    /// Number of scale samples per model; all lists must share it.
    pub fn samples(&self) -> Result<usize, PhzError> {
        match self {
            Self::Plain(_) => Ok(1),
            Self::Scaled(g) => {
                let count = g.as_slice().first().map_or(0, Vec::len);
                if count == 0 || g.as_slice().iter().any(|l| l.len() != count) {
                    return Err(PhzError::InvalidInput {
                        reason: "scale-sample lists must be non-empty and of equal length".into(),
                    });
                }
                Ok(count)
            }
        }
    }

    pub fn at(&self, index: CellIndex, sample: usize) -> f64 {
        match self {
            Self::Plain(g) => g[index],
            Self::Scaled(g) => g[index][sample],
        }
    }

    pub fn max(&self) -> f64 {
        match self {
            Self::Plain(g) => g.as_slice().iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Scaled(g) => g
                .as_slice()
                .iter()
                .flatten()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// One hyper-cell of the continuous axes and its volume over all
/// reddening curves and SEDs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PosteriorCell {
    pub z: Span,
    pub ebv: Span,
    pub scale: Span,
    pub volume: f64,
}

impl PosteriorCell {
    fn extent(&self) -> f64 {
        self.z.width * self.ebv.width * self.scale.width
    }

    /// Multilinear interpolation of `f(z, ebv, sample)` at fractions `t`.
    pub fn interpolate(&self, t: [f64; 3], mut f: impl FnMut(usize, usize, usize) -> f64) -> f64 {
        let mut total = 0.0;
        for (z, wz) in self.z.corners(t[0]) {
            for (e, we) in self.ebv.corners(t[1]) {
                for (k, wk) in self.scale.corners(t[2]) {
                    total += wz * we * wk * f(z, e, k);
                }
            }
        }
        total
    }

    /// Largest value of `f` over the corners.
    pub fn corner_max(&self, mut f: impl FnMut(usize, usize, usize) -> f64) -> f64 {
        let mut max = f64::NEG_INFINITY;
        for (z, _) in self.z.corners(0.5) {
            for (e, _) in self.ebv.corners(0.5) {
                for (k, _) in self.scale.corners(0.5) {
                    max = max.max(f(z, e, k));
                }
            }
        }
        max
    }

    /// Volume of this cell for one reddening curve and SED, with
    /// probabilities taken as `exp(log p - offset)`.
    pub fn contribution(&self, values: &LogValues<'_>, red: usize, sed: usize, offset: f64) -> f64 {
        let mean = self.interpolate([0.5; 3], |z, e, k| {
            (values.at(CellIndex::new(z, e, red, sed), k) - offset).exp()
        });
        mean * self.extent()
    }
}

/// Every hyper-cell of `values`, with `samples` scale samples per model.
pub(crate) fn posterior_cells(values: &LogValues<'_>, samples: usize, offset: f64) -> Vec<PosteriorCell> {
    let axes = values.axes();
    let (reds, seds) = (axes.reddening_curves().len(), axes.seds().len());
    let mut cells = Vec::new();
    for scale in index_spans(samples) {
        for ebv in spans(axes.ebv()) {
            for z in spans(axes.z()) {
                let mut cell = PosteriorCell {
                    z,
                    ebv,
                    scale,
                    volume: 0.0,
                };
                let mut volume = 0.0;
                for sed in 0..seds {
                    for red in 0..reds {
                        volume += cell.contribution(values, red, sed, offset);
                    }
                }
                cell.volume = volume;
                cells.push(cell);
            }
        }
    }
    cells
}

/// Total enclosing volume of a log-probability grid.
pub fn enclosing_volume(log_grid: &DoubleGrid) -> f64 {
    posterior_cells(&LogValues::Plain(log_grid), 1, 0.0)
        .iter()
        .map(|c| c.volume)
        .sum()
}

/// Total enclosing volume of a grid of per-scale-sample log-probabilities.
///
/// Fails if the lists are empty or differ in length.
pub fn scaled_enclosing_volume(log_grid: &DoubleListGrid) -> Result<f64, PhzError> {
    let values = LogValues::Scaled(log_grid);
    let samples = values.samples()?;
    Ok(posterior_cells(&values, samples, 0.0)
        .iter()
        .map(|c| c.volume)
        .sum())
}
