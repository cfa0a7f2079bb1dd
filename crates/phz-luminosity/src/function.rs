//! Luminosity function shapes.

use log::warn;
use phz_core::IndexError;
use phz_grid::Pdf1D;

/// Number density of galaxies as a function of luminosity or magnitude.
pub trait LuminosityFunction: Send + Sync {
    /// Density at `x` (a luminosity or an absolute magnitude).
    fn evaluate(&self, x: f64) -> f64;
}

impl<F> LuminosityFunction for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn evaluate(&self, x: f64) -> f64 {
        self(x)
    }
}

/// Values above this are clamped.
const SCHECHTER_CAP: f64 = 100.0;

/// Schechter luminosity function, in magnitude or luminosity form.
#[derive(Clone, Debug, PartialEq)]
pub struct SchechterFunction {
    phi_star: f64,
    characteristic: f64,
    alpha: f64,
    in_magnitude: bool,
}

impl SchechterFunction {
    /// Magnitude form with characteristic magnitude `m_star`.
    pub fn magnitude(phi_star: f64, m_star: f64, alpha: f64) -> Self {
        Self {
            phi_star,
            characteristic: m_star,
            alpha,
            in_magnitude: true,
        }
    }

    /// Luminosity form with characteristic luminosity `l_star`.
    pub fn luminosity(phi_star: f64, l_star: f64, alpha: f64) -> Self {
        Self {
            phi_star,
            characteristic: l_star,
            alpha,
            in_magnitude: false,
        }
    }

    /// Whether the function takes absolute magnitudes.
    pub fn in_magnitude(&self) -> bool {
        self.in_magnitude
    }
}

impl LuminosityFunction for SchechterFunction {
    fn evaluate(&self, x: f64) -> f64 {
        let value = if self.in_magnitude {
            let ratio = 10f64.powf(0.4 * (self.characteristic - x));
            0.4 * std::f64::consts::LN_10
                * self.phi_star
                * ratio.powf(self.alpha + 1.0)
                * (-ratio).exp()
        } else {
            let ratio = x / self.characteristic;
            self.phi_star / self.characteristic * ratio.powf(self.alpha) * (-ratio).exp()
        };
        if value > SCHECHTER_CAP {
            warn!("schechter function value {value} at {x} clamped to {SCHECHTER_CAP}");
            SCHECHTER_CAP
        } else {
            value
        }
    }
}

/// Luminosity function tabulated on ascending knots.
///
/// Linear interpolation between knots, zero outside.
#[derive(Clone, Debug, PartialEq)]
pub struct TabulatedFunction {
    table: Pdf1D<f64>,
}

impl TabulatedFunction {
    /// Tabulate `values` at `knots`.
    pub fn new(knots: Vec<f64>, values: Vec<f64>) -> Result<Self, IndexError> {
        if knots.windows(2).any(|w| w[1] <= w[0]) {
            return Err(IndexError::InvalidAxis {
                axis: "luminosity",
                reason: "tabulated knots must be strictly ascending".into(),
            });
        }
        Ok(Self {
            table: Pdf1D::new(knots, values)?,
        })
    }
}

impl LuminosityFunction for TabulatedFunction {
    fn evaluate(&self, x: f64) -> f64 {
        self.table.interpolate(x)
    }
}
