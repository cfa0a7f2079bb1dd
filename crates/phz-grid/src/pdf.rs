//! One-dimensional probability curves.

use phz_core::{DeepClone, IndexError};

/// A 1-D probability curve: one value per knot of an axis.
///
/// Values are not normalized unless a `normalize_*` method is called.
#[derive(Clone, Debug, PartialEq)]
pub struct Pdf1D<T> {
    knots: Vec<T>,
    values: Vec<f64>,
}

impl<T: Clone> Pdf1D<T> {
    /// Pair `knots` with `values`; both must have the same length.
    pub fn new(knots: Vec<T>, values: Vec<f64>) -> Result<Self, IndexError> {
        if knots.len() != values.len() {
            return Err(IndexError::IncompatibleAxes {
                reason: format!("{} knots but {} values", knots.len(), values.len()),
            });
        }
        Ok(Self { knots, values })
    }

    /// A curve over `knots` with every value zero.
    pub fn zeros(knots: &[T]) -> Self {
        Self {
            knots: knots.to_vec(),
            values: vec![0.0; knots.len()],
        }
    }

    /// The axis knots.
    pub fn knots(&self) -> &[T] {
        &self.knots
    }

    /// The curve values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable curve values.
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Number of knots.
    pub fn len(&self) -> usize {
        self.knots.len()
    }

    /// Whether the curve has no knot.
    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    /// `(knot, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&T, f64)> + '_ {
        self.knots.iter().zip(self.values.iter().copied())
    }

    /// Sum of all values.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Divide every value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.values {
            *v /= factor;
        }
    }

    /// Normalize so the values sum to one.
    ///
    /// Returns the divisor, or `None` (values untouched) when the sum is
    /// zero or not finite.
    pub fn normalize_sum(&mut self) -> Option<f64> {
        let total = self.sum();
        if total > 0.0 && total.is_finite() {
            self.scale(total);
            Some(total)
        } else {
            None
        }
    }
}

impl Pdf1D<f64> {
    /// Trapezoid-rule integral over the knots. A single-knot curve
    /// integrates to its value.
    pub fn integral(&self) -> f64 {
        if self.knots.len() == 1 {
            return self.values[0];
        }
        self.knots
            .windows(2)
            .zip(self.values.windows(2))
            .map(|(x, y)| 0.5 * (y[0] + y[1]) * (x[1] - x[0]))
            .sum()
    }

    /// Normalize so the trapezoid integral is one.
    ///
    /// Returns the divisor, or `None` when the integral is zero or not
    /// finite.
    pub fn normalize_trapezoid(&mut self) -> Option<f64> {
        let total = self.integral();
        if total > 0.0 && total.is_finite() {
            self.scale(total);
            Some(total)
        } else {
            None
        }
    }

    /// Linear interpolation at `x`; zero outside the knot range.
    pub fn interpolate(&self, x: f64) -> f64 {
        let knots = &self.knots;
        match knots.len() {
            0 => 0.0,
            1 => {
                if x == knots[0] {
                    self.values[0]
                } else {
                    0.0
                }
            }
            n => {
                if x < knots[0] || x > knots[n - 1] {
                    return 0.0;
                }
                let upper = knots.partition_point(|k| *k < x).max(1);
                let (x0, x1) = (knots[upper - 1], knots[upper]);
                let (y0, y1) = (self.values[upper - 1], self.values[upper]);
                y0 + (y1 - y0) * (x - x0) / (x1 - x0)
            }
        }
    }
}

impl<T: Clone> DeepClone for Pdf1D<T> {
    fn deep_clone(&self) -> Self {
        self.clone()
    }
}
