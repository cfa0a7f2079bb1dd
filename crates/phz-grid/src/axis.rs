//! Axis identities, typed axis markers and the immutable [`AxesTuple`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use phz_core::IndexError;

/// Identifier of a categorical knot (a reddening curve or an SED).
///
/// A slash-separated path such as `"CWW/Sb"`; the last component is the
/// short name, the leading components its groups.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName(Arc<str>);

impl QualifiedName {
    /// Wrap a qualified name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The full qualified name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last path component.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The leading path components, outermost first.
    pub fn groups(&self) -> Vec<&str> {
        let mut parts: Vec<&str> = self.0.split('/').collect();
        parts.pop();
        parts
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for QualifiedName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The four model parameters, in grid axis order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelParameter {
    /// Redshift.
    Z,
    /// Dust reddening amount E(B-V).
    Ebv,
    /// Reddening law.
    ReddeningCurve,
    /// Spectral template.
    Sed,
}

impl ModelParameter {
    /// All parameters in axis order.
    pub const ALL: [ModelParameter; 4] = [
        ModelParameter::Z,
        ModelParameter::Ebv,
        ModelParameter::ReddeningCurve,
        ModelParameter::Sed,
    ];

    /// Position of this axis in the axis order.
    pub fn position(self) -> usize {
        self as usize
    }

    /// Display name of the axis.
    pub fn name(self) -> &'static str {
        match self {
            Self::Z => "Z",
            Self::Ebv => "E(B-V)",
            Self::ReddeningCurve => "Reddening Curve",
            Self::Sed => "SED",
        }
    }
}

impl fmt::Display for ModelParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed access to one of the four axes.
pub trait Axis: Send + Sync + 'static {
    /// Knot type of the axis.
    type Value: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;
    /// Which parameter this axis carries.
    const PARAM: ModelParameter;
    /// The axis knots of `axes`.
    fn knots(axes: &AxesTuple) -> &[Self::Value];
}

/// Redshift axis marker.
#[derive(Clone, Copy, Debug)]
pub struct Z;

/// E(B-V) axis marker.
#[derive(Clone, Copy, Debug)]
pub struct Ebv;

/// Reddening-curve axis marker.
#[derive(Clone, Copy, Debug)]
pub struct ReddeningCurve;

/// SED axis marker.
#[derive(Clone, Copy, Debug)]
pub struct Sed;

impl Axis for Z {
    type Value = f64;
    const PARAM: ModelParameter = ModelParameter::Z;
    fn knots(axes: &AxesTuple) -> &[f64] {
        &axes.inner.z
    }
}

impl Axis for Ebv {
    type Value = f64;
    const PARAM: ModelParameter = ModelParameter::Ebv;
    fn knots(axes: &AxesTuple) -> &[f64] {
        &axes.inner.ebv
    }
}

impl Axis for ReddeningCurve {
    type Value = QualifiedName;
    const PARAM: ModelParameter = ModelParameter::ReddeningCurve;
    fn knots(axes: &AxesTuple) -> &[QualifiedName] {
        &axes.inner.reddening_curves
    }
}

impl Axis for Sed {
    type Value = QualifiedName;
    const PARAM: ModelParameter = ModelParameter::Sed;
    fn knots(axes: &AxesTuple) -> &[QualifiedName] {
        &axes.inner.seds
    }
}

#[derive(Debug, PartialEq)]
struct AxesData {
    z: Vec<f64>,
    ebv: Vec<f64>,
    reddening_curves: Vec<QualifiedName>,
    seds: Vec<QualifiedName>,
}

/// The knots of the four grid axes. Immutable once constructed.
///
/// Cloning shares the knot storage.
#[derive(Clone, Debug)]
pub struct AxesTuple {
    inner: Arc<AxesData>,
}

impl AxesTuple {
    /// Build an axes tuple.
    ///
    /// Every axis needs at least one knot; Z and E(B-V) must be finite and
    /// strictly ascending; identifiers must be unique within their axis.
    pub fn new(
        z: Vec<f64>,
        ebv: Vec<f64>,
        reddening_curves: Vec<QualifiedName>,
        seds: Vec<QualifiedName>,
    ) -> Result<Self, IndexError> {
        check_numeric("Z", &z)?;
        check_numeric("E(B-V)", &ebv)?;
        check_names("Reddening Curve", &reddening_curves)?;
        check_names("SED", &seds)?;
        Ok(Self {
            inner: Arc::new(AxesData {
                z,
                ebv,
                reddening_curves,
                seds,
            }),
        })
    }

    /// Redshift knots.
    pub fn z(&self) -> &[f64] {
        &self.inner.z
    }

    /// E(B-V) knots.
    pub fn ebv(&self) -> &[f64] {
        &self.inner.ebv
    }

    /// Reddening-curve identifiers.
    pub fn reddening_curves(&self) -> &[QualifiedName] {
        &self.inner.reddening_curves
    }

    /// SED identifiers.
    pub fn seds(&self) -> &[QualifiedName] {
        &self.inner.seds
    }

    /// Knots of axis `A`.
    pub fn knots<A: Axis>(&self) -> &[A::Value] {
        A::knots(self)
    }

    /// Number of knots on `param`.
    pub fn len_of(&self, param: ModelParameter) -> usize {
        match param {
            ModelParameter::Z => self.inner.z.len(),
            ModelParameter::Ebv => self.inner.ebv.len(),
            ModelParameter::ReddeningCurve => self.inner.reddening_curves.len(),
            ModelParameter::Sed => self.inner.seds.len(),
        }
    }

    /// Knot counts in axis order.
    pub fn shape(&self) -> [usize; 4] {
        ModelParameter::ALL.map(|p| self.len_of(p))
    }

    /// Total number of cells of a grid over these axes.
    pub fn cell_count(&self) -> usize {
        self.shape().iter().product()
    }

    /// Index of the knot of axis `A` exactly equal to `value`.
    pub fn index_of<A: Axis>(&self, value: &A::Value) -> Result<usize, IndexError> {
        A::knots(self)
            .iter()
            .position(|k| k == value)
            .ok_or_else(|| IndexError::ValueNotFound {
                axis: A::PARAM.name(),
                value: format!("{value:?}"),
            })
    }

    /// Whether grids over `self` and `other` are index-compatible.
    pub fn is_compatible(&self, other: &AxesTuple) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl PartialEq for AxesTuple {
    fn eq(&self, other: &Self) -> bool {
        self.is_compatible(other)
    }
}

fn check_numeric(axis: &'static str, knots: &[f64]) -> Result<(), IndexError> {
    if knots.is_empty() {
        return Err(IndexError::InvalidAxis {
            axis,
            reason: "axis has no knots".into(),
        });
    }
    if let Some(bad) = knots.iter().find(|k| !k.is_finite()) {
        return Err(IndexError::InvalidAxis {
            axis,
            reason: format!("knot {bad} is not finite"),
        });
    }
    if let Some(w) = knots.windows(2).find(|w| w[1] <= w[0]) {
        return Err(IndexError::InvalidAxis {
            axis,
            reason: format!("knots must be strictly ascending, found {} then {}", w[0], w[1]),
        });
    }
    Ok(())
}

fn check_names(axis: &'static str, knots: &[QualifiedName]) -> Result<(), IndexError> {
    if knots.is_empty() {
        return Err(IndexError::InvalidAxis {
            axis,
            reason: "axis has no knots".into(),
        });
    }
    let mut seen = HashSet::with_capacity(knots.len());
    for name in knots {
        if !seen.insert(name) {
            return Err(IndexError::InvalidAxis {
                axis,
                reason: format!("duplicate identifier {name}"),
            });
        }
    }
    Ok(())
}
