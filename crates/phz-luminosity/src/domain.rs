//! Where each luminosity function applies.

use std::fmt;
use std::sync::Arc;

use phz_core::IndexError;

use crate::function::LuminosityFunction;

/// An SED group and a half-open redshift interval `[z_min, z_max)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidityDomain {
    /// SED group name.
    pub group: String,
    /// Lowest redshift covered.
    pub z_min: f64,
    /// Redshift bound, excluded.
    pub z_max: f64,
}

impl ValidityDomain {
    /// Domain covering `group` on `[z_min, z_max)`.
    pub fn new(group: impl Into<String>, z_min: f64, z_max: f64) -> Self {
        Self {
            group: group.into(),
            z_min,
            z_max,
        }
    }

    /// Whether (`group`, `z`) falls in this domain.
    pub fn contains(&self, group: &str, z: f64) -> bool {
        self.group == group && z >= self.z_min && z < self.z_max
    }
}

/// Luminosity functions keyed by validity domain.
///
/// Lookups return the first registered function whose domain matches.
#[derive(Clone, Default)]
pub struct LuminosityFunctionSet {
    entries: Vec<(ValidityDomain, Arc<dyn LuminosityFunction>)>,
}

impl LuminosityFunctionSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` for `domain`.
    pub fn with(mut self, domain: ValidityDomain, function: Arc<dyn LuminosityFunction>) -> Self {
        self.entries.push((domain, function));
        self
    }

    /// The function for `group` at redshift `z`.
    pub fn function_for(&self, group: &str, z: f64) -> Result<&dyn LuminosityFunction, IndexError> {
        self.entries
            .iter()
            .find(|(domain, _)| domain.contains(group, z))
            .map(|(_, function)| function.as_ref())
            .ok_or_else(|| IndexError::ValueNotFound {
                axis: "luminosity function domain",
                value: format!("{group} at z={z}"),
            })
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no function is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for LuminosityFunctionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(domain, _)| domain))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_open_redshift_range() {
        let d = ValidityDomain::new("late", 0.0, 1.0);
        assert!(d.contains("late", 0.0));
        assert!(d.contains("late", 0.99));
        assert!(!d.contains("late", 1.0));
        assert!(!d.contains("early", 0.5));
    }

    #[test]
    fn first_matching_function_wins() {
        let set = LuminosityFunctionSet::new()
            .with(ValidityDomain::new("g", 0.0, 1.0), Arc::new(|_: f64| 1.0))
            .with(ValidityDomain::new("g", 0.5, 2.0), Arc::new(|_: f64| 2.0))
            .with(ValidityDomain::new("h", 0.0, 2.0), Arc::new(|_: f64| 3.0));
        assert_eq!(set.function_for("g", 0.7).unwrap().evaluate(0.0), 1.0);
        assert_eq!(set.function_for("g", 1.5).unwrap().evaluate(0.0), 2.0);
        assert_eq!(set.function_for("h", 0.0).unwrap().evaluate(0.0), 3.0);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn uncovered_domain_fails() {
        let set = LuminosityFunctionSet::new().with(ValidityDomain::new("g", 0.0, 1.0), Arc::new(|x: f64| x));
        match set.function_for("g", 3.0) {
            Err(IndexError::ValueNotFound { value, .. }) => assert_eq!(value, "g at z=3"),
            Err(other) => panic!("expected ValueNotFound, got {other:?}"),
            Ok(_) => panic!("expected ValueNotFound"),
        }
    }
}
