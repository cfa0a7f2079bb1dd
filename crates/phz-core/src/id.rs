//! Strongly-typed identifiers.

use std::fmt;

/// Identifies one astronomical source of the input catalog.
///
/// The value is opaque to the engine; the dispatcher only requires that
/// the ids of one run are unique.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SourceId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
