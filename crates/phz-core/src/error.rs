//! Error types for the phz posterior engine.
//!
//! Organized by failure class: indexing into grids and axes, misuse of the
//! typed result store, and user-requested cancellation. [`PhzError`] is the
//! umbrella type returned by pipeline stages.

use std::error::Error;
use std::fmt;

use crate::id::SourceId;

/// Errors from axis lookups and grid addressing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexError {
    /// An axis index is outside the axis.
    OutOfRange {
        /// Name of the axis.
        axis: &'static str,
        /// The requested index.
        index: usize,
        /// Number of knots on the axis.
        len: usize,
    },
    /// A value lookup found no exactly-matching knot.
    ValueNotFound {
        /// Name of the axis (or lookup table).
        axis: &'static str,
        /// Rendered form of the value that was not found.
        value: String,
    },
    /// Two grids (or a grid and an index) do not share the same axes.
    IncompatibleAxes {
        /// Description of the mismatch.
        reason: String,
    },
    /// An axis definition violates its construction rules.
    InvalidAxis {
        /// Name of the axis.
        axis: &'static str,
        /// Description of the violated rule.
        reason: String,
    },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { axis, index, len } => {
                write!(f, "index {index} out of range for axis {axis} of length {len}")
            }
            Self::ValueNotFound { axis, value } => {
                write!(f, "value {value} not found on axis {axis}")
            }
            Self::IncompatibleAxes { reason } => write!(f, "incompatible axes: {reason}"),
            Self::InvalidAxis { axis, reason } => write!(f, "invalid axis {axis}: {reason}"),
        }
    }
}

impl Error for IndexError {}

/// Errors from the typed result store and from stateful functors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateError {
    /// `set` was called for a kind that is already present.
    AlreadySet {
        /// Name of the result kind.
        kind: &'static str,
    },
    /// `get` was called for a kind that was never set.
    NotSet {
        /// Name of the result kind.
        kind: &'static str,
    },
    /// A component was reconfigured after it started producing output.
    AlreadyStarted {
        /// Name of the component.
        what: &'static str,
    },
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySet { kind } => write!(f, "result {kind} is already set"),
            Self::NotSet { kind } => write!(f, "result {kind} is not set"),
            Self::AlreadyStarted { what } => {
                write!(f, "{what} cannot be modified after it has started")
            }
        }
    }
}

impl Error for StateError {}

/// The user requested the run to stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CancelledError;

impl fmt::Display for CancelledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stopped by the user")
    }
}

impl Error for CancelledError {}

/// Umbrella error returned by pipeline stages.
#[derive(Clone, Debug, PartialEq)]
pub enum PhzError {
    /// Grid or axis addressing failed.
    Index(IndexError),
    /// Result store or functor state misuse.
    State(StateError),
    /// The run was cancelled.
    Cancelled(CancelledError),
    /// Input data cannot be processed (e.g. an all-zero probability volume).
    InvalidInput {
        /// Description of the problem.
        reason: String,
    },
    /// A source id is not part of the declared processing order.
    UnknownSource {
        /// The offending id.
        id: SourceId,
    },
    /// A downstream output handler failed.
    Output {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for PhzError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(e) => write!(f, "index: {e}"),
            Self::State(e) => write!(f, "state: {e}"),
            Self::Cancelled(e) => write!(f, "{e}"),
            Self::InvalidInput { reason } => write!(f, "invalid input: {reason}"),
            Self::UnknownSource { id } => {
                write!(f, "source {id} is not part of the processing order")
            }
            Self::Output { reason } => write!(f, "output handler failed: {reason}"),
        }
    }
}

impl Error for PhzError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Index(e) => Some(e),
            Self::State(e) => Some(e),
            Self::Cancelled(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IndexError> for PhzError {
    fn from(e: IndexError) -> Self {
        Self::Index(e)
    }
}

impl From<StateError> for PhzError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

impl From<CancelledError> for PhzError {
    fn from(e: CancelledError) -> Self {
        Self::Cancelled(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = IndexError::OutOfRange {
            axis: "Z",
            index: 7,
            len: 3,
        };
        assert_eq!(e.to_string(), "index 7 out of range for axis Z of length 3");
        assert_eq!(
            StateError::AlreadySet { kind: "BestModel" }.to_string(),
            "result BestModel is already set"
        );
        assert_eq!(CancelledError.to_string(), "stopped by the user");
    }

    #[test]
    fn umbrella_keeps_source() {
        let e: PhzError = StateError::NotSet { kind: "PosteriorGrid" }.into();
        assert!(e.source().is_some());
        assert!(e.to_string().contains("PosteriorGrid"));

        let e = PhzError::UnknownSource { id: SourceId(9) };
        assert!(e.source().is_none());
    }

    #[test]
    fn cancelled_converts() {
        let e: PhzError = CancelledError.into();
        assert_eq!(e, PhzError::Cancelled(CancelledError));
    }
}
