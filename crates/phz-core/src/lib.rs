//! Core types shared by every phz crate.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! error taxonomy, source identifiers, the [`DeepClone`] contract and the
//! enum-keyed [`TypedEnumMap`] used to pass results between pipeline stages.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clone;
pub mod error;
pub mod id;
pub mod typed_map;

pub use clone::DeepClone;
pub use error::{CancelledError, IndexError, PhzError, StateError};
pub use id::SourceId;
pub use typed_map::{ResultKind, TypedEnumMap};
