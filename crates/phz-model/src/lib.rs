//! Data model shared by the phz pipeline stages.
//!
//! - [`region`]: result kinds of one parameter-space region ([`RegionResults`])
//! - [`source`]: result kinds of one source ([`SourceResults`])
//! - [`GridType`]: selects the likelihood or posterior family of kinds
//! - [`GridSample`]: one point drawn by the grid sampler
//! - [`GroupManager`]: partition of SEDs into named groups

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod group;
pub mod grid_type;
pub mod region;
pub mod sample;
pub mod source;

pub use group::GroupManager;
pub use grid_type::{GridType, PdfAxis};
pub use region::{RegionResultType, RegionResults};
pub use sample::GridSample;
pub use source::{SourceResultType, SourceResults};
