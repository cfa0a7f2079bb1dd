//! Representative samples drawn from posterior grids.
//!
//! The continuous axes (redshift, E(B-V) and, when the scale factor is
//! sampled, the scale-sample index) are integrated with the trapezoid rule
//! over the hyper-cells between consecutive knots; the categorical axes are
//! enumerated. [`GridSampler`] picks a region by its total volume, a
//! hyper-cell by its volume, a reddening curve and SED by their share of
//! that cell, and finally a position inside the cell.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod sampler;
pub mod volume;

pub use sampler::GridSampler;
pub use volume::{enclosing_volume, scaled_enclosing_volume};
