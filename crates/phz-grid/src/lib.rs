//! Model-parameter axes and the dense four-axis grid.
//!
//! A photometric-redshift model grid is indexed by four ordered axes:
//! redshift ([`Z`]), dust reddening amount ([`Ebv`]), reddening law
//! ([`ReddeningCurve`]) and spectral template ([`Sed`]). An [`AxesTuple`]
//! fixes the knots of all four; every [`Grid`] built from the same tuple is
//! index-compatible with every other, whatever its cell type.
//!
//! Iteration walks cells with the redshift index varying fastest.
//! [`Slice`] and [`SliceMut`] restrict a walk to a hyperslice by holding
//! one or more axes fixed, without copying.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod axis;
pub mod grid;
pub mod pdf;
pub mod slice;

pub use axis::{Axis, AxesTuple, Ebv, ModelParameter, QualifiedName, ReddeningCurve, Sed, Z};
pub use grid::{CellIndex, DoubleGrid, DoubleListGrid, Grid};
pub use pdf::Pdf1D;
pub use slice::{Slice, SliceIter, SliceIterMut, SliceMut};
