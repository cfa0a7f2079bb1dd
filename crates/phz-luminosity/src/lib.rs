//! Luminosity functions and the luminosity prior.
//!
//! The prior reweights every model of a region by the luminosity function
//! of its SED group at its redshift, evaluated at the model's scale factor
//! (or the absolute magnitude derived from it).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod domain;
pub mod function;
pub mod prior;

pub use domain::{LuminosityFunctionSet, ValidityDomain};
pub use function::{LuminosityFunction, SchechterFunction, TabulatedFunction};
pub use prior::{
    apply_effectiveness, apply_prior, apply_sample_effectiveness, apply_sample_prior,
    luminosity_in_sample, mag_from_flux, LuminosityPrior,
};
