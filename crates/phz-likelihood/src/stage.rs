//! Stage traits of the region posterior pipeline.

use phz_core::PhzError;
use phz_model::RegionResults;

/// A prior folded into the posterior log grid of a region.
///
/// Priors run after the likelihood has been copied into
/// `PosteriorLogGrid` and before the best posterior model is selected.
/// They modify existing entries only, through `get_mut`.
///
/// This trait is object-safe; pipelines hold `Arc<dyn Prior>`.
pub trait Prior: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Fold the prior into `results`.
    fn apply(&self, results: &RegionResults) -> Result<(), PhzError>;
}

/// A reducer storing a 1-D PDF into the region results.
pub trait Marginalization: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Compute the PDF and `set` it on `results`.
    fn marginalize(&self, results: &mut RegionResults) -> Result<(), PhzError>;
}
