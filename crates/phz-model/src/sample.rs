//! Points drawn from a posterior grid.

use phz_grid::QualifiedName;

/// One representative parameter point drawn by the grid sampler.
#[derive(Clone, Debug, PartialEq)]
pub struct GridSample {
    /// Position of the originating region in the source's region map.
    pub region_index: usize,
    /// Index of the SED on the region's SED axis.
    pub sed_index: usize,
    /// The SED.
    pub sed: QualifiedName,
    /// The reddening curve.
    pub reddening_curve: QualifiedName,
    /// E(B-V) coordinate.
    pub ebv: f64,
    /// Redshift coordinate.
    pub z: f64,
    /// Scale factor of the model at the drawn point.
    pub alpha: f64,
    /// Interpolated log-probability at the drawn point.
    pub log_probability: f64,
}
