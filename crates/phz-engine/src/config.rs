//! Run configuration, validation, and error types.
//!
//! [`RunConfig`] is plain data: build it, call
//! [`validate()`](RunConfig::validate), then wrap it in a
//! [`RunContext`](crate::RunContext). [`MarginalizationConfig`] turns the
//! choice of reducer and requested PDFs into the marginalization stages of
//! the region posterior pipeline.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use phz_core::{PhzError, SourceId, StateError};
use phz_grid::{Ebv, ModelParameter, ReddeningCurve, Sed, Z};
use phz_likelihood::{
    AxisCorrection, BayesianMarginalization, Marginalization, MaxMarginalization,
    SumMarginalization,
};
use phz_luminosity::{LuminosityFunctionSet, LuminosityPrior};
use phz_model::{GridType, GroupManager, PdfAxis};

// ── CollapseType ───────────────────────────────────────────────────

/// How a grid is collapsed onto one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CollapseType {
    /// Sum of the linear probabilities.
    #[default]
    Sum,
    /// Maximum of the linear probabilities.
    Max,
    /// Sum of the corrected linear probabilities.
    Bayesian,
}

// ── MarginalizationConfig ──────────────────────────────────────────

/// Which 1-D PDFs to produce and how.
///
/// The redshift PDF is always produced. Corrections registered with
/// [`add_correction`](Self::add_correction) apply to the Bayesian reducer
/// only, on top of its default E(B-V) correction.
pub struct MarginalizationConfig {
    /// Reducer for the posterior PDFs. Default: `Sum`.
    pub posterior_collapse: CollapseType,
    /// Reducer for the likelihood PDFs. Default: `Sum`.
    pub likelihood_collapse: CollapseType,
    /// Also produce likelihood PDFs. Default: false.
    pub likelihood_pdfs: bool,
    /// Produce the E(B-V) PDF. Default: false.
    pub ebv_pdf: bool,
    /// Produce the reddening curve PDF. Default: false.
    pub reddening_curve_pdf: bool,
    /// Produce the SED PDF. Default: false.
    pub sed_pdf: bool,
    corrections: Vec<(ModelParameter, Arc<dyn AxisCorrection>)>,
    built: AtomicBool,
}

impl Default for MarginalizationConfig {
    fn default() -> Self {
        Self {
            posterior_collapse: CollapseType::Sum,
            likelihood_collapse: CollapseType::Sum,
            likelihood_pdfs: false,
            ebv_pdf: false,
            reddening_curve_pdf: false,
            sed_pdf: false,
            corrections: Vec::new(),
            built: AtomicBool::new(false),
        }
    }
}

impl fmt::Debug for MarginalizationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarginalizationConfig")
            .field("posterior_collapse", &self.posterior_collapse)
            .field("likelihood_collapse", &self.likelihood_collapse)
            .field("likelihood_pdfs", &self.likelihood_pdfs)
            .field("ebv_pdf", &self.ebv_pdf)
            .field("reddening_curve_pdf", &self.reddening_curve_pdf)
            .field("sed_pdf", &self.sed_pdf)
            .field("corrections", &self.corrections.len())
            .finish()
    }
}

impl MarginalizationConfig {
    /// Register a Bayesian correction for the integration over `axis`.
    ///
    /// Fails with [`StateError::AlreadyStarted`] after [`build`](Self::build).
    pub fn add_correction(
        &mut self,
        axis: ModelParameter,
        correction: Arc<dyn AxisCorrection>,
    ) -> Result<(), StateError> {
        if self.built.load(Ordering::Acquire) {
            return Err(StateError::AlreadyStarted {
                what: "marginalization configuration",
            });
        }
        self.corrections.push((axis, correction));
        Ok(())
    }

    /// Number of registered corrections.
    pub fn correction_count(&self) -> usize {
        self.corrections.len()
    }

    /// Axes that get a PDF, in axis order.
    pub fn pdf_axes(&self) -> Vec<ModelParameter> {
        let wanted = [true, self.ebv_pdf, self.reddening_curve_pdf, self.sed_pdf];
        ModelParameter::ALL
            .into_iter()
            .zip(wanted)
            .filter_map(|(axis, on)| on.then_some(axis))
            .collect()
    }

    /// The marginalization stages: posterior PDFs first, then likelihood
    /// PDFs if requested, each in axis order.
    pub fn build(&self) -> Result<Vec<Arc<dyn Marginalization>>, StateError> {
        self.built.store(true, Ordering::Release);
        let mut stages = Vec::new();
        let mut families = vec![(GridType::Posterior, self.posterior_collapse)];
        if self.likelihood_pdfs {
            families.push((GridType::Likelihood, self.likelihood_collapse));
        }
        for (grid_type, collapse) in families {
            for axis in self.pdf_axes() {
                let stage = match axis {
                    ModelParameter::Z => self.stage::<Z>(grid_type, collapse)?,
                    ModelParameter::Ebv => self.stage::<Ebv>(grid_type, collapse)?,
                    ModelParameter::ReddeningCurve => {
                        self.stage::<ReddeningCurve>(grid_type, collapse)?
                    }
                    ModelParameter::Sed => self.stage::<Sed>(grid_type, collapse)?,
                };
                stages.push(stage);
            }
        }
        Ok(stages)
    }

    fn stage<A: PdfAxis + 'static>(
        &self,
        grid_type: GridType,
        collapse: CollapseType,
    ) -> Result<Arc<dyn Marginalization>, StateError> {
        Ok(match collapse {
            CollapseType::Sum => Arc::new(SumMarginalization::<A>::new(grid_type)),
            CollapseType::Max => Arc::new(MaxMarginalization::<A>::new(grid_type)),
            CollapseType::Bayesian => {
                let mut reducer = BayesianMarginalization::<A>::new(grid_type);
                for (axis, correction) in &self.corrections {
                    reducer.add_correction(*axis, Arc::clone(correction))?;
                }
                Arc::new(reducer)
            }
        })
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating a run.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// `sample_number` is zero.
    InvalidSampleNumber {
        /// The configured value.
        value: usize,
    },
    /// Luminosity effectiveness is outside `[0, 1]` or NaN.
    InvalidEffectiveness {
        /// The configured value.
        value: f64,
    },
    /// Scale sigma range is NaN, infinite, zero, or negative.
    InvalidSigmaRange {
        /// The configured value.
        value: f64,
    },
    /// `scale_sample_number` is zero.
    ZeroScaleSamples,
    /// A source id appears twice in a dispatcher order.
    DuplicateSource {
        /// The repeated id.
        id: SourceId,
    },
    /// A run component rejected its settings.
    Component(PhzError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSampleNumber { value } => {
                write!(f, "sample_number must be at least 1, got {value}")
            }
            Self::InvalidEffectiveness { value } => {
                write!(f, "luminosity_effectiveness must be in [0.0, 1.0], got {value}")
            }
            Self::InvalidSigmaRange { value } => {
                write!(f, "scale_sigma_range must be finite and positive, got {value}")
            }
            Self::ZeroScaleSamples => write!(f, "scale_sample_number must be at least 1"),
            Self::DuplicateSource { id } => {
                write!(f, "source {id} appears twice in the processing order")
            }
            Self::Component(e) => write!(f, "component: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Component(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PhzError> for ConfigError {
    fn from(e: PhzError) -> Self {
        Self::Component(e)
    }
}

// ── RunConfig ──────────────────────────────────────────────────────

/// Settings of one run over a catalog of sources.
#[derive(Debug)]
pub struct RunConfig {
    /// Number of worker threads. `None` = available parallelism, clamped
    /// to `[1, 64]`.
    pub worker_count: Option<usize>,
    /// Grid samples drawn per source. Default: 1000.
    pub sample_number: usize,
    /// Seed of the per-source sampling streams. Default: 0.
    pub seed: u64,
    /// Sample the scale factor instead of using its best value. Default: false.
    pub sample_scale_factor: bool,
    /// Scale samples per model when the scale factor is sampled. Default: 100.
    pub scale_sample_number: usize,
    /// Half width of the scale-sample range, in sigmas. Default: 5.0.
    pub scale_sigma_range: f64,
    /// Luminosity prior effectiveness in `[0, 1]`. Default: 1.0.
    pub luminosity_effectiveness: f64,
    /// 1-D PDF production.
    pub marginalization: MarginalizationConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            worker_count: None,
            sample_number: 1000,
            seed: 0,
            sample_scale_factor: false,
            scale_sample_number: 100,
            scale_sigma_range: 5.0,
            luminosity_effectiveness: 1.0,
            marginalization: MarginalizationConfig::default(),
        }
    }
}

impl RunConfig {
    /// Check every setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. At least one grid sample per source.
        if self.sample_number == 0 {
            return Err(ConfigError::InvalidSampleNumber {
                value: self.sample_number,
            });
        }
        // 2. Effectiveness is a blend factor.
        if !(0.0..=1.0).contains(&self.luminosity_effectiveness) {
            return Err(ConfigError::InvalidEffectiveness {
                value: self.luminosity_effectiveness,
            });
        }
        // 3. Scale sigma range is finite and positive.
        if !self.scale_sigma_range.is_finite() || self.scale_sigma_range <= 0.0 {
            return Err(ConfigError::InvalidSigmaRange {
                value: self.scale_sigma_range,
            });
        }
        // 4. At least one scale sample per model.
        if self.scale_sample_number == 0 {
            return Err(ConfigError::ZeroScaleSamples);
        }
        Ok(())
    }

    /// Resolve the actual worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 64),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, 64),
        }
    }

    /// A luminosity prior with this run's effectiveness and sigma range.
    pub fn luminosity_prior(
        &self,
        groups: GroupManager,
        functions: LuminosityFunctionSet,
        in_magnitude: bool,
    ) -> Result<LuminosityPrior, ConfigError> {
        Ok(LuminosityPrior::new(groups, functions, in_magnitude)
            .with_effectiveness(self.luminosity_effectiveness)?
            .with_scale_sigma_range(self.scale_sigma_range)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phz_likelihood::NumericalAxisCorrection;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.sample_number, 1000);
        assert_eq!(config.scale_sample_number, 100);
        assert_eq!(config.scale_sigma_range, 5.0);
    }

    #[test]
    fn validation_steps() {
        let config = RunConfig {
            sample_number: 0,
            ..RunConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSampleNumber { value: 0 }));

        let config = RunConfig {
            luminosity_effectiveness: 1.5,
            ..RunConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidEffectiveness { value: 1.5 }));

        let config = RunConfig {
            luminosity_effectiveness: f64::NAN,
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidEffectiveness { .. })));

        for bad in [0.0, -1.0, f64::INFINITY] {
            let config = RunConfig {
                scale_sigma_range: bad,
                ..RunConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::InvalidSigmaRange { .. })));
        }

        let config = RunConfig {
            scale_sample_number: 0,
            ..RunConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroScaleSamples));
    }

    #[test]
    fn worker_count_is_clamped() {
        let mut config = RunConfig {
            worker_count: Some(0),
            ..RunConfig::default()
        };
        assert_eq!(config.resolved_worker_count(), 1);
        config.worker_count = Some(1000);
        assert_eq!(config.resolved_worker_count(), 64);
        config.worker_count = Some(8);
        assert_eq!(config.resolved_worker_count(), 8);
        config.worker_count = None;
        assert!((1..=64).contains(&config.resolved_worker_count()));
    }

    #[test]
    fn redshift_pdf_always_built() {
        let config = MarginalizationConfig::default();
        assert_eq!(config.pdf_axes(), vec![ModelParameter::Z]);
        assert_eq!(config.build().unwrap().len(), 1);
    }

    #[test]
    fn requested_pdfs_per_family() {
        let config = MarginalizationConfig {
            posterior_collapse: CollapseType::Max,
            likelihood_collapse: CollapseType::Bayesian,
            likelihood_pdfs: true,
            ebv_pdf: true,
            sed_pdf: true,
            ..MarginalizationConfig::default()
        };
        assert_eq!(
            config.pdf_axes(),
            vec![ModelParameter::Z, ModelParameter::Ebv, ModelParameter::Sed]
        );
        let stages = config.build().unwrap();
        assert_eq!(stages.len(), 6);
        assert_eq!(stages[0].name(), "max");
        assert_eq!(stages[5].name(), "bayesian");
    }

    #[test]
    fn corrections_close_after_build() {
        let mut config = MarginalizationConfig {
            posterior_collapse: CollapseType::Bayesian,
            ..MarginalizationConfig::default()
        };
        config
            .add_correction(ModelParameter::Z, Arc::new(NumericalAxisCorrection::<Z>::new()))
            .unwrap();
        assert_eq!(config.correction_count(), 1);
        config.build().unwrap();
        let err = config
            .add_correction(ModelParameter::Z, Arc::new(NumericalAxisCorrection::<Z>::new()))
            .unwrap_err();
        assert!(matches!(err, StateError::AlreadyStarted { .. }));
        assert_eq!(config.correction_count(), 1);
    }

    #[test]
    fn luminosity_prior_takes_run_settings() {
        let config = RunConfig {
            luminosity_effectiveness: 0.5,
            ..RunConfig::default()
        };
        let groups = GroupManager::new(Vec::<(String, Vec<phz_grid::QualifiedName>)>::new()).unwrap();
        assert!(config
            .luminosity_prior(groups.clone(), LuminosityFunctionSet::new(), true)
            .is_ok());
        let config = RunConfig {
            luminosity_effectiveness: 2.0,
            ..RunConfig::default()
        };
        let err = config
            .luminosity_prior(groups, LuminosityFunctionSet::new(), true)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Component(PhzError::InvalidInput { .. })));
    }

    #[test]
    fn error_display() {
        let e = ConfigError::DuplicateSource { id: SourceId(3) };
        assert!(e.to_string().contains("appears twice"));
        assert!(e.source().is_none());
        let e = ConfigError::from(PhzError::InvalidInput { reason: "x".into() });
        assert!(e.source().is_some());
    }
}
