//! The validated state shared by every worker of a run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;
use phz_core::SourceId;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{ConfigError, RunConfig};

/// A validated [`RunConfig`] plus the run's cancellation flag.
///
/// Built once at startup and passed by reference to the worker pool and the
/// dispatcher.
#[derive(Debug)]
pub struct RunContext {
    config: RunConfig,
    cancel: Arc<AtomicBool>,
}

// Compile-time assertion: RunContext must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<RunContext>();
};

impl RunContext {
    /// Validate `config` and take ownership of it.
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The run's settings.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Resolved number of worker threads.
    pub fn resolved_worker_count(&self) -> usize {
        self.config.resolved_worker_count()
    }

    /// Ask every worker and the dispatcher to stop.
    pub fn cancel(&self) {
        if !self.cancel.swap(true, Ordering::AcqRel) {
            info!("run cancelled");
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Shared handle on the cancellation flag, e.g. for a signal handler.
    pub fn cancellation(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// The sampling stream of `source`.
    ///
    /// Depends only on the run seed and the source id, never on which
    /// worker scores the source.
    pub fn source_rng(&self, source: SourceId) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        rng.set_stream(source.0);
        rng
    }
}
