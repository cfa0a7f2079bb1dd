//! Downstream consumers of finished source results.

use phz_core::{PhzError, SourceId};
use phz_model::SourceResults;

/// A sink for the result bundle of each source, e.g. a catalog writer.
///
/// Called by the [`OrderedDispatcher`](crate::OrderedDispatcher) from
/// whichever worker thread completes a contiguous run of sources, one call
/// at a time and in source order.
pub trait OutputHandler: Send {
    /// Consume the results of `id`.
    fn handle_source_output(&mut self, id: SourceId, results: &SourceResults) -> Result<(), PhzError>;
}

impl<F> OutputHandler for F
where
    F: FnMut(SourceId, &SourceResults) -> Result<(), PhzError> + Send,
{
    fn handle_source_output(&mut self, id: SourceId, results: &SourceResults) -> Result<(), PhzError> {
        self(id, results)
    }
}

/// Forwards every source to a list of handlers in registration order.
///
/// Stops at the first handler that fails.
#[derive(Default)]
pub struct MultiHandler {
    handlers: Vec<Box<dyn OutputHandler>>,
}

impl MultiHandler {
    /// A handler forwarding to nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler`.
    pub fn with(mut self, handler: impl OutputHandler + 'static) -> Self {
        self.push(Box::new(handler));
        self
    }

    /// Append an already boxed handler.
    pub fn push(&mut self, handler: Box<dyn OutputHandler>) {
        self.handlers.push(handler);
    }

    /// Number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl OutputHandler for MultiHandler {
    fn handle_source_output(&mut self, id: SourceId, results: &SourceResults) -> Result<(), PhzError> {
        for handler in &mut self.handlers {
            handler.handle_source_output(id, results)?;
        }
        Ok(())
    }
}
