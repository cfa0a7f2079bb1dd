//! Ordered hand-off of source results from many workers to one handler.
//!
//! Every source id of the run is declared up front, in output order. Each
//! id moves through `Pending -> Buffered -> Flushed`:
//!
//! 1. a worker submits the results of an id; they are deep-copied and
//!    stored in the id's slot under the short-held buffer lock
//! 2. still under that lock, the longest run of buffered slots starting at
//!    the next expected id is moved, in order, onto the ready queue
//! 3. with the buffer lock released, the worker takes the handler lock and
//!    drains the ready queue into the handler
//!
//! Items enter the ready queue only under the buffer lock, so queue order
//! is output order; every worker that enqueued something drains the queue
//! afterwards, so nothing stays queued once all submissions return.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexSet;
use log::{debug, info, warn};
use phz_core::{CancelledError, DeepClone, PhzError, SourceId};
use phz_model::SourceResults;

use crate::config::ConfigError;
use crate::context::RunContext;
use crate::handler::OutputHandler;

enum Slot {
    Pending,
    Buffered(SourceResults),
    Flushed,
}

struct Buffer {
    slots: Vec<Slot>,
    next: usize,
}

/// Forwards source results to one [`OutputHandler`] in a fixed order,
/// whatever order they are submitted in.
///
/// A slot that is never filled holds back every later source indefinitely.
pub struct OrderedDispatcher {
    order: IndexSet<SourceId>,
    cancel: Arc<AtomicBool>,
    buffer: Mutex<Buffer>,
    ready_tx: Sender<(SourceId, SourceResults)>,
    ready_rx: Receiver<(SourceId, SourceResults)>,
    handler: Mutex<Box<dyn OutputHandler>>,
    flushed: AtomicUsize,
}

// Compile-time assertion: OrderedDispatcher must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<OrderedDispatcher>();
};

impl OrderedDispatcher {
    /// Dispatcher for the sources of `order`, observing the cancellation
    /// flag of `ctx`.
    ///
    /// Fails if an id appears twice.
    pub fn new(
        ctx: &RunContext,
        order: impl IntoIterator<Item = SourceId>,
        handler: impl OutputHandler + 'static,
    ) -> Result<Self, ConfigError> {
        let mut ids = IndexSet::new();
        for id in order {
            if !ids.insert(id) {
                return Err(ConfigError::DuplicateSource { id });
            }
        }
        let slots = (0..ids.len()).map(|_| Slot::Pending).collect();
        let (ready_tx, ready_rx) = crossbeam_channel::unbounded();
        Ok(Self {
            order: ids,
            cancel: ctx.cancellation(),
            buffer: Mutex::new(Buffer { slots, next: 0 }),
            ready_tx,
            ready_rx,
            handler: Mutex::new(Box::new(handler)),
            flushed: AtomicUsize::new(0),
        })
    }

    /// Submit the results of `id`. Callable from any number of threads.
    ///
    /// `results` is deep-copied before this returns. Fails with
    /// [`PhzError::Cancelled`] once the run is cancelled, with
    /// [`PhzError::UnknownSource`] for an undeclared id, and with the first
    /// handler error if forwarding fails. A failing item is not retried and
    /// the items queued behind it are still forwarded. Results buffered
    /// before a cancellation stay unflushed.
    pub fn handle_source_output(&self, id: SourceId, results: &SourceResults) -> Result<(), PhzError> {
        // 1. Cancellation.
        if self.cancel.load(Ordering::Acquire) {
            info!("source {id} dropped: run cancelled");
            return Err(CancelledError.into());
        }
        let index = self
            .order
            .get_index_of(&id)
            .ok_or(PhzError::UnknownSource { id })?;

        // 2. Private copy, outside any lock.
        let copy = results.deep_clone();

        // 3. Buffer and collect the ready prefix.
        {
            let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            if !matches!(buffer.slots[index], Slot::Pending) {
                return Err(PhzError::InvalidInput {
                    reason: format!("source {id} was submitted twice"),
                });
            }
            buffer.slots[index] = Slot::Buffered(copy);
            let first = buffer.next;
            while let Some(Slot::Buffered(_)) = buffer.slots.get(buffer.next) {
                let next = buffer.next;
                if let Slot::Buffered(ready) = std::mem::replace(&mut buffer.slots[next], Slot::Flushed) {
                    // The receiver lives in `self`, so the queue is never disconnected.
                    let _ = self.ready_tx.send((self.order[next], ready));
                }
                buffer.next += 1;
            }
            if buffer.next > first {
                debug!("sources {first}..{} ready for output", buffer.next);
            }
        }

        // 4. Forward everything queued so far, even past a failing item.
        let mut handler = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        let mut first_error = None;
        while let Ok((ready_id, ready)) = self.ready_rx.try_recv() {
            let outcome = handler.handle_source_output(ready_id, &ready);
            self.flushed.fetch_add(1, Ordering::AcqRel);
            if let Err(e) = outcome {
                warn!("output handler failed on source {ready_id}: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Number of sources handed to the handler, failed ones included.
    pub fn flushed(&self) -> usize {
        self.flushed.load(Ordering::Acquire)
    }

    /// Number of declared sources not yet forwarded.
    pub fn pending(&self) -> usize {
        self.order.len() - self.flushed()
    }

    /// Number of declared sources.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no source is declared.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
