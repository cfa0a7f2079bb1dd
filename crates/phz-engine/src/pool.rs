//! Worker pool scoring sources in parallel.

use std::sync::{Mutex, PoisonError};
use std::thread;

use log::info;
use phz_core::{CancelledError, PhzError, SourceId};
use phz_model::SourceResults;

use crate::context::RunContext;
use crate::dispatch::OrderedDispatcher;

/// Score every source of `sources` and hand the results to `dispatcher`.
///
/// `ctx.resolved_worker_count()` threads pull ids from a shared queue,
/// call `compute` and submit its result. The first failure cancels the run
/// and is returned once every worker has stopped; a run cancelled from
/// outside returns [`PhzError::Cancelled`]. Returns the number of sources
/// submitted.
pub fn run_sources<I, F>(
    ctx: &RunContext,
    sources: I,
    compute: F,
    dispatcher: &OrderedDispatcher,
) -> Result<usize, PhzError>
where
    I: IntoIterator<Item = SourceId>,
    F: Fn(SourceId) -> Result<SourceResults, PhzError> + Sync,
{
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut total = 0usize;
    for id in sources {
        // The receiver is alive until the end of this function.
        let _ = tx.send(id);
        total += 1;
    }
    drop(tx);

    let workers = ctx.resolved_worker_count().min(total.max(1));
    info!("scoring {total} sources on {workers} workers");

    let first_error: Mutex<Option<PhzError>> = Mutex::new(None);
    let done = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|i| {
                let rx = rx.clone();
                let compute = &compute;
                let first_error = &first_error;
                thread::Builder::new()
                    .name(format!("phz-worker-{i}"))
                    .spawn_scoped(s, move || {
                        let mut done = 0usize;
                        while let Ok(id) = rx.recv() {
                            if ctx.is_cancelled() {
                                break;
                            }
                            let outcome = compute(id)
                                .and_then(|results| dispatcher.handle_source_output(id, &results));
                            match outcome {
                                Ok(()) => done += 1,
                                Err(e) => {
                                    let mut slot =
                                        first_error.lock().unwrap_or_else(PoisonError::into_inner);
                                    if slot.is_none() && !ctx.is_cancelled() {
                                        *slot = Some(e);
                                    }
                                    ctx.cancel();
                                    break;
                                }
                            }
                        }
                        done
                    })
                    .expect("failed to spawn phz worker")
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .sum::<usize>()
    });

    if let Some(e) = first_error.into_inner().unwrap_or_else(PoisonError::into_inner) {
        return Err(e);
    }
    if ctx.is_cancelled() {
        return Err(CancelledError.into());
    }
    info!("scored {done} sources, {} flushed", dispatcher.flushed());
    Ok(done)
}
