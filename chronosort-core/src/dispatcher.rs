//! Fan-out of chunks to worker threads and fan-in of their results
//!
//! Every chunk gets its own worker. Workers pull chunks from a shared work
//! queue, so each chunk is delivered to exactly one worker, and push their
//! results to a shared result queue. Results arrive in whatever order the
//! workers finish; the dispatcher sorts them by chunk id before returning.

use crate::events::{PipelineEvent, PipelineObserver, TracingObserver};
use crate::sequence::{Chunk, ProcessedChunk};
use crate::transform::{transform_with, SortKey};
use crate::{Error, Result};
use crossbeam::channel::{self, Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Runs the column transform over a set of chunks, one worker thread per chunk
#[derive(Clone)]
pub struct Dispatcher {
    sort_key: SortKey,
    reverse: bool,
    observer: Arc<dyn PipelineObserver>,
}

impl Dispatcher {
    /// Creates a dispatcher that logs its progress through `tracing`
    pub fn new(sort_key: SortKey, reverse: bool) -> Self {
        Self {
            sort_key,
            reverse,
            observer: Arc::new(TracingObserver::new()),
        }
    }

    /// Replaces the observer that receives worker events
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Transforms every chunk in parallel.
    ///
    /// Returns the processed chunks ordered by ascending id, or descending id
    /// when the dispatcher was created with `reverse`. The first worker error
    /// fails the whole run; remaining workers skip their chunk and every
    /// thread is joined before returning.
    pub fn run(&self, chunks: Vec<Chunk>) -> Result<Vec<ProcessedChunk>> {
        let expected = chunks.len();
        self.observer
            .on_event(&PipelineEvent::DispatchStarted { chunk_count: expected });

        let (work_tx, work_rx) = channel::unbounded::<Chunk>();
        for chunk in chunks {
            work_tx.send(chunk).map_err(|e| {
                Error::WorkerFailure(format!("work queue closed before chunk {}", e.0.id))
            })?;
        }
        drop(work_tx);

        let (result_tx, result_rx) = channel::unbounded::<Result<ProcessedChunk>>();
        let cancelled = AtomicBool::new(false);
        let cancelled = &cancelled;
        let observer: &dyn PipelineObserver = self.observer.as_ref();
        let sort_key = self.sort_key;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(expected);
            let mut spawned = Ok(());

            for index in 0..expected {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let spawn = thread::Builder::new()
                    .name(format!("chunk-worker-{index}"))
                    .spawn_scoped(scope, move || {
                        work(work_rx, result_tx, sort_key, observer, cancelled)
                    });

                match spawn {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        spawned = Err(Error::WorkerFailure(format!(
                            "failed to spawn worker {index}: {e}"
                        )));
                        break;
                    }
                }
            }

            // Only workers hold senders now, so a vanished worker shows up as
            // a disconnected result queue instead of a hang.
            drop(result_tx);
            drop(work_rx);

            let mut outcome =
                spawned.and_then(|()| collect_results(&result_rx, expected, self.reverse));
            if outcome.is_err() {
                cancelled.store(true, Ordering::SeqCst);
            }

            for handle in handles {
                if let Err(payload) = handle.join() {
                    if outcome.is_ok() {
                        outcome = Err(Error::WorkerFailure(panic_reason(&*payload)));
                    }
                }
            }

            outcome
        })
    }
}

/// Body of one worker: takes a single chunk, transforms it and deposits the result
fn work(
    work_rx: Receiver<Chunk>,
    result_tx: Sender<Result<ProcessedChunk>>,
    sort_key: SortKey,
    observer: &dyn PipelineObserver,
    cancelled: &AtomicBool,
) {
    let Ok(chunk) = work_rx.recv() else {
        return;
    };
    if cancelled.load(Ordering::SeqCst) {
        return;
    }

    let chunk_id = chunk.id;
    observer.on_event(&PipelineEvent::WorkerStarted { chunk_id });
    let started = Instant::now();

    let result = panic::catch_unwind(AssertUnwindSafe(|| transform_with(chunk, sort_key)))
        .unwrap_or_else(|payload| {
            Err(Error::WorkerFailure(format!(
                "chunk {chunk_id}: {}",
                panic_reason(&*payload)
            )))
        });

    if result.is_ok() {
        observer.on_event(&PipelineEvent::WorkerFinished {
            chunk_id,
            elapsed: started.elapsed(),
        });
    }

    // The receiver is gone once another worker has failed the run.
    let _ = result_tx.send(result);
}

/// Blocks until `expected` results arrived, then orders them by chunk id.
///
/// Fails with the first error deposited by a worker, or with
/// [`Error::WorkerFailure`] if every sender disconnects early.
pub fn collect_results(
    result_rx: &Receiver<Result<ProcessedChunk>>,
    expected: usize,
    reverse: bool,
) -> Result<Vec<ProcessedChunk>> {
    let mut processed = Vec::with_capacity(expected);

    while processed.len() < expected {
        match result_rx.recv() {
            Ok(Ok(chunk)) => processed.push(chunk),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(Error::WorkerFailure(format!(
                    "workers exited after delivering {} of {} chunks",
                    processed.len(),
                    expected
                )))
            }
        }
    }

    processed.sort_by_key(|chunk| chunk.id);
    if reverse {
        processed.reverse();
    }
    Ok(processed)
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("worker panicked: {message}")
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;

    fn chunk_with(id: usize, depth: u32) -> Chunk {
        let frames = (0..depth)
            .map(|t| {
                RgbaImage::from_fn(2, 2, |x, y| {
                    Rgba([((t * 7 + x + y + id as u32) % 5) as u8, t as u8, id as u8, 255])
                })
            })
            .collect();
        Chunk::new(id, frames)
    }

    #[test]
    fn test_results_ordered_by_id() {
        let chunks: Vec<_> = (0..6).map(|id| chunk_with(id, 4)).collect();
        let processed = Dispatcher::new(SortKey::Lexicographic, false)
            .run(chunks)
            .unwrap();

        let ids: Vec<_> = processed.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_reverse_orders_descending() {
        let chunks: Vec<_> = (0..4).map(|id| chunk_with(id, 2)).collect();
        let processed = Dispatcher::new(SortKey::Lexicographic, true)
            .run(chunks)
            .unwrap();

        let ids: Vec<_> = processed.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_matches_sequential_transform() {
        let chunks: Vec<_> = (0..5).map(|id| chunk_with(id, 6)).collect();
        let expected: Vec<_> = chunks
            .iter()
            .cloned()
            .map(|c| transform_with(c, SortKey::Lexicographic).unwrap())
            .collect();

        let processed = Dispatcher::new(SortKey::Lexicographic, false)
            .run(chunks)
            .unwrap();

        assert_eq!(processed, expected);
    }

    #[test]
    fn test_collection_order_does_not_matter() {
        let processed: Vec<_> = (0..5)
            .map(|id| transform_with(chunk_with(id, 3), SortKey::Lexicographic).unwrap())
            .collect();

        for permutation in [[4, 2, 0, 3, 1], [0, 1, 2, 3, 4], [1, 3, 4, 0, 2]] {
            let (tx, rx) = channel::unbounded();
            for index in permutation {
                tx.send(Ok(processed[index].clone())).unwrap();
            }
            drop(tx);

            assert_eq!(collect_results(&rx, 5, false).unwrap(), processed);
        }
    }

    #[test]
    fn test_collection_fails_on_worker_error() {
        let (tx, rx) = channel::unbounded();
        tx.send(Ok(ProcessedChunk::new(0, Vec::new()))).unwrap();
        tx.send(Err(Error::InvalidInput("bad chunk".to_string())))
            .unwrap();
        tx.send(Ok(ProcessedChunk::new(2, Vec::new()))).unwrap();

        let err = collect_results(&rx, 3, false).unwrap_err();
        assert_eq!(err, Error::InvalidInput("bad chunk".to_string()));
    }

    #[test]
    fn test_collection_fails_when_workers_vanish() {
        let (tx, rx) = channel::unbounded();
        tx.send(Ok(ProcessedChunk::new(0, Vec::new()))).unwrap();
        drop(tx);

        let err = collect_results(&rx, 2, false).unwrap_err();
        assert!(matches!(err, Error::WorkerFailure(_)));
    }

    #[test]
    fn test_invalid_chunk_fails_run() {
        let mut chunks: Vec<_> = (0..4).map(|id| chunk_with(id, 3)).collect();
        chunks[2].frames.push(RgbaImage::new(3, 3));

        let err = Dispatcher::new(SortKey::Lexicographic, false)
            .run(chunks)
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_observer_sees_every_worker() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let observer = move |event: &PipelineEvent| sink.lock().unwrap().push(event.clone());

        let chunks: Vec<_> = (0..3).map(|id| chunk_with(id, 2)).collect();
        Dispatcher::new(SortKey::Lexicographic, false)
            .with_observer(Arc::new(observer))
            .run(chunks)
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events[0], PipelineEvent::DispatchStarted { chunk_count: 3 });

        let mut started: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::WorkerStarted { chunk_id } => Some(*chunk_id),
                _ => None,
            })
            .collect();
        started.sort_unstable();
        assert_eq!(started, vec![0, 1, 2]);

        let finished = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::WorkerFinished { .. }))
            .count();
        assert_eq!(finished, 3);
    }

    #[test]
    fn test_no_chunks_yields_nothing() {
        let processed = Dispatcher::new(SortKey::Lexicographic, false)
            .run(Vec::new())
            .unwrap();
        assert!(processed.is_empty());
    }
}
