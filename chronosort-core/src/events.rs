//! Stage-boundary events emitted by the pipeline

use crate::progress_tracker::ProgressTracker;
use std::sync::Mutex;
use std::time::Duration;

/// Something that happened at a pipeline stage boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The chunker produced a chunk
    ChunkCreated {
        chunk_id: usize,
        width: u32,
        height: u32,
        depth: usize,
    },
    /// The dispatcher is about to launch one worker per chunk
    DispatchStarted { chunk_count: usize },
    /// A worker picked a chunk from the work queue
    WorkerStarted { chunk_id: usize },
    /// A worker deposited its processed chunk
    WorkerFinished { chunk_id: usize, elapsed: Duration },
    /// The reassembler built the final sequence
    ReassemblyComplete { width: u32, height: u32, depth: usize },
}

/// Receives pipeline events. Called from worker threads.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

impl<F> PipelineObserver for F
where
    F: Fn(&PipelineEvent) + Send + Sync,
{
    fn on_event(&self, event: &PipelineEvent) {
        self(event)
    }
}

/// Observer that logs every event through `tracing` and reports chunk progress
#[derive(Default)]
pub struct TracingObserver {
    progress: Mutex<Option<ProgressTracker>>,
}

impl TracingObserver {
    /// Creates a new tracing observer
    pub fn new() -> Self {
        Self::default()
    }
}

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::ChunkCreated {
                chunk_id,
                width,
                height,
                depth,
            } => {
                tracing::debug!(chunk_id, width, height, depth, "chunk created");
            }
            PipelineEvent::DispatchStarted { chunk_count } => {
                tracing::info!(chunk_count, "launching workers");
                if let Ok(mut progress) = self.progress.lock() {
                    *progress = Some(ProgressTracker::new(*chunk_count as u64, "chunks"));
                }
            }
            PipelineEvent::WorkerStarted { chunk_id } => {
                tracing::debug!(chunk_id, "worker started");
            }
            PipelineEvent::WorkerFinished { chunk_id, elapsed } => {
                tracing::debug!(
                    chunk_id,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "worker finished"
                );
                if let Ok(progress) = self.progress.lock() {
                    if let Some(tracker) = progress.as_ref() {
                        tracker.increment_and_report(1);
                    }
                }
            }
            PipelineEvent::ReassemblyComplete {
                width,
                height,
                depth,
            } => {
                tracing::info!(width, height, depth, "reassembly complete");
            }
        }
    }
}
