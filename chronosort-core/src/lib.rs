//! chronosort Core Library
//!
//! This library provides the frame/sequence data model and the chunked
//! parallel pipeline that temporally sorts every pixel of an animated image:
//! each pixel's values across time are sorted and written back frame by frame.

pub mod chunker;
pub mod dispatcher;
pub mod events;
pub mod pipeline;
pub mod progress_tracker;
pub mod reassembler;
pub mod sequence;
pub mod transform;

pub use chunker::chunk;
pub use dispatcher::Dispatcher;
pub use events::{PipelineEvent, PipelineObserver, TracingObserver};
pub use pipeline::{Pipeline, PipelineConfig};
pub use reassembler::reassemble;
pub use sequence::{Chunk, ProcessedChunk, Sequence};
pub use transform::{transform, transform_with, SortKey};

/// Result type for chronosort-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for chronosort-core operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Worker failure: {0}")]
    WorkerFailure(String),
}

impl Error {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
