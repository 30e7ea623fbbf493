//! chronosort Encoder Library
//!
//! This library writes frame sequences out as looping animated GIFs.

pub mod sequence_writer;

pub use sequence_writer::{encode, write};

/// Result type for chronosort-encoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for chronosort-encoder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Encode error: {0}")]
    Encode(String),
}
