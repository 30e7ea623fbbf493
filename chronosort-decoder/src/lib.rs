//! chronosort Decoder Library
//!
//! This library loads animated image files (GIF, APNG, animated WebP) into a
//! frame sequence. Still images load as a single-frame sequence.

pub mod sequence_loader;

pub use sequence_loader::{decode, load};

/// Result type for chronosort-decoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for chronosort-decoder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Decode error: {0}")]
    Decode(String),
}
