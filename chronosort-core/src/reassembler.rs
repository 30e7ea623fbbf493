//! Stitching processed chunks back into full frames

use crate::sequence::{uniform_dimensions, ProcessedChunk, Sequence};
use crate::{Error, Result};
use image::{imageops, RgbaImage};

/// Places the chunks side by side, left to right in the given order.
///
/// Output frames are `chunk_width * chunks.len()` wide and as tall as the
/// chunk frames; output frame `n` is built from frame `n` of every chunk.
pub fn reassemble(chunks: &[ProcessedChunk]) -> Result<Sequence> {
    let first = chunks
        .first()
        .ok_or_else(|| Error::invalid_input("no processed chunks to reassemble"))?;
    let (chunk_width, chunk_height) = uniform_dimensions(&first.frames)?;
    let depth = first.depth();

    for chunk in &chunks[1..] {
        if chunk.depth() != depth {
            return Err(Error::invalid_input(format!(
                "chunk {} has {} frames, expected {}",
                chunk.id,
                chunk.depth(),
                depth
            )));
        }
        let dimensions = uniform_dimensions(&chunk.frames)?;
        if dimensions != (chunk_width, chunk_height) {
            return Err(Error::invalid_input(format!(
                "chunk {} is {}x{}, expected {}x{}",
                chunk.id, dimensions.0, dimensions.1, chunk_width, chunk_height
            )));
        }
    }

    let final_width = chunk_width
        .checked_mul(chunks.len() as u32)
        .ok_or_else(|| Error::invalid_input("reassembled frame width overflows"))?;

    let frames = (0..depth)
        .map(|n| {
            let mut frame = RgbaImage::new(final_width, chunk_height);
            for (k, chunk) in chunks.iter().enumerate() {
                let x = k as i64 * chunk_width as i64;
                imageops::replace(&mut frame, &chunk.frames[n], x, 0);
            }
            frame
        })
        .collect();

    Sequence::new(frames)
}
