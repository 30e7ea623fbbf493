//! Splitting a sequence into vertical strips

use crate::sequence::{uniform_dimensions, Chunk, Sequence};
use crate::{Error, Result};
use image::imageops;

/// Splits `sequence` into `chunk_count` vertical strips, ordered left to right.
///
/// Every strip is `width / chunk_count` pixels wide. When the width is not a
/// multiple of `chunk_count` the trailing `width % chunk_count` columns are
/// not part of any chunk and are lost on reassembly.
pub fn chunk(sequence: &Sequence, chunk_count: usize) -> Result<Vec<Chunk>> {
    if chunk_count < 1 {
        return Err(Error::invalid_input("chunk count must be at least 1"));
    }

    let (width, height) = uniform_dimensions(sequence.frames())?;
    if chunk_count > width as usize {
        return Err(Error::invalid_input(format!(
            "chunk count {} exceeds frame width {}",
            chunk_count, width
        )));
    }

    let chunk_width = width / chunk_count as u32;

    let chunks = (0..chunk_count)
        .map(|id| {
            let x = id as u32 * chunk_width;
            let frames = sequence
                .frames()
                .iter()
                .map(|frame| imageops::crop_imm(frame, x, 0, chunk_width, height).to_image())
                .collect();
            Chunk::new(id, frames)
        })
        .collect();

    Ok(chunks)
}
