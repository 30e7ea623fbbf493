//! Per-chunk temporal sort
//!
//! For every pixel location of a chunk the values across all frames form a
//! pixel column. Each column is sorted and written back so that output frame
//! `n` holds the `n`-th smallest value of every column.

use crate::sequence::{uniform_dimensions, Chunk, ProcessedChunk};
use crate::Result;
use image::{Rgba, RgbaImage};
use std::fmt;
use std::str::FromStr;

/// Ordering applied to each pixel column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Compare the `(r, g, b, a)` tuple lexicographically
    #[default]
    Lexicographic,
    /// Compare Rec. 601 luma; pixels of equal luma keep their time order
    Luminance,
}

impl SortKey {
    fn sort(self, column: &mut [Rgba<u8>]) {
        // Both arms use the stable sort so equal keys keep their time order.
        match self {
            SortKey::Lexicographic => column.sort_by_key(|pixel| pixel.0),
            SortKey::Luminance => column.sort_by_key(luminance),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Lexicographic => f.write_str("lexicographic"),
            SortKey::Luminance => f.write_str("luminance"),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lexicographic" | "rgba" => Ok(SortKey::Lexicographic),
            "luminance" | "luma" => Ok(SortKey::Luminance),
            other => Err(format!(
                "unknown sort key '{other}', expected 'lexicographic' or 'luminance'"
            )),
        }
    }
}

/// Integer Rec. 601 luma, scaled by 1000
fn luminance(pixel: &Rgba<u8>) -> u32 {
    let [r, g, b, _] = pixel.0;
    299 * r as u32 + 587 * g as u32 + 114 * b as u32
}

/// Temporally sorts `chunk` with the default lexicographic ordering
pub fn transform(chunk: Chunk) -> Result<ProcessedChunk> {
    transform_with(chunk, SortKey::default())
}

/// Temporally sorts every pixel column of `chunk` using `key`.
///
/// Fails with [`crate::Error::InvalidInput`] if the chunk has no frames or
/// its frames differ in size.
pub fn transform_with(chunk: Chunk, key: SortKey) -> Result<ProcessedChunk> {
    let (width, height) = uniform_dimensions(&chunk.frames)?;
    let depth = chunk.depth();

    // Columns are indexed row-major, matching `ImageBuffer::pixels`.
    let mut columns: Vec<Vec<Rgba<u8>>> = (0..width as usize * height as usize)
        .map(|_| Vec::with_capacity(depth))
        .collect();

    for frame in chunk.frames {
        for (column, pixel) in columns.iter_mut().zip(frame.pixels()) {
            column.push(*pixel);
        }
    }

    for column in &mut columns {
        key.sort(column);
    }

    let frames = (0..depth)
        .map(|n| {
            let mut frame = RgbaImage::new(width, height);
            for (pixel, column) in frame.pixels_mut().zip(&columns) {
                *pixel = column[n];
            }
            frame
        })
        .collect();

    Ok(ProcessedChunk::new(chunk.id, frames))
}
