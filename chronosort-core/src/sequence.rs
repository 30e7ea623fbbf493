//! Frame, sequence and chunk data structures

use crate::{Error, Result};
use image::RgbaImage;

/// A single still image of RGBA8 pixels
pub type Frame = RgbaImage;

/// Ordered frames sharing one width and height; the index is the time step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    frames: Vec<Frame>,
    width: u32,
    height: u32,
}

impl Sequence {
    /// Creates a sequence, rejecting empty or non-uniform frame lists
    pub fn new(frames: Vec<Frame>) -> Result<Self> {
        let (width, height) = uniform_dimensions(&frames)?;
        Ok(Self {
            frames,
            width,
            height,
        })
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of frames (time steps)
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns the frames in time order
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Consumes the sequence and returns its frames
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

/// A vertical strip of a sequence across every time step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the strip, counted left to right from 0
    pub id: usize,
    /// Cropped frames in time order
    pub frames: Vec<Frame>,
}

impl Chunk {
    /// Creates a new chunk
    pub fn new(id: usize, frames: Vec<Frame>) -> Self {
        Self { id, frames }
    }

    /// Returns the number of frames in the chunk
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// A chunk whose frames were rewritten by the column transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedChunk {
    /// Id of the chunk this was produced from
    pub id: usize,
    /// Rewritten frames in time order
    pub frames: Vec<Frame>,
}

impl ProcessedChunk {
    /// Creates a new processed chunk
    pub fn new(id: usize, frames: Vec<Frame>) -> Self {
        Self { id, frames }
    }

    /// Returns the number of frames in the chunk
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Returns the shared `(width, height)` of `frames`.
///
/// Fails if there are no frames or if any frame differs from the first.
pub(crate) fn uniform_dimensions(frames: &[Frame]) -> Result<(u32, u32)> {
    let first = frames
        .first()
        .ok_or_else(|| Error::invalid_input("sequence has no frames"))?;
    let dimensions = first.dimensions();

    for (index, frame) in frames.iter().enumerate().skip(1) {
        if frame.dimensions() != dimensions {
            return Err(Error::invalid_input(format!(
                "frame {} is {}x{}, expected {}x{}",
                index,
                frame.width(),
                frame.height(),
                dimensions.0,
                dimensions.1
            )));
        }
    }

    Ok(dimensions)
}
