//! Animated GIF encoding

use crate::{Error, Result};
use chronosort_core::Sequence;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use std::path::Path;

/// NeuQuant sampling speed (1 = best quality, 30 = fastest)
const QUANTIZER_SPEED: i32 = 10;

/// Encodes `sequence` as a looping GIF and writes it to `path`.
///
/// The whole file is encoded in memory first; nothing is written if encoding
/// fails.
pub fn write(
    path: impl AsRef<Path>,
    sequence: &Sequence,
    frame_delay_seconds: f64,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode(sequence, frame_delay_seconds)?;
    std::fs::write(path, &bytes)?;

    tracing::info!(
        path = %path.display(),
        frames = sequence.depth(),
        bytes = bytes.len(),
        "wrote sequence"
    );

    Ok(())
}

/// Encodes `sequence` as a looping GIF with a constant per-frame delay
pub fn encode(sequence: &Sequence, frame_delay_seconds: f64) -> Result<Vec<u8>> {
    let delay = frame_delay(frame_delay_seconds)?;

    let mut buffer = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut buffer, QUANTIZER_SPEED);
        encoder.set_repeat(Repeat::Infinite)?;
        encoder.encode_frames(
            sequence
                .frames()
                .iter()
                .map(|frame| Frame::from_parts(frame.clone(), 0, 0, delay)),
        )?;
    }

    Ok(buffer)
}

fn frame_delay(seconds: f64) -> Result<Delay> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(Error::Encode(format!(
            "frame delay must be a non-negative number of seconds, got {seconds}"
        )));
    }
    let millis = (seconds * 1000.0).round().min(u32::MAX as f64) as u32;
    Ok(Delay::from_numer_denom_ms(millis, 1))
}
