//! Decoding animated image containers into frame sequences

use crate::{Error, Result};
use chronosort_core::Sequence;
use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, DynamicImage, Frame, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Loads every frame of the image at `path` as RGBA8
pub fn load(path: impl AsRef<Path>) -> Result<Sequence> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let sequence = decode(&bytes)?;

    tracing::info!(
        path = %path.display(),
        width = sequence.width(),
        height = sequence.height(),
        frames = sequence.depth(),
        "loaded sequence"
    );

    Ok(sequence)
}

/// Decodes an in-memory image into a sequence.
///
/// GIF, APNG and animated WebP yield one frame per animation frame, each
/// composited onto the full canvas. Any other format the `image` crate can
/// read yields a single frame.
pub fn decode(bytes: &[u8]) -> Result<Sequence> {
    let format = image::guess_format(bytes)?;

    let frames = match format {
        ImageFormat::Gif => collect_frames(GifDecoder::new(Cursor::new(bytes))?)?,
        ImageFormat::Png => {
            let decoder = PngDecoder::new(Cursor::new(bytes))?;
            if decoder.is_apng()? {
                collect_frames(decoder.apng()?)?
            } else {
                vec![DynamicImage::from_decoder(decoder)?.to_rgba8()]
            }
        }
        ImageFormat::WebP => {
            let decoder = WebPDecoder::new(Cursor::new(bytes))?;
            if decoder.has_animation() {
                collect_frames(decoder)?
            } else {
                vec![DynamicImage::from_decoder(decoder)?.to_rgba8()]
            }
        }
        other => vec![image::load_from_memory_with_format(bytes, other)?.to_rgba8()],
    };

    tracing::debug!(?format, frames = frames.len(), "decoded frames");

    Sequence::new(frames).map_err(|e| Error::Decode(e.to_string()))
}

fn collect_frames<'a>(decoder: impl AnimationDecoder<'a>) -> Result<Vec<RgbaImage>> {
    let frames = decoder.into_frames().collect_frames()?;
    Ok(frames.into_iter().map(Frame::into_buffer).collect())
}
