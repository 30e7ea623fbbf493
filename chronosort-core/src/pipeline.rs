//! End-to-end temporal sort: chunk, dispatch, reassemble

use crate::chunker::chunk;
use crate::dispatcher::Dispatcher;
use crate::events::{PipelineEvent, PipelineObserver, TracingObserver};
use crate::reassembler::reassemble;
use crate::sequence::Sequence;
use crate::transform::SortKey;
use crate::Result;
use std::sync::Arc;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of vertical strips, and therefore worker threads
    pub chunk_count: usize,
    /// Reassemble strips in descending id order
    pub reverse: bool,
    /// Ordering applied to every pixel column
    pub sort_key: SortKey,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_count: num_cpus::get() * 2,
            reverse: false,
            sort_key: SortKey::default(),
        }
    }
}

/// Runs the temporal sort over whole sequences
pub struct Pipeline {
    config: PipelineConfig,
    observer: Arc<dyn PipelineObserver>,
}

impl Pipeline {
    /// Creates a pipeline that logs its stages through `tracing`
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            observer: Arc::new(TracingObserver::new()),
        }
    }

    /// Replaces the observer that receives stage events
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Returns the configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Temporally sorts `sequence`.
    ///
    /// The output is `(width / chunk_count) * chunk_count` pixels wide, as
    /// tall as the input, and has the same number of frames.
    pub fn run(&self, sequence: &Sequence) -> Result<Sequence> {
        let _span = tracing::info_span!(
            "temporal_sort",
            width = sequence.width(),
            height = sequence.height(),
            depth = sequence.depth(),
            chunks = self.config.chunk_count,
        )
        .entered();

        let chunks = chunk(sequence, self.config.chunk_count)?;
        for chunk in &chunks {
            if let Some(first) = chunk.frames.first() {
                self.observer.on_event(&PipelineEvent::ChunkCreated {
                    chunk_id: chunk.id,
                    width: first.width(),
                    height: first.height(),
                    depth: chunk.depth(),
                });
            }
        }

        let processed = Dispatcher::new(self.config.sort_key, self.config.reverse)
            .with_observer(Arc::clone(&self.observer))
            .run(chunks)?;

        let result = reassemble(&processed)?;
        self.observer.on_event(&PipelineEvent::ReassemblyComplete {
            width: result.width(),
            height: result.height(),
            depth: result.depth(),
        });

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;

    fn config(chunk_count: usize) -> PipelineConfig {
        PipelineConfig {
            chunk_count,
            ..PipelineConfig::default()
        }
    }

    /// Pseudo-random but reproducible frames with plenty of repeated values
    fn noisy_sequence(width: u32, height: u32, depth: u32) -> Sequence {
        let frames = (0..depth)
            .map(|t| {
                RgbaImage::from_fn(width, height, |x, y| {
                    let seed = x.wrapping_mul(73_856_093)
                        ^ y.wrapping_mul(19_349_663)
                        ^ t.wrapping_mul(83_492_791);
                    Rgba([
                        (seed % 7) as u8 * 30,
                        (seed / 7 % 5) as u8 * 50,
                        (seed / 35 % 3) as u8 * 100,
                        255,
                    ])
                })
            })
            .collect();
        Sequence::new(frames).unwrap()
    }

    #[test]
    fn test_two_by_one_scenario() {
        let frame0 = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([10, 0, 0, 255])
            } else {
                Rgba([5, 0, 0, 255])
            }
        });
        let frame1 = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([2, 0, 0, 255])
            } else {
                Rgba([9, 0, 0, 255])
            }
        });
        let sequence = Sequence::new(vec![frame0, frame1]).unwrap();

        let result = Pipeline::new(config(1)).run(&sequence).unwrap();

        let frames = result.frames();
        assert_eq!(*frames[0].get_pixel(0, 0), Rgba([2, 0, 0, 255]));
        assert_eq!(*frames[0].get_pixel(1, 0), Rgba([5, 0, 0, 255]));
        assert_eq!(*frames[1].get_pixel(0, 0), Rgba([10, 0, 0, 255]));
        assert_eq!(*frames[1].get_pixel(1, 0), Rgba([9, 0, 0, 255]));
    }

    #[test]
    fn test_output_dimensions() {
        for (width, chunks) in [(10, 3), (12, 4), (7, 7), (9, 2), (16, 1)] {
            let sequence = noisy_sequence(width, 5, 3);
            let result = Pipeline::new(config(chunks)).run(&sequence).unwrap();

            assert_eq!(result.width(), width / chunks as u32 * chunks as u32);
            assert_eq!(result.height(), 5);
            assert_eq!(result.depth(), 3);
        }
    }

    #[test]
    fn test_truncation_drops_trailing_column() {
        let sequence = noisy_sequence(10, 2, 1);
        let result = Pipeline::new(config(3)).run(&sequence).unwrap();

        assert_eq!(result.width(), 9);
        let expected = image::imageops::crop_imm(&sequence.frames()[0], 0, 0, 9, 2).to_image();
        assert_eq!(result.frames()[0], expected);
    }

    #[test]
    fn test_single_frame_is_identity() {
        let sequence = noisy_sequence(8, 4, 1);
        let result = Pipeline::new(config(4)).run(&sequence).unwrap();
        assert_eq!(result, sequence);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let sequence = noisy_sequence(24, 6, 9);
        let pipeline = Pipeline::new(config(6));

        let first = pipeline.run(&sequence).unwrap();
        let second = pipeline.run(&sequence).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_chunk_count_does_not_change_pixels() {
        let sequence = noisy_sequence(12, 3, 5);

        let whole = Pipeline::new(config(1)).run(&sequence).unwrap();
        let split = Pipeline::new(config(4)).run(&sequence).unwrap();

        assert_eq!(whole, split);
    }

    #[test]
    fn test_every_pixel_is_non_decreasing() {
        let sequence = noisy_sequence(9, 4, 11);
        let result = Pipeline::new(config(3)).run(&sequence).unwrap();

        for y in 0..result.height() {
            for x in 0..result.width() {
                let column: Vec<_> = result
                    .frames()
                    .iter()
                    .map(|frame| frame.get_pixel(x, y).0)
                    .collect();
                assert!(column.windows(2).all(|w| w[0] <= w[1]), "column ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_reverse_mirrors_strip_order() {
        let sequence = noisy_sequence(6, 2, 4);
        let forward = Pipeline::new(config(3)).run(&sequence).unwrap();
        let reversed = Pipeline::new(PipelineConfig {
            chunk_count: 3,
            reverse: true,
            sort_key: SortKey::Lexicographic,
        })
        .run(&sequence)
        .unwrap();

        for (f, r) in forward.frames().iter().zip(reversed.frames()) {
            for strip in 0..3u32 {
                let a = image::imageops::crop_imm(f, strip * 2, 0, 2, 2).to_image();
                let b = image::imageops::crop_imm(r, (2 - strip) * 2, 0, 2, 2).to_image();
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_invalid_chunk_count() {
        let sequence = noisy_sequence(4, 1, 2);
        let err = Pipeline::new(config(0)).run(&sequence).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_stage_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let observer = move |event: &PipelineEvent| sink.lock().unwrap().push(event.clone());

        let sequence = noisy_sequence(4, 2, 3);
        Pipeline::new(config(2))
            .with_observer(Arc::new(observer))
            .run(&sequence)
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            events[0],
            PipelineEvent::ChunkCreated {
                chunk_id: 0,
                width: 2,
                height: 2,
                depth: 3
            }
        );
        assert_eq!(events[2], PipelineEvent::DispatchStarted { chunk_count: 2 });
        assert_eq!(
            events.last(),
            Some(&PipelineEvent::ReassemblyComplete {
                width: 4,
                height: 2,
                depth: 3
            })
        );
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert!(config.chunk_count >= 2);
        assert!(!config.reverse);
        assert_eq!(config.sort_key, SortKey::Lexicographic);
    }
}
