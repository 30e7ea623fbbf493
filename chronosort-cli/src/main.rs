//! chronosort CLI Tool
//!
//! Command-line interface that temporally sorts the pixels of an animated
//! image and writes the result as a looping GIF.

use anyhow::{Context, Result};
use chronosort_core::progress_tracker::format_duration;
use chronosort_core::{Pipeline, PipelineConfig, SortKey};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chronosort")]
#[command(about = "Sort every pixel of an animated image along the time axis")]
#[command(version)]
struct Cli {
    /// Input animated image (GIF, APNG or WebP)
    input: PathBuf,

    /// Output GIF path [default: <input stem>-sorted.gif next to the input]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of vertical strips sorted in parallel [default: 2 x logical CPUs]
    #[arg(long)]
    chunks: Option<usize>,

    /// Reassemble the strips in reverse order
    #[arg(long)]
    reverse: bool,

    /// Pixel ordering (lexicographic or luminance)
    #[arg(long, default_value_t = SortKey::Lexicographic)]
    key: SortKey,

    /// Delay between output frames in seconds
    #[arg(long, default_value = "0.04")]
    delay: f64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let start = Instant::now();
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    tracing::info!("Loading {}", cli.input.display());
    let sequence = chronosort_decoder::load(&cli.input)
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;

    let config = PipelineConfig {
        chunk_count: resolve_chunk_count(cli.chunks, sequence.width()),
        reverse: cli.reverse,
        sort_key: cli.key,
    };
    tracing::info!(
        "Sorting {} frames of {}x{} in {} chunks ({} order)",
        sequence.depth(),
        sequence.width(),
        sequence.height(),
        config.chunk_count,
        config.sort_key
    );

    let sorted = Pipeline::new(config)
        .run(&sequence)
        .context("Failed to sort sequence")?;
    drop(sequence);

    chronosort_encoder::write(&output, &sorted, cli.delay)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!(
        "Wrote {} in {}",
        output.display(),
        format_duration(start.elapsed().as_secs_f64())
    );

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// `<dir>/<stem>-sorted.gif` for an input at `<dir>/<stem>.<ext>`
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}-sorted.gif"))
}

/// An explicit chunk count is used as given; the default is clamped to the frame width
fn resolve_chunk_count(requested: Option<usize>, width: u32) -> usize {
    requested.unwrap_or_else(|| {
        PipelineConfig::default()
            .chunk_count
            .min(width as usize)
            .max(1)
    })
}
