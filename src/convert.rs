//! Batch photo conversion to WebP.
//!
//! Takes a flat directory of source photos and writes, for each one:
//!
//! ```text
//! favourites/IMG_0042.JPG  →  favourites_webp/IMG_0042.webp
//!                             favourites_webp/IMG_0042-thumb.webp   (thumbnails on)
//! ```
//!
//! ## Concurrency
//!
//! Each source file is an independent unit of work. Units run on a local
//! rayon pool sized by [`ConvertOptions::threads`]; they share only the
//! output directory and never write the same name. A unit that fails or
//! panics is reported as a [`ConversionOutcome::Failed`] value; it never
//! cancels its siblings and the driver always waits for every unit.
//!
//! ## Progress
//!
//! When an `mpsc::Sender<ConvertEvent>` is supplied, each unit sends one
//! event as it finishes. The CLI drains the channel on a printer thread so
//! lines never interleave.

use crate::config::{self, Config};
use crate::imaging::{CarriedMetadata, ConvertParams, ImageBackend, Quality, ThumbnailParams};
use crate::naming;
use crate::pipeline::panic_message;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Knobs for a conversion batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub quality: Quality,
    /// Extensions (no dot, any case) picked up from the source directory.
    pub extensions: Vec<String>,
    /// Worker count; already clamped to the machine.
    pub threads: usize,
    /// Thumbnail bounding box edge, or `None` to skip thumbnails.
    pub thumbnail: Option<u32>,
}

impl ConvertOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            quality: Quality::new(config.webp.quality),
            extensions: config.photos.extensions.clone(),
            threads: config::effective_threads(&config.processing),
            thumbnail: config
                .thumbnails
                .enabled
                .then_some(config.thumbnails.max_size),
        }
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutcome {
    Converted {
        output: PathBuf,
        thumbnail: Option<PathBuf>,
        metadata: CarriedMetadata,
    },
    Failed {
        reason: String,
    },
}

/// Result of converting one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub source: PathBuf,
    pub outcome: ConversionOutcome,
}

impl ConversionResult {
    fn failed(source: &Path, reason: impl Into<String>) -> Self {
        Self {
            source: source.to_path_buf(),
            outcome: ConversionOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ConversionOutcome::Converted { .. })
    }
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertEvent {
    /// Sent once, before any work starts.
    Discovered { count: usize },
    /// Sent by each unit as it finishes.
    Finished(ConversionResult),
}

/// Aggregate of a finished batch. `results` is in source-path order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub discovered: usize,
    pub converted: usize,
    pub failed: usize,
    pub results: Vec<ConversionResult>,
}

impl BatchSummary {
    fn from_results(results: Vec<ConversionResult>) -> Self {
        let converted = results.iter().filter(|r| r.is_success()).count();
        Self {
            discovered: results.len(),
            converted,
            failed: results.len() - converted,
            results,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}

/// Convert a single photo into `output_dir`. Never panics on bad input;
/// every failure, including a panicking backend, comes back as
/// [`ConversionOutcome::Failed`] with no output files left behind.
pub fn convert_one(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    options: &ConvertOptions,
) -> ConversionResult {
    let Some(stem) = naming::stem(source) else {
        return ConversionResult::failed(source, "source has no file name");
    };

    if let Err(e) = std::fs::create_dir_all(output_dir) {
        return ConversionResult::failed(
            source,
            format!("cannot create {}: {e}", output_dir.display()),
        );
    }

    let params = ConvertParams {
        source: source.to_path_buf(),
        output: output_dir.join(naming::webp_name(&stem)),
        quality: options.quality,
    };
    let thumbnail = options.thumbnail.map(|max_size| ThumbnailParams {
        source: source.to_path_buf(),
        output: output_dir.join(naming::thumbnail_name(&stem)),
        max_width: max_size,
        max_height: max_size,
        quality: options.quality,
    });

    let encoded = panic::catch_unwind(AssertUnwindSafe(|| match &thumbnail {
        Some(thumb) => backend.convert_with_thumbnail(&params, thumb),
        None => backend.convert(&params),
    }));
    let reason = match encoded {
        Ok(Ok(metadata)) => {
            return ConversionResult {
                source: source.to_path_buf(),
                outcome: ConversionOutcome::Converted {
                    output: params.output,
                    thumbnail: thumbnail.map(|t| t.output),
                    metadata,
                },
            };
        }
        Ok(Err(e)) => e.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };

    remove_partial_output(&params.output);
    if let Some(thumb) = &thumbnail {
        remove_partial_output(&thumb.output);
    }
    ConversionResult::failed(source, reason)
}

/// Delete an output left by a unit that went on to fail.
fn remove_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log::debug!("removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("could not remove partial output {}: {e}", path.display()),
    }
}

/// Regular files directly inside `dir` with a matching extension, sorted.
pub fn discover_sources<S: AsRef<str>>(
    dir: &Path,
    extensions: &[S],
) -> Result<Vec<PathBuf>, ConvertError> {
    let mut sources: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && naming::has_extension(path, extensions))
        .collect();
    sources.sort();
    Ok(sources)
}

/// Convert every matching photo in `source_dir` in parallel.
///
/// An empty directory is not an error: the summary has zero counts and
/// nothing is created on disk.
pub fn convert_directory(
    backend: &impl ImageBackend,
    source_dir: &Path,
    output_dir: &Path,
    options: &ConvertOptions,
    events: Option<Sender<ConvertEvent>>,
) -> Result<BatchSummary, ConvertError> {
    if !source_dir.is_dir() {
        return Err(ConvertError::SourceNotFound(source_dir.to_path_buf()));
    }

    let sources = discover_sources(source_dir, &options.extensions)?;
    if let Some(tx) = &events {
        tx.send(ConvertEvent::Discovered {
            count: sources.len(),
        })
        .ok();
    }
    if sources.is_empty() {
        return Ok(BatchSummary::default());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.max(1))
        .build()?;
    log::debug!(
        "converting {} files with {} workers",
        sources.len(),
        pool.current_num_threads()
    );

    let results: Vec<ConversionResult> = pool.install(|| {
        sources
            .par_iter()
            .map(|source| {
                let result = convert_one(backend, source, output_dir, options);
                if let Some(tx) = &events {
                    tx.send(ConvertEvent::Finished(result.clone())).ok();
                }
                result
            })
            .collect()
    });

    Ok(BatchSummary::from_results(results))
}
