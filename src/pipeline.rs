//! The `build` command: manifest, then conversion.
//!
//! ```text
//! 1. Manifest   favourites/  →  public/photos.json
//! 2. Convert    favourites/  →  favourites_webp/*.webp
//! ```
//!
//! The convert step always covers every extension the manifest lists, so each
//! manifest `url` has a file behind it unless that photo failed to convert.
//!
//! Steps run in that fixed order, each as an isolated direct call, with a
//! progress line printed before each. A step that returns an error or
//! panics stops the run with [`PipelineError::StepFailed`]; later steps do
//! not run and nothing is retried.
//!
//! The caller prints the completion line once its event printer has drained.

use crate::config::Config;
use crate::convert::{self, BatchSummary, ConvertEvent, ConvertOptions};
use crate::imaging::ImageBackend;
use crate::manifest;
use crate::naming;
use crate::output;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Manifest,
    Convert,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Manifest => write!(f, "manifest"),
            Step::Convert => write!(f, "convert"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Step '{step}' failed: {reason}")]
    StepFailed { step: Step, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub manifest_path: PathBuf,
    pub manifest_entries: usize,
    pub batch: BatchSummary,
}

/// Run both steps with settings from `config`.
pub fn run(
    config: &Config,
    backend: &impl ImageBackend,
    events: Option<Sender<ConvertEvent>>,
) -> Result<PipelineReport, PipelineError> {
    run_with_options(config, &ConvertOptions::from_config(config), backend, events)
}

/// Run both steps with explicit conversion options.
///
/// `options.extensions` is widened to include every manifest extension.
pub fn run_with_options(
    config: &Config,
    options: &ConvertOptions,
    backend: &impl ImageBackend,
    events: Option<Sender<ConvertEvent>>,
) -> Result<PipelineReport, PipelineError> {
    let photos = &config.photos;
    let options = &with_manifest_extensions(options);

    output::print_step(Step::Manifest);
    let manifest_entries = run_step(Step::Manifest, || {
        let entries = manifest::build_manifest(&photos.source)?;
        manifest::write_manifest(&photos.manifest, &entries)?;
        Ok::<_, manifest::ManifestError>(entries.len())
    })?;
    output::print_manifest_written(&photos.manifest, manifest_entries);

    output::print_step(Step::Convert);
    let batch = run_step(Step::Convert, || {
        convert::convert_directory(backend, &photos.source, &photos.output, options, events)
    })?;

    Ok(PipelineReport {
        manifest_path: photos.manifest.clone(),
        manifest_entries,
        batch,
    })
}

fn with_manifest_extensions(options: &ConvertOptions) -> ConvertOptions {
    let mut options = options.clone();
    for ext in naming::PHOTO_EXTENSIONS {
        if !options
            .extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
        {
            options.extensions.push(ext.to_string());
        }
    }
    options
}

/// Run one step, turning both errors and panics into [`PipelineError`].
fn run_step<T, E: fmt::Display>(
    step: Step,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, PipelineError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(PipelineError::StepFailed {
            step,
            reason: e.to_string(),
        }),
        Err(payload) => Err(PipelineError::StepFailed {
            step,
            reason: format!("panicked: {}", panic_message(payload.as_ref())),
        }),
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
