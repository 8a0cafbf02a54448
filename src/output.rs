//! CLI output formatting for every command.
//!
//! Output is one line per file, source first, with failures stated inline so
//! a batch log reads top to bottom:
//!
//! ```text
//! Generating manifest...
//! Manifest written to public/photos.json with 3 photos.
//! Converting JPGs to webp and thumbnails...
//! Found 3 files
//! Converted: IMG_0001.jpg -> IMG_0001.webp (+ thumbnail) [ICC, EXIF]
//! Converted: IMG_0002.jpg -> IMG_0002.webp (+ thumbnail)
//! Error converting IMG_0003.jpg: Decode failed: ...
//! All done.
//! ```
//!
//! # Architecture
//!
//! Each command has `format_*` functions (returning `Vec<String>`) for
//! testability and `print_*` wrappers that write to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::convert::{BatchSummary, ConversionOutcome, ConversionResult, ConvertEvent};
use crate::icons::{IconOutcome, IconResult};
use crate::imaging::CarriedMetadata;
use crate::pipeline::Step;
use crate::projects::{ProjectOutcome, ProjectsReport, SourceDisposition};
use crate::video::{EncodeError, EncodeOutcome, ProbeError, VideoJob};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Final path component for display, falling back to the whole path.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// "JPG", "JPG/PNG", ... for messages about the extension filter.
fn extension_label(extensions: &[String]) -> String {
    extensions
        .iter()
        .map(|e| e.to_uppercase())
        .collect::<Vec<_>>()
        .join("/")
}

fn metadata_tag(metadata: &CarriedMetadata) -> Option<&'static str> {
    match (metadata.icc_profile, metadata.exif) {
        (true, true) => Some("ICC, EXIF"),
        (true, false) => Some("ICC"),
        (false, true) => Some("EXIF"),
        (false, false) => None,
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Build pipeline
// ============================================================================

pub fn format_step(step: Step) -> Vec<String> {
    let line = match step {
        Step::Manifest => "Generating manifest...",
        Step::Convert => "Converting JPGs to webp and thumbnails...",
    };
    vec![line.to_string()]
}

pub fn print_step(step: Step) {
    print_lines(format_step(step));
}

pub fn print_done() {
    println!("All done.");
}

// ============================================================================
// Manifest
// ============================================================================

pub fn format_manifest_written(path: &Path, count: usize) -> Vec<String> {
    vec![format!(
        "Manifest written to {} with {} photos.",
        path.display(),
        count
    )]
}

pub fn print_manifest_written(path: &Path, count: usize) {
    print_lines(format_manifest_written(path, count));
}

// ============================================================================
// Convert
// ============================================================================

/// Format one conversion result as a single line.
pub fn format_conversion(result: &ConversionResult) -> String {
    let source = file_name(&result.source);
    match &result.outcome {
        ConversionOutcome::Converted {
            output,
            thumbnail,
            metadata,
        } => {
            let mut line = format!("Converted: {} -> {}", source, file_name(output));
            if thumbnail.is_some() {
                line.push_str(" (+ thumbnail)");
            }
            if let Some(tag) = metadata_tag(metadata) {
                line.push_str(&format!(" [{tag}]"));
            }
            line
        }
        ConversionOutcome::Failed { reason } => {
            format!("Error converting {}: {}", source, reason)
        }
    }
}

/// Format a progress event from the conversion driver.
pub fn format_convert_event(event: &ConvertEvent, extensions: &[String]) -> Vec<String> {
    match event {
        ConvertEvent::Discovered { count: 0 } => {
            vec![format!("No {} files found.", extension_label(extensions))]
        }
        ConvertEvent::Discovered { count } => vec![format!("Found {} files", count)],
        ConvertEvent::Finished(result) => vec![format_conversion(result)],
    }
}

pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    if summary.discovered == 0 {
        return Vec::new();
    }
    let mut line = format!(
        "Converted {} of {} files",
        summary.converted, summary.discovered
    );
    if summary.failed > 0 {
        line.push_str(&format!(" ({} failed)", summary.failed));
    }
    vec![line]
}

pub fn print_batch_summary(summary: &BatchSummary) {
    print_lines(format_batch_summary(summary));
}

// ============================================================================
// Projects
// ============================================================================

pub fn format_projects_report(report: &ProjectsReport) -> Vec<String> {
    let mut lines = Vec::new();

    for item in &report.items {
        match &item.outcome {
            ProjectOutcome::Converted {
                output,
                disposition,
                ..
            } => {
                lines.push(format!(
                    "Converted: {} -> {}",
                    item.source.display(),
                    output.display()
                ));
                match disposition {
                    SourceDisposition::Deleted => {
                        lines.push(format!("Deleted: {}", item.source.display()))
                    }
                    SourceDisposition::DeleteFailed(e) => lines.push(format!(
                        "Error deleting {}: {}",
                        item.source.display(),
                        e
                    )),
                    SourceDisposition::Kept => {}
                }
            }
            ProjectOutcome::Failed { reason } => {
                lines.push(format!(
                    "Error converting {}: {}",
                    item.source.display(),
                    reason
                ));
            }
        }
    }

    lines.push(String::new());
    lines.push("PNG to WebP mapping:".to_string());
    for mapping in report.mappings() {
        lines.push(format!("{} -> {}", mapping.old, mapping.new));
    }
    lines.push(String::new());
    lines.push("Done.".to_string());
    lines
}

pub fn print_projects_report(report: &ProjectsReport) {
    print_lines(format_projects_report(report));
}

// ============================================================================
// Video
// ============================================================================

pub fn format_probe_failure(error: &ProbeError, dry_run: bool) -> Vec<String> {
    let mut lines = vec![format!("FFmpeg check failed: {}", error)];
    if dry_run {
        lines.push("Continuing in dry-run mode.".to_string());
    } else {
        lines.push("You can still run with --dry-run.".to_string());
    }
    lines
}

pub fn print_probe_failure(error: &ProbeError, dry_run: bool) {
    print_lines(format_probe_failure(error, dry_run));
}

/// `what` names the searched files, e.g. `video.mp4` or `*.mp4`.
pub fn format_video_plan(jobs: &[VideoJob], root: &Path, what: &str) -> Vec<String> {
    if jobs.is_empty() {
        vec![format!("No {} files found under {}", what, root.display())]
    } else {
        vec![format!("Found {} files", jobs.len())]
    }
}

pub fn print_video_plan(jobs: &[VideoJob], root: &Path, what: &str) {
    print_lines(format_video_plan(jobs, root, what));
}

pub fn format_video_job(job: &VideoJob) -> String {
    format!(
        "-> {} => {}",
        job.source.display(),
        job.destination.display()
    )
}

pub fn format_encode_result(result: &Result<EncodeOutcome, EncodeError>) -> String {
    match result {
        Ok(EncodeOutcome::Encoded) => "    encoded".to_string(),
        Ok(EncodeOutcome::Skipped(reason)) => format!("    skipped: {}", reason),
        Err(e) => format!("    {}", e),
    }
}

// ============================================================================
// Icons
// ============================================================================

pub fn format_icon_result(result: &IconResult) -> Vec<String> {
    match &result.outcome {
        IconOutcome::Saved { bytes, .. } => vec![
            format!("Downloading {} from {}", result.name, result.url),
            format!("Saved {} ({} bytes)", result.name, bytes),
        ],
        IconOutcome::Failed(reason) => vec![
            format!("Downloading {} from {}", result.name, result.url),
            format!("Failed to download {}: {}", result.name, reason),
        ],
    }
}

pub fn print_icon_results(results: &[IconResult]) {
    print_lines(results.iter().flat_map(format_icon_result).collect());
}
