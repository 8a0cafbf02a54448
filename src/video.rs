//! Video transcoding through the `ffmpeg` binary.
//!
//! Two jobs, both driven by the CLI:
//!
//! | Job | Finds | Writes | Encoder |
//! |---|---|---|---|
//! | `webm` | every `video.mp4` | `video.webm` beside it | `libvpx-vp9` |
//! | `nvenc` | every `*.mp4` | `<stem>.tmp.mp4`, then replaces the source | `hevc_nvenc` |
//!
//! ffmpeg is located with `which` and checked once up front with
//! [`Ffmpeg::probe`], which looks for the required encoder in
//! `ffmpeg -hide_banner -encoders`. Command lines are built by pure
//! functions ([`webm_args`], [`nvenc_args`]) so they can be tested without
//! ffmpeg installed.

use crate::naming;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("ffmpeg not found in PATH: {0}")]
    NotFound(#[from] which::Error),
    #[error("ffmpeg failed when querying encoders: {0}")]
    QueryFailed(String),
    #[error("ffmpeg found but none of [{}] is available", .0.join(", "))]
    MissingEncoder(&'static [&'static str]),
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("ffmpeg is no longer available at {0}")]
    MissingDependency(PathBuf),
    #[error("failed to start ffmpeg: {0}")]
    Spawn(std::io::Error),
    #[error("ffmpeg failed: {0}")]
    Failed(ExitStatus),
    #[error("failed to replace original: {0}")]
    Replace(std::io::Error),
}

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Root not found: {0}")]
    RootNotFound(PathBuf),
    #[error("Failed to walk {0}: {1}")]
    Walk(PathBuf, #[source] walkdir::Error),
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeOutcome {
    Encoded,
    Skipped(String),
}

/// Encoder family a job needs from the local ffmpeg build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderRequirement {
    Vp9,
    Nvenc,
}

impl EncoderRequirement {
    /// Any one of these encoder names satisfies the requirement.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            EncoderRequirement::Vp9 => &["libvpx-vp9", "libvpx"],
            EncoderRequirement::Nvenc => &["hevc_nvenc", "h264_nvenc"],
        }
    }
}

/// Whether an `-encoders` listing satisfies `requirement`.
pub fn encoders_support(listing: &str, requirement: EncoderRequirement) -> bool {
    listing.lines().any(|line| {
        line.split_whitespace()
            .nth(1)
            .is_some_and(|name| requirement.candidates().contains(&name))
    })
}

/// A located ffmpeg binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ffmpeg {
    path: PathBuf,
}

impl Ffmpeg {
    /// Use a specific binary without probing it.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Locate ffmpeg on `PATH` and check it has the required encoder.
    pub fn probe(requirement: EncoderRequirement) -> Result<Self, ProbeError> {
        let path = which::which("ffmpeg")?;
        let output = Command::new(&path)
            .args(["-hide_banner", "-encoders"])
            .output()
            .map_err(|e| ProbeError::QueryFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(ProbeError::QueryFailed(output.status.to_string()));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        log::debug!("{} reported {} encoder lines", path.display(), listing.lines().count());
        if !encoders_support(&listing, requirement) {
            return Err(ProbeError::MissingEncoder(requirement.candidates()));
        }
        Ok(Self { path })
    }

    /// Run ffmpeg with inherited stdio.
    pub fn run(&self, args: &[OsString]) -> Result<EncodeOutcome, EncodeError> {
        log::debug!("{} {:?}", self.path.display(), args);
        let status = Command::new(&self.path)
            .args(args)
            .status()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EncodeError::MissingDependency(self.path.clone()),
                _ => EncodeError::Spawn(e),
            })?;
        if status.success() {
            Ok(EncodeOutcome::Encoded)
        } else {
            Err(EncodeError::Failed(status))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebmSettings {
    pub crf: u32,
    /// 0 lets the encoder decide.
    pub threads: u32,
    pub overwrite: bool,
}

/// One planned transcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJob {
    pub source: PathBuf,
    pub destination: PathBuf,
}

fn os(values: &[&str]) -> Vec<OsString> {
    values.iter().map(|v| OsString::from(*v)).collect()
}

/// VP9 WebM with short clusters so playback can start while downloading.
pub fn webm_args(source: &Path, destination: &Path, settings: &WebmSettings) -> Vec<OsString> {
    let mut args = os(&["-hide_banner", if settings.overwrite { "-y" } else { "-n" }, "-i"]);
    args.push(source.into());
    args.extend(os(&["-an", "-c:v", "libvpx-vp9", "-crf"]));
    args.push(settings.crf.to_string().into());
    args.extend(os(&[
        "-b:v", "3M", "-maxrate", "3M", "-bufsize", "10M", "-pix_fmt", "yuv420p", "-row-mt", "1",
        "-g", "240", "-deadline", "good", "-cpu-used", "1", "-threads",
    ]));
    args.push(settings.threads.to_string().into());
    args.extend(os(&[
        "-f",
        "webm",
        "-cluster_time_limit",
        "2000",
        "-cluster_size_limit",
        "2097152",
    ]));
    args.push(destination.into());
    args
}

/// HEVC NVENC at half resolution, rounded down to even dimensions.
pub fn nvenc_args(source: &Path, destination: &Path) -> Vec<OsString> {
    let mut args = os(&["-y", "-hwaccel", "auto", "-i"]);
    args.push(source.into());
    args.extend(os(&[
        "-c:v",
        "hevc_nvenc",
        "-preset",
        "p7",
        "-rc",
        "vbr_hq",
        "-cq",
        "25",
        "-b:v",
        "3M",
        "-maxrate",
        "3M",
        "-bufsize",
        "10M",
        "-vf",
        "scale=trunc(iw/2/2)*2:trunc(ih/2/2)*2",
        "-an",
    ]));
    args.push(destination.into());
    args
}

fn walk_files(
    root: &Path,
    mut keep: impl FnMut(&Path) -> bool,
) -> Result<Vec<PathBuf>, VideoError> {
    if !root.exists() {
        return Err(VideoError::RootNotFound(root.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| VideoError::Walk(root.to_path_buf(), e))?;
        if entry.file_type().is_file() && keep(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// `video.mp4` → `video.webm` for every match under `root`.
pub fn plan_webm(root: &Path) -> Result<Vec<VideoJob>, VideoError> {
    let sources = walk_files(root, |p| p.file_name().is_some_and(|n| n == "video.mp4"))?;
    Ok(sources
        .into_iter()
        .map(|source| VideoJob {
            destination: source.with_extension("webm"),
            source,
        })
        .collect())
}

/// `*.mp4` → `<stem>.tmp.mp4` for every match under `root`.
pub fn plan_nvenc(root: &Path) -> Result<Vec<VideoJob>, VideoError> {
    let sources = walk_files(root, |p| naming::has_extension(p, &["mp4"]))?;
    Ok(sources
        .into_iter()
        .map(|source| VideoJob {
            destination: source.with_extension("tmp.mp4"),
            source,
        })
        .collect())
}

pub fn encode_webm(
    ffmpeg: &Ffmpeg,
    job: &VideoJob,
    settings: &WebmSettings,
) -> Result<EncodeOutcome, EncodeError> {
    if job.destination.exists() && !settings.overwrite {
        return Ok(EncodeOutcome::Skipped(format!(
            "destination exists: {}",
            job.destination.display()
        )));
    }
    ffmpeg.run(&webm_args(&job.source, &job.destination, settings))
}

/// Encode to the temporary destination, then move it over the source.
pub fn encode_nvenc(ffmpeg: &Ffmpeg, job: &VideoJob) -> Result<EncodeOutcome, EncodeError> {
    let outcome = ffmpeg.run(&nvenc_args(&job.source, &job.destination))?;
    if outcome == EncodeOutcome::Encoded {
        std::fs::rename(&job.destination, &job.source).map_err(EncodeError::Replace)?;
    }
    Ok(outcome)
}
