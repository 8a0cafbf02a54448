//! Gallery manifest generation.
//!
//! Lists the photo directory and writes one JSON record per photo:
//!
//! ```json
//! [
//!   {
//!     "url": "IMG_0042.webp",
//!     "date": "2023-04-05T12:30:00",
//!     "thumbnail": "IMG_0042-thumb.webp"
//!   }
//! ]
//! ```
//!
//! `url` and `thumbnail` are derived from the source stem (see
//! [`naming`](crate::naming)); they name the files the converter produces, so
//! the manifest can be written before conversion runs.
//!
//! ## Ordering
//!
//! Every entry gets a [`SortKey`]. Dated entries come first, newest first;
//! entries whose date is empty or not a timestamp come after all of them,
//! alphabetically by url. Ties on date fall back to url so the output is
//! stable across runs.

use crate::metadata::{self, CaptureDate};
use crate::naming;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Photo directory not found: {0}")]
    SourceNotFound(PathBuf),
}

/// One manifest record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoEntry {
    pub url: String,
    /// ISO-8601 timestamp, the raw EXIF value if it didn't parse, or `""`.
    pub date: String,
    pub thumbnail: String,
}

impl PhotoEntry {
    pub fn new(stem: &str, date: &CaptureDate) -> Self {
        Self {
            url: naming::webp_name(stem),
            date: date.to_manifest_string(),
            thumbnail: naming::thumbnail_name(stem),
        }
    }

    pub fn sort_key(&self) -> SortKey {
        match metadata::parse_manifest_date(&self.date) {
            Some(date) => SortKey::Dated(Reverse(date), self.url.clone()),
            None => SortKey::Undated(self.url.clone()),
        }
    }
}

/// Total order over manifest entries.
///
/// Variant order puts every `Dated` key before every `Undated` one;
/// `Reverse` makes dates descend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Dated(Reverse<NaiveDateTime>, String),
    Undated(String),
}

/// Build the ordered manifest for a flat photo directory.
pub fn build_manifest(dir: &Path) -> Result<Vec<PhotoEntry>, ManifestError> {
    if !dir.is_dir() {
        return Err(ManifestError::SourceNotFound(dir.to_path_buf()));
    }

    let mut photos: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && naming::is_photo(path))
        .collect();
    photos.sort();

    let mut entries: Vec<PhotoEntry> = photos
        .iter()
        .filter_map(|path| {
            let stem = naming::stem(path)?;
            Some(PhotoEntry::new(&stem, &metadata::capture_date(path)))
        })
        .collect();

    entries.sort_by_cached_key(PhotoEntry::sort_key);
    log::debug!("manifest: {} entries from {}", entries.len(), dir.display());
    Ok(entries)
}

/// Serialize entries as pretty JSON (2-space indent).
pub fn to_json(entries: &[PhotoEntry]) -> Result<String, ManifestError> {
    Ok(serde_json::to_string_pretty(entries)?)
}

/// Write the manifest, replacing any existing file.
pub fn write_manifest(path: &Path, entries: &[PhotoEntry]) -> Result<(), ManifestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json(entries)?)?;
    Ok(())
}
