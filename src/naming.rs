//! Centralized filename conventions.
//!
//! Every output name in the tool is derived from the source file's stem:
//!
//! - `IMG_0042.JPG` → `IMG_0042.webp` (converted photo, manifest `url`)
//! - `IMG_0042.JPG` → `IMG_0042-thumb.webp` (thumbnail, manifest `thumbnail`)
//! - `hero.png` → `hero.webp` (project asset, same directory)
//!
//! Extension matching is case-insensitive everywhere.

use std::path::Path;

/// Extensions recognized as gallery photos by the manifest builder.
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Suffix appended to the stem of thumbnail outputs.
pub const THUMBNAIL_SUFFIX: &str = "-thumb";

/// Filename without its extension, or `None` for paths without a file name.
pub fn stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// `<stem>.webp`
pub fn webp_name(stem: &str) -> String {
    format!("{stem}.webp")
}

/// `<stem>-thumb.webp`
pub fn thumbnail_name(stem: &str) -> String {
    format!("{stem}{THUMBNAIL_SUFFIX}.webp")
}

/// Whether `path` has one of `extensions` (compared case-insensitively, no dot).
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate.as_ref()))
        })
}

/// Whether `path` looks like a gallery photo.
pub fn is_photo(path: &Path) -> bool {
    has_extension(path, PHOTO_EXTENSIONS)
}
