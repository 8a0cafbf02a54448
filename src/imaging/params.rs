//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the converter (which decides what files to create) and
//! the [`backend`](super::backend) (which does the actual pixel work). This
//! separation allows swapping backends (e.g. for testing with a mock) without
//! changing driver logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy WebP quality (0–100, default 80). Clamped on construction.
//! - [`ConvertParams`]: Full-size re-encode: source, output path, quality.
//! - [`ThumbnailParams`]: Bounded downscale: source, output, bounding box, quality.

use std::path::PathBuf;

/// Quality setting for lossy WebP encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Quality in the form libwebp expects.
    pub fn as_f32(self) -> f32 {
        self.0 as f32
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Parameters for a full-size re-encode.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub quality: Quality,
}

/// Parameters for a thumbnail: downscale to fit inside `max_width × max_height`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
}
