//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the converters need:
//! a full-size re-encode and a bounded thumbnail, plus a combined form that
//! produces both from one decode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): `image` for decoding,
//! libwebp for lossy encoding, and a small RIFF muxer for metadata.

use super::params::{ConvertParams, ThumbnailParams};
use super::webp_mux::MuxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("WebP encode failed: {0}")]
    Encode(String),
    #[error("WebP mux failed: {0}")]
    Mux(#[from] MuxError),
}

/// Metadata blocks carried from a source image into its WebP output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarriedMetadata {
    pub icc_profile: bool,
    pub exif: bool,
}

/// Trait for image processing backends.
///
/// `Sync` so a single backend can be shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Decode `params.source` and write it as WebP to `params.output`,
    /// preserving embedded ICC/EXIF blocks that exist in the source.
    fn convert(&self, params: &ConvertParams) -> Result<CarriedMetadata, BackendError>;

    /// Write a downscaled WebP that fits the requested bounding box.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;

    /// Full-size WebP and thumbnail of the same source.
    ///
    /// Backends that can share one decode between the two override this.
    /// Stops at the first error; outputs already written are left for the
    /// caller to clean up.
    fn convert_with_thumbnail(
        &self,
        params: &ConvertParams,
        thumbnail: &ThumbnailParams,
    ) -> Result<CarriedMetadata, BackendError> {
        let metadata = self.convert(params)?;
        self.thumbnail(thumbnail)?;
        Ok(metadata)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations without decoding anything.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    ///
    /// Sources whose path contains `fail_marker` are rejected by both
    /// operations, `thumbnail_fail_marker` only by `thumbnail`, and
    /// `panic_marker` makes `convert` panic. Everything else "succeeds" by
    /// writing a placeholder file at the output path.
    #[derive(Default)]
    pub struct MockBackend {
        pub fail_marker: Option<String>,
        pub thumbnail_fail_marker: Option<String>,
        pub panic_marker: Option<String>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Convert {
            source: String,
            output: String,
            quality: u32,
        },
        Thumbnail {
            source: String,
            output: String,
            max_width: u32,
            max_height: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_on(marker: &str) -> Self {
            Self {
                fail_marker: Some(marker.to_string()),
                ..Self::default()
            }
        }

        pub fn failing_thumbnails_on(marker: &str) -> Self {
            Self {
                thumbnail_fail_marker: Some(marker.to_string()),
                ..Self::default()
            }
        }

        pub fn panicking_on(marker: &str) -> Self {
            Self {
                panic_marker: Some(marker.to_string()),
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn matches(marker: &Option<String>, source: &std::path::Path) -> bool {
            marker
                .as_deref()
                .is_some_and(|m| source.to_string_lossy().contains(m))
        }

        fn check(
            &self,
            marker: &Option<String>,
            source: &std::path::Path,
        ) -> Result<(), BackendError> {
            if Self::matches(marker, source) {
                return Err(BackendError::Encode(format!(
                    "mock failure for {}",
                    source.display()
                )));
            }
            Ok(())
        }
    }

    impl ImageBackend for MockBackend {
        fn convert(&self, params: &ConvertParams) -> Result<CarriedMetadata, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Convert {
                source: params.source.to_string_lossy().to_string(),
                output: params.output.to_string_lossy().to_string(),
                quality: params.quality.value(),
            });
            if Self::matches(&self.panic_marker, &params.source) {
                panic!("mock panic for {}", params.source.display());
            }
            self.check(&self.fail_marker, &params.source)?;
            std::fs::write(&params.output, b"mock")?;
            Ok(CarriedMetadata::default())
        }

        fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Thumbnail {
                source: params.source.to_string_lossy().to_string(),
                output: params.output.to_string_lossy().to_string(),
                max_width: params.max_width,
                max_height: params.max_height,
            });
            self.check(&self.fail_marker, &params.source)?;
            self.check(&self.thumbnail_fail_marker, &params.source)?;
            std::fs::write(&params.output, b"mock-thumb")?;
            Ok(())
        }
    }

    #[test]
    fn mock_records_convert() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::new();
        let output = tmp.path().join("out.webp");

        backend
            .convert(&ConvertParams {
                source: "/source.jpg".into(),
                output: output.clone(),
                quality: crate::imaging::Quality::new(75),
            })
            .unwrap();

        assert!(output.exists());
        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Convert { quality: 75, .. }));
    }

    #[test]
    fn mock_fails_on_marker() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::failing_on("broken");

        let result = backend.convert(&ConvertParams {
            source: "/photos/broken.jpg".into(),
            output: tmp.path().join("broken.webp"),
            quality: crate::imaging::Quality::default(),
        });

        assert!(matches!(result, Err(BackendError::Encode(_))));
        assert!(!tmp.path().join("broken.webp").exists());
    }

    #[test]
    fn combined_default_runs_both_operations_in_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::failing_thumbnails_on("small");
        let convert = ConvertParams {
            source: "/photos/small.jpg".into(),
            output: tmp.path().join("small.webp"),
            quality: crate::imaging::Quality::default(),
        };
        let thumbnail = ThumbnailParams {
            source: "/photos/small.jpg".into(),
            output: tmp.path().join("small-thumb.webp"),
            max_width: 10,
            max_height: 10,
            quality: crate::imaging::Quality::default(),
        };

        let result = backend.convert_with_thumbnail(&convert, &thumbnail);

        assert!(matches!(result, Err(BackendError::Encode(_))));
        // The full-size output was written before the thumbnail failed
        assert!(tmp.path().join("small.webp").exists());
        let ops = backend.get_operations();
        assert!(matches!(&ops[0], RecordedOp::Convert { .. }));
        assert!(matches!(&ops[1], RecordedOp::Thumbnail { .. }));
    }
}
