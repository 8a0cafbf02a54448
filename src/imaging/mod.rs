//! Image processing: decode, lossy WebP encode, metadata carry-over.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` |
//! | **EXIF** | custom locator + TIFF reader (JPEG APP1, PNG eXIf, WebP EXIF) |
//! | **Encode → WebP** | `webp` (libwebp, lossy) |
//! | **ICC/EXIF → WebP** | custom VP8X muxer |
//! | **Thumbnail** | `resize_exact` (Lanczos3) into a bounding box |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Containers**: [`exif`] and [`webp_mux`] byte-level readers/writers

pub mod backend;
mod calculations;
pub mod exif;
mod params;
pub mod rust_backend;
pub mod webp_mux;

pub use backend::{BackendError, CarriedMetadata, ImageBackend};
pub use calculations::fit_within;
pub use params::{ConvertParams, Quality, ThumbnailParams};
pub use rust_backend::RustBackend;
