//! Shared test utilities for the media-prep test suite.
//!
//! Synthetic image builders: real encoded JPEG/PNG files produced with the
//! `image` crate, plus hand-assembled EXIF payloads and APP segments so
//! metadata paths can be tested without binary fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let exif = exif_with_date("2023:04:05 12:30:00", false);
//! std::fs::write(&path, jpeg_with_segments(32, 32, Some(&exif), None)).unwrap();
//! ```

use image::{ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;

// =========================================================================
// Encoded images
// =========================================================================

/// A small gradient JPEG, encoded in memory.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Write a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, jpeg_bytes(width, height)).unwrap();
}

/// Write a JPEG whose EXIF carries the given `DateTimeOriginal`.
pub fn create_dated_jpeg(path: &Path, date: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let exif = exif_with_date(date, false);
    std::fs::write(path, jpeg_with_segments(16, 16, Some(&exif), None)).unwrap();
}

/// Write a PNG whose left half is fully transparent.
pub fn write_transparent_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        let alpha = if x < width / 2 { 0 } else { 255 };
        image::Rgba([200, 40, 40, alpha])
    });
    img.save(path).unwrap();
}

// =========================================================================
// Metadata blocks
// =========================================================================

/// Minimal TIFF payload: IFD0 → Exif sub-IFD → `DateTimeOriginal`.
///
/// ```text
/// 0   header (byte order, 42, IFD0 offset = 8)
/// 8   IFD0: 1 entry (0x8769 LONG → 26), next = 0
/// 26  Exif IFD: 1 entry (0x9003 ASCII, count, → 44), next = 0
/// 44  date string + NUL
/// ```
pub fn exif_with_date(date: &str, big_endian: bool) -> Vec<u8> {
    let u16b = |v: u16| {
        if big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    };
    let u32b = |v: u32| {
        if big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    };

    let mut out = Vec::new();
    out.extend_from_slice(if big_endian { b"MM" } else { b"II" });
    out.extend(u16b(42));
    out.extend(u32b(8));

    // IFD0
    out.extend(u16b(1));
    out.extend(u16b(0x8769));
    out.extend(u16b(4));
    out.extend(u32b(1));
    out.extend(u32b(26));
    out.extend(u32b(0));

    // Exif sub-IFD
    out.extend(u16b(1));
    out.extend(u16b(0x9003));
    out.extend(u16b(2));
    out.extend(u32b(date.len() as u32 + 1));
    out.extend(u32b(44));
    out.extend(u32b(0));

    assert_eq!(out.len(), 44);
    out.extend_from_slice(date.as_bytes());
    out.push(0);
    out
}

/// A JPEG with optional APP1 (EXIF) and APP2 (ICC) segments spliced in
/// right after SOI.
pub fn jpeg_with_segments(
    width: u32,
    height: u32,
    exif: Option<&[u8]>,
    icc: Option<&[u8]>,
) -> Vec<u8> {
    let base = jpeg_bytes(width, height);
    let mut out = base[..2].to_vec();

    if let Some(exif) = exif {
        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(exif);
        push_segment(&mut out, 0xE1, &payload);
    }
    if let Some(icc) = icc {
        let mut payload = b"ICC_PROFILE\0".to_vec();
        // sequence number, chunk count
        payload.extend_from_slice(&[1, 1]);
        payload.extend_from_slice(icc);
        push_segment(&mut out, 0xE2, &payload);
    }

    out.extend_from_slice(&base[2..]);
    out
}

fn push_segment(out: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    let len = u16::try_from(payload.len() + 2).unwrap();
    out.extend_from_slice(&[0xFF, marker]);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
}
