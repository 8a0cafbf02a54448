//! Minimal EXIF locator and reader for JPEG, PNG, and WebP files.
//!
//! Two jobs:
//! - find the raw EXIF payload (a TIFF structure) inside an image container,
//!   so the converter can carry it over verbatim;
//! - read `DateTimeOriginal` (tag 0x9003) out of that payload.
//!
//! Containers:
//! - JPEG: APP1 marker starting with `Exif\0\0`
//! - PNG: `eXIf` chunk
//! - WebP: `EXIF` RIFF chunk (with or without the `Exif\0\0` prefix)
//!
//! Every reader is bounds-checked and returns `None` on malformed input.

use super::webp_mux;
use std::path::Path;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;

/// Read the raw EXIF payload from a file. `None` on any failure.
pub fn read_exif(path: &Path) -> Option<Vec<u8>> {
    let bytes = std::fs::read(path).ok()?;
    find_exif(&bytes).map(<[u8]>::to_vec)
}

/// Locate the raw EXIF payload (TIFF header onwards) in an encoded image,
/// sniffing the container from its magic bytes.
pub fn find_exif(data: &[u8]) -> Option<&[u8]> {
    let payload = if data.starts_with(&[0xFF, 0xD8]) {
        find_jpeg_app1_exif(data)
    } else if data.starts_with(PNG_SIGNATURE) {
        find_png_exif(data)
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        find_webp_exif(data)
    } else {
        None
    }?;

    let payload = payload.strip_prefix(EXIF_HEADER).unwrap_or(payload);
    (!payload.is_empty()).then_some(payload)
}

/// `DateTimeOriginal` from a file, trimmed of padding. `None` when absent.
pub fn read_date_time_original(path: &Path) -> Option<String> {
    let exif = read_exif(path)?;
    date_time_original(&exif)
}

// ---------------------------------------------------------------------------
// JPEG: APP1 segment
// ---------------------------------------------------------------------------

fn find_jpeg_app1_exif(data: &[u8]) -> Option<&[u8]> {
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // Image data starts at SOS; metadata never follows it
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        // Markers without a length field
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }

        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 {
            return None;
        }
        let seg_start = pos + 4;
        let seg_end = (pos + 2 + seg_len).min(data.len());

        if marker == 0xE1 && data[seg_start..seg_end].starts_with(EXIF_HEADER) {
            return Some(&data[seg_start..seg_end]);
        }
        pos += 2 + seg_len;
    }
    None
}

// ---------------------------------------------------------------------------
// PNG: eXIf chunk
// ---------------------------------------------------------------------------

fn find_png_exif(data: &[u8]) -> Option<&[u8]> {
    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= data.len() {
        let len = u32::from_be_bytes(data[pos..pos + 4].try_into().ok()?) as usize;
        let kind = &data[pos + 4..pos + 8];
        let body_start = pos + 8;
        let body_end = body_start.checked_add(len)?;
        if body_end > data.len() {
            return None;
        }
        match kind {
            b"eXIf" => return Some(&data[body_start..body_end]),
            b"IDAT" | b"IEND" => return None,
            _ => {}
        }
        // data + CRC
        pos = body_end + 4;
    }
    None
}

// ---------------------------------------------------------------------------
// WebP: EXIF chunk
// ---------------------------------------------------------------------------

fn find_webp_exif(data: &[u8]) -> Option<&[u8]> {
    webp_mux::parse_chunks(data)
        .ok()?
        .into_iter()
        .find(|chunk| &chunk.fourcc == b"EXIF")
        .map(|chunk| chunk.payload)
}

// ---------------------------------------------------------------------------
// TIFF structure
// ---------------------------------------------------------------------------

/// Byte-order aware, bounds-checked view over a TIFF payload.
struct Tiff<'a> {
    data: &'a [u8],
    big_endian: bool,
}

/// One 12-byte IFD entry.
struct IfdEntry {
    tag: u16,
    typ: u16,
    count: u32,
    /// Absolute offset of the entry's 4-byte value/offset field.
    value_field: usize,
}

impl<'a> Tiff<'a> {
    fn new(data: &'a [u8]) -> Option<Self> {
        let big_endian = match data.get(0..2)? {
            b"MM" => true,
            b"II" => false,
            _ => return None,
        };
        let tiff = Self { data, big_endian };
        (tiff.u16_at(2)? == 42).then_some(tiff)
    }

    fn u16_at(&self, offset: usize) -> Option<u16> {
        let bytes: [u8; 2] = self.data.get(offset..offset + 2)?.try_into().ok()?;
        Some(if self.big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    }

    fn u32_at(&self, offset: usize) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(offset..offset + 4)?.try_into().ok()?;
        Some(if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    }

    fn first_ifd(&self) -> Option<usize> {
        self.u32_at(4).map(|o| o as usize)
    }

    fn entries(&self, ifd_offset: usize) -> Option<Vec<IfdEntry>> {
        let count = self.u16_at(ifd_offset)? as usize;
        (0..count)
            .map(|i| {
                let at = ifd_offset + 2 + i * 12;
                Some(IfdEntry {
                    tag: self.u16_at(at)?,
                    typ: self.u16_at(at + 2)?,
                    count: self.u32_at(at + 4)?,
                    value_field: at + 8,
                })
            })
            .collect()
    }

    fn find(&self, ifd_offset: usize, tag: u16) -> Option<IfdEntry> {
        self.entries(ifd_offset)?
            .into_iter()
            .find(|entry| entry.tag == tag)
    }

    /// ASCII value of an entry; values of four bytes or less are stored inline.
    fn ascii(&self, entry: &IfdEntry) -> Option<String> {
        if entry.typ != TYPE_ASCII {
            return None;
        }
        let len = entry.count as usize;
        let start = if len <= 4 {
            entry.value_field
        } else {
            self.u32_at(entry.value_field)? as usize
        };
        let raw = self.data.get(start..start.checked_add(len)?)?;
        let text = String::from_utf8_lossy(raw);
        let trimmed = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Read `DateTimeOriginal` from a raw EXIF payload.
///
/// Looks in the Exif sub-IFD first (where the tag belongs), then IFD0 for
/// writers that put it in the wrong place.
pub fn date_time_original(exif: &[u8]) -> Option<String> {
    let exif = exif.strip_prefix(EXIF_HEADER).unwrap_or(exif);
    let tiff = Tiff::new(exif)?;
    let ifd0 = tiff.first_ifd()?;

    let from_sub_ifd = tiff
        .find(ifd0, TAG_EXIF_IFD_POINTER)
        .filter(|entry| entry.typ == TYPE_LONG)
        .and_then(|entry| tiff.u32_at(entry.value_field))
        .and_then(|sub_ifd| tiff.find(sub_ifd as usize, TAG_DATE_TIME_ORIGINAL))
        .and_then(|entry| tiff.ascii(&entry));

    from_sub_ifd.or_else(|| {
        tiff.find(ifd0, TAG_DATE_TIME_ORIGINAL)
            .and_then(|entry| tiff.ascii(&entry))
    })
}
