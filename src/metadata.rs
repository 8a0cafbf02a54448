//! Capture-date extraction.
//!
//! Each photo may carry an EXIF `DateTimeOriginal` tag: the moment the shutter
//! fired, written by the camera as `YYYY:MM:DD HH:MM:SS`. This is the only
//! embedded field the gallery cares about; it drives manifest ordering.
//!
//! ## Outcomes
//!
//! | Situation | Result |
//! |---|---|
//! | Tag present, standard format | [`CaptureDate::Parsed`] |
//! | Tag present, anything else | [`CaptureDate::Unparsed`] (raw text, trimmed) |
//! | No tag, no EXIF, unreadable or unsupported file | [`CaptureDate::Missing`] |
//!
//! Extraction never fails. A photo with a broken EXIF block is still a photo;
//! it just sorts after the dated ones.

use crate::imaging::exif;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::Path;

/// EXIF's own timestamp layout.
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// ISO-8601 without timezone, as written to the manifest.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureDate {
    Parsed(NaiveDateTime),
    Unparsed(String),
    Missing,
}

impl CaptureDate {
    /// Classify a raw `DateTimeOriginal` string.
    pub fn from_exif_value(raw: &str) -> Self {
        let raw = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        if raw.is_empty() {
            return CaptureDate::Missing;
        }
        match NaiveDateTime::parse_from_str(raw, EXIF_DATE_FORMAT) {
            Ok(dt) => CaptureDate::Parsed(dt),
            Err(_) => CaptureDate::Unparsed(raw.to_string()),
        }
    }

    /// The manifest's `date` field: ISO-8601, raw text, or `""`.
    pub fn to_manifest_string(&self) -> String {
        match self {
            CaptureDate::Parsed(dt) => dt.format(ISO_DATE_FORMAT).to_string(),
            CaptureDate::Unparsed(raw) => raw.clone(),
            CaptureDate::Missing => String::new(),
        }
    }
}

/// Read the capture date of an image file.
pub fn capture_date(path: &Path) -> CaptureDate {
    match exif::read_date_time_original(path) {
        Some(raw) => {
            let date = CaptureDate::from_exif_value(&raw);
            if let CaptureDate::Unparsed(value) = &date {
                log::debug!("{}: unrecognized DateTimeOriginal {value:?}", path.display());
            }
            date
        }
        None => CaptureDate::Missing,
    }
}

/// ISO-8601 shapes accepted when reading a `date` back: `T` or space
/// separator, optional fractional seconds, optional seconds.
const ISO_READ_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a manifest `date` field back into a timestamp.
///
/// Besides the format this crate writes, raw values that are already
/// ISO-8601 are recognized: other separators, RFC 3339 with an offset (kept
/// as local wall time), and a bare date (midnight).
pub fn parse_manifest_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    ISO_READ_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_dated_jpeg, create_test_jpeg};

    #[test]
    fn standard_value_is_parsed() {
        let date = CaptureDate::from_exif_value("2023:04:05 12:30:00");
        assert!(matches!(date, CaptureDate::Parsed(_)));
        assert_eq!(date.to_manifest_string(), "2023-04-05T12:30:00");
    }

    #[test]
    fn nonstandard_value_kept_raw() {
        let date = CaptureDate::from_exif_value("  sometime in 2019\0");
        assert_eq!(date, CaptureDate::Unparsed("sometime in 2019".to_string()));
        assert_eq!(date.to_manifest_string(), "sometime in 2019");
    }

    #[test]
    fn blank_value_is_missing() {
        assert_eq!(CaptureDate::from_exif_value("\0\0  "), CaptureDate::Missing);
        assert_eq!(CaptureDate::Missing.to_manifest_string(), "");
    }

    #[test]
    fn impossible_calendar_date_is_unparsed() {
        // Cameras with unset clocks write all zeros
        let date = CaptureDate::from_exif_value("0000:00:00 00:00:00");
        assert_eq!(
            date,
            CaptureDate::Unparsed("0000:00:00 00:00:00".to_string())
        );
    }

    #[test]
    fn capture_date_from_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("dated.jpg");
        create_dated_jpeg(&path, "2023:04:05 12:30:00");

        assert_eq!(
            capture_date(&path).to_manifest_string(),
            "2023-04-05T12:30:00"
        );
    }

    #[test]
    fn capture_date_without_exif_is_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("plain.jpg");
        create_test_jpeg(&path, 8, 8);

        assert_eq!(capture_date(&path), CaptureDate::Missing);
    }

    #[test]
    fn capture_date_of_garbage_is_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"garbage").unwrap();

        assert_eq!(capture_date(&path), CaptureDate::Missing);
        assert_eq!(
            capture_date(&tmp.path().join("absent.jpg")),
            CaptureDate::Missing
        );
    }

    #[test]
    fn manifest_date_round_trip() {
        let parsed = parse_manifest_date("2023-04-05T12:30:00").unwrap();
        assert_eq!(
            CaptureDate::Parsed(parsed).to_manifest_string(),
            "2023-04-05T12:30:00"
        );
        assert_eq!(parse_manifest_date(""), None);
        assert_eq!(parse_manifest_date("2023:04:05 12:30:00"), None);
    }

    #[test]
    fn manifest_date_accepts_other_iso_shapes() {
        let expected = parse_manifest_date("2023-04-05T12:30:00");
        assert!(expected.is_some());
        for raw in [
            "2023-04-05 12:30:00",
            "2023-04-05T12:30",
            "2023-04-05T12:30:00.000",
            "2023-04-05T12:30:00+02:00",
            "2023-04-05T12:30:00Z",
        ] {
            assert_eq!(parse_manifest_date(raw), expected, "{raw}");
        }
        assert_eq!(
            parse_manifest_date("2023-04-05"),
            parse_manifest_date("2023-04-05T00:00:00")
        );
        assert_eq!(parse_manifest_date("sometime in 2019"), None);
    }
}
