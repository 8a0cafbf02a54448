//! # media-prep
//!
//! Batch preparation of a personal site's media: photos become lossy WebP
//! with thumbnails and a JSON gallery manifest, project PNGs become WebP in
//! place, videos are transcoded with ffmpeg, and technology icons are
//! downloaded.
//!
//! # Architecture: Independent Jobs
//!
//! Every command is a one-shot batch job over a directory. Nothing persists
//! between runs except the files written; the manifest is regenerated from
//! scratch every time.
//!
//! ```text
//! build  =  manifest   favourites/  →  public/photos.json
//!        +  convert    favourites/  →  favourites_webp/
//!
//! projects             public/projects/**/*.png  →  *.webp (in place)
//! webm / nvenc         public/projects/**/*.mp4  →  ffmpeg
//! icons                [icons.urls]              →  public/icons/
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`manifest`] | Lists photos, reads capture dates, writes the sorted JSON manifest |
//! | [`convert`] | Parallel photo → WebP (+ thumbnail) conversion on a rayon pool |
//! | [`pipeline`] | The `build` command: manifest, then convert, with step isolation |
//! | [`projects`] | In-place PNG → WebP for project assets, with URL mapping |
//! | [`video`] | ffmpeg probing and VP9/NVENC transcodes |
//! | [`icons`] | Icon downloads over HTTP |
//! | [`config`] | `media-prep.toml` loading, merging over defaults, validation |
//! | [`metadata`] | EXIF `DateTimeOriginal` → capture date |
//! | [`naming`] | Output file naming from source stems |
//! | [`imaging`] | Decode, lossy WebP encode, ICC/EXIF carry-over |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Metadata Is Carried, Never Invented
//!
//! libwebp's simple encoder drops everything but pixels. The converter reads
//! the source ICC profile and raw EXIF, then re-muxes the encoded bitstream
//! into an extended WebP container carrying exactly those blocks. A source
//! without them yields a plain WebP; nothing is synthesized.
//!
//! ## One Total Sort Order
//!
//! Manifest entries are ordered by a single [`manifest::SortKey`]: dated
//! entries newest first, then undated ones by name. Mixing timestamps and
//! strings under one comparison is avoided entirely.
//!
//! ## Failures Are Values
//!
//! Per-file problems (a corrupt JPEG, an ffmpeg exit code, an HTTP 404) are
//! returned as outcome values, printed, and counted. Only preconditions
//! (missing directory, unusable ffmpeg, bad config) abort a command.

pub mod config;
pub mod convert;
pub mod icons;
pub mod imaging;
pub mod manifest;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod projects;
pub mod video;

#[cfg(test)]
pub(crate) mod test_helpers;
