//! WebP RIFF container reading and metadata muxing.
//!
//! libwebp's one-shot encoder emits a bare container: `RIFF` + `WEBP` + a
//! single `VP8 ` (lossy) chunk, or `VP8X` + `ALPH` + `VP8 ` when the source
//! has alpha. Carrying an ICC profile or EXIF block requires the extended
//! layout:
//!
//! ```text
//! RIFF <size> WEBP
//!   VP8X  flags + canvas size   (required first)
//!   ICCP  color profile         (if present, right after VP8X)
//!   ALPH  alpha plane           (lossy + alpha only)
//!   VP8   / VP8L bitstream
//!   EXIF  metadata              (after the image data)
//! ```
//!
//! [`embed_metadata`] rebuilds that layout around an encoded bitstream. When
//! there is no metadata to carry the input is returned untouched, so outputs
//! never gain blocks their source did not have.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MuxError {
    #[error("not a RIFF/WEBP container")]
    NotWebp,
    #[error("chunk {0} overruns the container")]
    Truncated(String),
    #[error("no image bitstream chunk found")]
    MissingBitstream,
    #[error("canvas {0}x{1} exceeds the 24-bit VP8X limit")]
    CanvasTooLarge(u32, u32),
}

/// One RIFF chunk, borrowed from the container it was parsed out of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub fourcc: [u8; 4],
    pub payload: &'a [u8],
}

impl Chunk<'_> {
    fn name(&self) -> String {
        String::from_utf8_lossy(&self.fourcc).into_owned()
    }
}

const FLAG_ICC: u8 = 0x20;
const FLAG_ALPHA: u8 = 0x10;
const FLAG_EXIF: u8 = 0x08;

/// VP8X canvas fields are 24-bit "minus one" values.
const MAX_CANVAS: u32 = 1 << 24;

/// Split a WebP file into its chunks (excluding the RIFF header).
pub fn parse_chunks(data: &[u8]) -> Result<Vec<Chunk<'_>>, MuxError> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WEBP" {
        return Err(MuxError::NotWebp);
    }

    let riff_size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    let end = (8 + riff_size).min(data.len());

    let mut chunks = Vec::new();
    let mut pos = 12;
    while pos + 8 <= end {
        let fourcc: [u8; 4] = [data[pos], data[pos + 1], data[pos + 2], data[pos + 3]];
        let size = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
            as usize;
        let start = pos + 8;
        let stop = start + size;
        if stop > end {
            return Err(MuxError::Truncated(
                String::from_utf8_lossy(&fourcc).into_owned(),
            ));
        }
        chunks.push(Chunk {
            fourcc,
            payload: &data[start..stop],
        });
        // Payloads are padded to even length
        pos = stop + (size % 2);
    }
    Ok(chunks)
}

/// Serialize chunks into a complete `RIFF`/`WEBP` file.
pub fn write_riff(chunks: &[Chunk<'_>]) -> Vec<u8> {
    let body_len: usize = chunks
        .iter()
        .map(|c| 8 + c.payload.len() + c.payload.len() % 2)
        .sum();

    let mut out = Vec::with_capacity(12 + body_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((4 + body_len) as u32).to_le_bytes());
    out.extend_from_slice(b"WEBP");
    for chunk in chunks {
        out.extend_from_slice(&chunk.fourcc);
        out.extend_from_slice(&(chunk.payload.len() as u32).to_le_bytes());
        out.extend_from_slice(chunk.payload);
        if chunk.payload.len() % 2 == 1 {
            out.push(0);
        }
    }
    out
}

/// Build the 10-byte VP8X payload.
fn vp8x_payload(flags: u8, width: u32, height: u32) -> [u8; 10] {
    let w = (width - 1).to_le_bytes();
    let h = (height - 1).to_le_bytes();
    [flags, 0, 0, 0, w[0], w[1], w[2], h[0], h[1], h[2]]
}

/// Wrap an encoded WebP with optional ICC and EXIF chunks.
///
/// `width`/`height` are the canvas dimensions of the encoded image.
pub fn embed_metadata(
    encoded: &[u8],
    width: u32,
    height: u32,
    icc: Option<&[u8]>,
    exif: Option<&[u8]>,
) -> Result<Vec<u8>, MuxError> {
    let icc = icc.filter(|b| !b.is_empty());
    let exif = exif.filter(|b| !b.is_empty());
    if icc.is_none() && exif.is_none() {
        return Ok(encoded.to_vec());
    }
    if width == 0 || height == 0 || width > MAX_CANVAS || height > MAX_CANVAS {
        return Err(MuxError::CanvasTooLarge(width, height));
    }

    let chunks = parse_chunks(encoded)?;

    let existing_alpha = chunks
        .iter()
        .find(|c| &c.fourcc == b"VP8X")
        .and_then(|c| c.payload.first())
        .is_some_and(|flags| flags & FLAG_ALPHA != 0);

    let image_chunks: Vec<&Chunk<'_>> = chunks
        .iter()
        .filter(|c| matches!(&c.fourcc, b"ALPH" | b"VP8 " | b"VP8L"))
        .collect();
    if !image_chunks
        .iter()
        .any(|c| matches!(&c.fourcc, b"VP8 " | b"VP8L"))
    {
        return Err(MuxError::MissingBitstream);
    }

    let has_alpha = existing_alpha || image_chunks.iter().any(|c| &c.fourcc == b"ALPH");
    let mut flags = 0;
    if icc.is_some() {
        flags |= FLAG_ICC;
    }
    if has_alpha {
        flags |= FLAG_ALPHA;
    }
    if exif.is_some() {
        flags |= FLAG_EXIF;
    }

    let header = vp8x_payload(flags, width, height);
    let mut out_chunks = vec![Chunk {
        fourcc: *b"VP8X",
        payload: &header,
    }];
    if let Some(icc) = icc {
        out_chunks.push(Chunk {
            fourcc: *b"ICCP",
            payload: icc,
        });
    }
    out_chunks.extend(image_chunks.into_iter().cloned());
    if let Some(exif) = exif {
        out_chunks.push(Chunk {
            fourcc: *b"EXIF",
            payload: exif,
        });
    }

    log::debug!(
        "muxed WebP: {}",
        out_chunks
            .iter()
            .map(Chunk::name)
            .collect::<Vec<_>>()
            .join(" ")
    );

    Ok(write_riff(&out_chunks))
}

/// Whether a WebP file carries the given chunk.
pub fn has_chunk(data: &[u8], fourcc: &[u8; 4]) -> bool {
    parse_chunks(data).is_ok_and(|chunks| chunks.iter().any(|c| &c.fourcc == fourcc))
}
