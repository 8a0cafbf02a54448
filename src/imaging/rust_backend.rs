//! Production image backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image` crate (pure Rust decoders) |
//! | ICC profile | `image::ImageDecoder::icc_profile` |
//! | EXIF payload | custom [`exif`](super::exif) locator |
//! | Encode → lossy WebP | `webp` crate (libwebp `WebPEncodeRGB[A]`) |
//! | ICC/EXIF → WebP | custom [`webp_mux`](super::webp_mux) VP8X writer |
//! | Thumbnail | `image::DynamicImage::resize_exact` with `Lanczos3` |

use super::backend::{BackendError, CarriedMetadata, ImageBackend};
use super::calculations::fit_within;
use super::params::{ConvertParams, Quality, ThumbnailParams};
use super::{exif, webp_mux};
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Backend built on `image` + libwebp.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

/// A decoded source image plus the metadata blocks it carried.
struct DecodedSource {
    image: DynamicImage,
    icc_profile: Option<Vec<u8>>,
    exif: Option<Vec<u8>>,
}

/// Read and decode an image, keeping its ICC profile and raw EXIF.
fn load_source(path: &Path) -> Result<DecodedSource, BackendError> {
    let bytes = std::fs::read(path)?;

    let mut decoder = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()?
        .into_decoder()?;
    let icc_profile = match decoder.icc_profile() {
        Ok(profile) => profile.filter(|p| !p.is_empty()),
        Err(e) => {
            log::debug!("ignoring unreadable ICC profile in {}: {e}", path.display());
            None
        }
    };
    let image = DynamicImage::from_decoder(decoder)?;
    let exif = exif::find_exif(&bytes).map(<[u8]>::to_vec);

    log::debug!(
        "decoded {} ({}x{}, icc: {}, exif: {})",
        path.display(),
        image.width(),
        image.height(),
        icc_profile.is_some(),
        exif.is_some()
    );

    Ok(DecodedSource {
        image,
        icc_profile,
        exif,
    })
}

/// Lossy-encode pixels with libwebp. Alpha is kept only when the source has it.
fn encode_webp(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let (width, height) = (image.width(), image.height());
    let encoded = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height)
            .encode_simple(false, quality.as_f32())
            .map(|memory| memory.to_vec())
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height)
            .encode_simple(false, quality.as_f32())
            .map(|memory| memory.to_vec())
    };
    encoded.map_err(|e| BackendError::Encode(format!("{e:?}")))
}

/// Encode the full-size image with the source's metadata re-attached.
fn write_converted(
    source: &DecodedSource,
    params: &ConvertParams,
) -> Result<CarriedMetadata, BackendError> {
    let encoded = encode_webp(&source.image, params.quality)?;
    let muxed = webp_mux::embed_metadata(
        &encoded,
        source.image.width(),
        source.image.height(),
        source.icc_profile.as_deref(),
        source.exif.as_deref(),
    )?;
    std::fs::write(&params.output, muxed)?;

    Ok(CarriedMetadata {
        icc_profile: source.icc_profile.is_some(),
        exif: source.exif.is_some(),
    })
}

/// Downscale into the bounding box and encode without metadata.
fn write_thumbnail(image: &DynamicImage, params: &ThumbnailParams) -> Result<(), BackendError> {
    let (width, height) = fit_within(
        (image.width(), image.height()),
        (params.max_width, params.max_height),
    );
    let encoded = if (width, height) == (image.width(), image.height()) {
        encode_webp(image, params.quality)?
    } else {
        let resized = image.resize_exact(width, height, FilterType::Lanczos3);
        encode_webp(&resized, params.quality)?
    };
    std::fs::write(&params.output, encoded)?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn convert(&self, params: &ConvertParams) -> Result<CarriedMetadata, BackendError> {
        let source = load_source(&params.source)?;
        write_converted(&source, params)
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let source = load_source(&params.source)?;
        write_thumbnail(&source.image, params)
    }

    fn convert_with_thumbnail(
        &self,
        params: &ConvertParams,
        thumbnail: &ThumbnailParams,
    ) -> Result<CarriedMetadata, BackendError> {
        let source = load_source(&params.source)?;
        let metadata = write_converted(&source, params)?;
        write_thumbnail(&source.image, thumbnail)?;
        Ok(metadata)
    }
}
