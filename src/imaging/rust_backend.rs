//! Production image backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate, format sniffed from content |
//! | Letterbox composite | [`letterbox`](super::operations::letterbox) (Lanczos3 + Gaussian blur) |
//! | Encode → WebP | `webp` crate (libwebp, lossy) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Persist | [`write_atomic`](crate::write::write_atomic) |
//!
//! The encode step produces the whole file in memory before anything is
//! written, so an encoder failure never leaves a file behind.

use super::backend::{ConvertError, Dimensions, ImageBackend};
use super::operations::letterbox;
use super::params::{ConvertParams, OutputFormat, Quality};
use crate::write::write_atomic;
use image::codecs::avif::AvifEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageReader, RgbImage};
use std::path::Path;

/// Rust-native backend built on the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
///
/// The format is guessed from the file's leading bytes, so catalog entries
/// with missing or wrong extensions still decode.
fn load_image(path: &Path) -> Result<DynamicImage, ConvertError> {
    let decode_error = |message: String| ConvertError::Decode {
        path: path.to_path_buf(),
        message,
    };
    ImageReader::open(path)
        .map_err(|e| decode_error(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_error(e.to_string()))?
        .decode()
        .map_err(|e| decode_error(e.to_string()))
}

/// Encode an RGB frame to the requested codec, entirely in memory.
pub fn encode(
    img: &RgbImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, ConvertError> {
    match format {
        OutputFormat::Webp => encode_webp(img, quality),
        OutputFormat::Avif => encode_avif(img, quality),
    }
}

fn encode_webp(img: &RgbImage, quality: Quality) -> Result<Vec<u8>, ConvertError> {
    let (w, h) = img.dimensions();
    let encoder = webp::Encoder::from_rgb(img.as_raw(), w, h);
    let memory = encoder
        .encode_simple(false, quality.value() as f32)
        .map_err(|e| ConvertError::Encode {
            format: OutputFormat::Webp,
            message: format!("{e:?}"),
        })?;
    Ok(memory.to_vec())
}

/// Encode as AVIF using rav1e (speed=6 for reasonable throughput).
fn encode_avif(img: &RgbImage, quality: Quality) -> Result<Vec<u8>, ConvertError> {
    let mut buf = Vec::new();
    let encoder = AvifEncoder::new_with_speed_quality(&mut buf, 6, quality.value() as u8);
    encoder
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .map_err(|e| ConvertError::Encode {
            format: OutputFormat::Avif,
            message: e.to_string(),
        })?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, ConvertError> {
        if has_avif_extension(path) {
            return identify_avif(path);
        }
        let (width, height) = image::image_dimensions(path).map_err(|e| ConvertError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Dimensions { width, height })
    }

    fn convert(&self, params: &ConvertParams) -> Result<(), ConvertError> {
        let img = load_image(&params.source)?;
        let framed = letterbox(&img, params.frame, params.blur_sigma);
        // The decoded source can be large; release it before encoding
        drop(img);
        let bytes = encode(&framed, params.format, params.quality)?;
        write_atomic(&params.output, &bytes)?;
        Ok(())
    }
}

fn has_avif_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avif"))
}

/// Read AVIF dimensions from the container header without decoding.
fn identify_avif(path: &Path) -> Result<Dimensions, ConvertError> {
    let decode_error = |message: String| ConvertError::Decode {
        path: path.to_path_buf(),
        message,
    };
    let data = std::fs::read(path).map_err(|e| decode_error(e.to_string()))?;
    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(&data))
        .map_err(|e| decode_error(format!("failed to parse AVIF: {e:?}")))?;
    let meta = avif
        .primary_item_metadata()
        .map_err(|e| decode_error(format!("failed to read AVIF metadata: {e:?}")))?;
    Ok(Dimensions {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
    })
}
