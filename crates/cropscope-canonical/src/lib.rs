#![warn(missing_docs)]
//! # cropscope-canonical
//!
//! ## Purpose
//! Converts arbitrary input images into the single canonical JPEG encoding
//! used for transmission.
//!
//! ## Responsibilities
//! - Decode any supported input encoding at native pixel dimensions.
//! - Re-encode as JPEG at a fixed per-source quality.
//! - Allocate one preview handle per produced asset.
//!
//! ## Data flow
//! File-selection bytes -> [`normalize`] -> [`cropscope_core::ImageAsset`].
//! Captured [`cropscope_core::RawFrame`] -> [`encode_capture_frame`] -> asset
//! with the same shape and invariants.
//!
//! ## Error model
//! Undecodable input fails with [`CanonicalError::Decode`], a user-recoverable
//! condition ("pick another file"). Encoder failures are internal and rare.
//!
//! ## Notes
//! Every file input is forced through decode + re-encode even when it is
//! already JPEG, so the outbound format is always exactly one well-known
//! encoding regardless of what the user selected.

use std::io::Cursor;

use cropscope_core::{CoreError, ImageAsset, PreviewRegistry, RawFrame};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, GenericImageView};
use thiserror::Error;

/// JPEG quality for normalized file uploads.
pub const UPLOAD_JPEG_QUALITY: u8 = 92;

/// JPEG quality for live captures.
///
/// Higher than the upload quality: camera frames are not re-compressed
/// source material.
pub const CAPTURE_JPEG_QUALITY: u8 = 95;

/// Display name given to assets produced from live captures.
pub const CAPTURE_DISPLAY_NAME: &str = "capture.jpg";

/// Normalizes one input image into a canonical JPEG asset.
///
/// Decodes at native pixel dimensions, re-encodes at
/// [`UPLOAD_JPEG_QUALITY`], and allocates one preview handle from
/// `previews`; the caller becomes responsible for releasing it.
///
/// # Errors
/// Returns [`CanonicalError::Decode`] when the input cannot be decoded by
/// the platform image decoder (corrupt file or unsupported codec).
pub fn normalize(
    input: &[u8],
    display_name: &str,
    previews: &PreviewRegistry,
) -> Result<ImageAsset, CanonicalError> {
    let decoded = image::load_from_memory(input).map_err(CanonicalError::Decode)?;
    let (width, height) = decoded.dimensions();
    let rgb = decoded.to_rgb8();

    let jpeg_bytes = encode_jpeg(rgb.as_raw(), width, height, UPLOAD_JPEG_QUALITY)?;
    wrap_asset(jpeg_bytes, display_name, previews)
}

/// Encodes one captured raster snapshot into a canonical JPEG asset.
///
/// The capture path skips the decode step since the source is already a
/// known RGBA raster; output quality is [`CAPTURE_JPEG_QUALITY`] and the
/// asset shape matches [`normalize`] exactly.
pub fn encode_capture_frame(
    frame: &RawFrame,
    previews: &PreviewRegistry,
) -> Result<ImageAsset, CanonicalError> {
    let rgb = drop_alpha(&frame.rgba);
    let jpeg_bytes = encode_jpeg(&rgb, frame.width, frame.height, CAPTURE_JPEG_QUALITY)?;
    wrap_asset(jpeg_bytes, CAPTURE_DISPLAY_NAME, previews)
}

/// Returns the pixel dimensions of encoded image bytes.
///
/// # Errors
/// Returns [`CanonicalError::Decode`] for undecodable bytes.
pub fn decoded_dimensions(bytes: &[u8]) -> Result<(u32, u32), CanonicalError> {
    let decoded = image::load_from_memory(bytes).map_err(CanonicalError::Decode)?;
    Ok(decoded.dimensions())
}

fn encode_jpeg(
    rgb: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, CanonicalError> {
    let mut jpeg_bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut jpeg_bytes), quality);
    encoder
        .encode(rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(CanonicalError::Encode)?;
    Ok(jpeg_bytes)
}

/// Fallback name when the selected file carries a blank one.
const DEFAULT_DISPLAY_NAME: &str = "upload.jpg";

fn wrap_asset(
    jpeg_bytes: Vec<u8>,
    display_name: &str,
    previews: &PreviewRegistry,
) -> Result<ImageAsset, CanonicalError> {
    let display_name = if display_name.trim().is_empty() {
        DEFAULT_DISPLAY_NAME
    } else {
        display_name
    };

    // Allocate only once the encoder has produced valid bytes, so a failed
    // conversion never holds a preview handle.
    let handle = previews.allocate();
    ImageAsset::new(jpeg_bytes, display_name, handle).map_err(CanonicalError::Invariant)
}

fn drop_alpha(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for pixel in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&pixel[..3]);
    }
    rgb
}

/// Canonicalizer error type.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// Input cannot be decoded as an image by the platform decoder.
    #[error("image could not be decoded: {0}")]
    Decode(image::ImageError),
    /// JPEG re-encode failed.
    #[error("jpeg encode failure: {0}")]
    Encode(image::ImageError),
    /// Produced bytes failed core asset validation.
    #[error("canonical asset invariant violated: {0}")]
    Invariant(CoreError),
}
