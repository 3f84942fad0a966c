//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! single-channel luminance raster the energy functions read.

use image::{DynamicImage, GrayImage};

use crate::types::SnaplineError;

/// Decode raw image bytes without converting the color space.
///
/// The CLI decodes once more to crop the full-colour image
/// once a boundary has been traced.
///
/// # Errors
///
/// Returns [`SnaplineError::EmptyInput`] if `bytes` is empty.
/// Returns [`SnaplineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, SnaplineError> {
    if bytes.is_empty() {
        return Err(SnaplineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Decode raw image bytes and convert to grayscale.
///
/// Uses the `image` crate's luminance weighting
/// (`0.299*R + 0.587*G + 0.114*B`).
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_and_grayscale(bytes: &[u8]) -> Result<GrayImage, SnaplineError> {
    decode(bytes).map(|img| img.to_luma8())
}
