//! Building catalog images from encoded bytes.

use crate::error::EngineError;
use crate::globals::CatalogImage;

/// Decode image bytes (PNG, JPEG, BMP, WebP) into an RGBA catalog entry.
///
/// # Errors
///
/// Returns [`EngineError::EmptyInput`] if `bytes` is empty.
/// Returns [`EngineError::ImageDecode`] if the format is unrecognized or
/// the data is corrupt.
pub fn decode_catalog_image(name: &str, bytes: &[u8]) -> Result<CatalogImage, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::EmptyInput);
    }
    let image = image::load_from_memory(bytes)?;
    log::debug!("decoded catalog image '{name}' ({}x{})", image.width(), image.height());
    Ok(CatalogImage::new(name, image.to_rgba8()))
}
