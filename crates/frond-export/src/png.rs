//! PNG encoding of composited output buffers.
//!
//! Pure function: RGBA pixels in, PNG bytes out. Where those bytes go
//! (local file, remote endpoint) is the sink's business.

use image::ImageEncoder;

use frond_pipeline::RgbaImage;

/// Encode an RGBA buffer as PNG bytes.
///
/// # Errors
///
/// Returns the underlying [`image::ImageError`] if encoding fails.
pub fn encode_png(buffer: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut bytes);
    encoder.write_image(
        buffer.as_raw(),
        buffer.width(),
        buffer.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}
