//! Image encoding: rendered page → JPEG bytes, and bytes → base64 `ImageData`.
//!
//! Pages are stored as JPEG rather than PNG: statements are text on flat
//! backgrounds, so a quality-80 JPEG stays perfectly legible at a third of
//! the payload, and request size is what bounds throughput against the
//! service. `detail: "high"` instructs GPT-4-class models to use the full
//! image tile budget; without it small statement print is lost.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page as JPEG at the given quality.
///
/// pdfium bitmaps carry an alpha channel; JPEG has none, so the image is
/// flattened to RGB first.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let mut encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
    encoder.encode_image(&rgb)?;
    debug!("encoded page → {} JPEG bytes", buf.len());
    Ok(buf)
}

/// Wrap raw image bytes as a base64 attachment for the service request.
pub fn to_image_data(bytes: &[u8], media_type: &str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    ImageData::new(b64, media_type).with_detail("high")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image_roundtrips() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(12, 8, Rgba([0, 0, 255, 255])));
        let jpeg = encode_jpeg(&img, 80).expect("encode should succeed");
        assert!(!jpeg.is_empty());
        let decoded = image::load_from_memory(&jpeg).expect("valid JPEG");
        assert_eq!(decoded.width(), 12);
        assert_eq!(decoded.height(), 8);
    }

    #[test]
    fn image_data_carries_media_type_and_base64() {
        let data = to_image_data(&[0xFF, 0xD8, 0xFF], "image/jpeg");
        assert_eq!(data.mime_type, "image/jpeg");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, vec![0xFF, 0xD8, 0xFF]);
    }
}
