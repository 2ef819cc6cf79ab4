//! Image encoding: `RgbaImage` → PNG or JPEG bytes wrapped in [`EncodedImage`].
//!
//! PNG is lossless and keeps the alpha channel. JPEG has no alpha, so the
//! bitmap is flattened to RGB first. The `image` crate's JPEG encoder takes
//! quality on a 1–100 scale, which is the user-facing 10–100 value directly
//! (the same point as `quality / 100` on a 0–1 scale).

use crate::config::OutputFormat;
use crate::error::CaptureError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// An encoded bitmap ready to be stored or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>` for inline previews.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Encode a bitmap in the requested format.
///
/// `quality` is ignored for PNG. Deterministic for identical input; there is
/// no retry, any encoder error is returned as [`CaptureError::Encoding`].
pub fn encode(bitmap: &RgbaImage, format: OutputFormat, quality: u8) -> Result<EncodedImage, CaptureError> {
    let (width, height) = bitmap.dimensions();
    if width == 0 || height == 0 {
        return Err(CaptureError::Encoding(format!(
            "cannot encode an empty {width}x{height} bitmap"
        )));
    }

    let mut buf = Vec::new();
    match format {
        OutputFormat::Png => {
            bitmap
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        }
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(bitmap.clone()).into_rgb8();
            JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
                .encode_image(&rgb)
                .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        }
    }

    debug!(
        "Encoded {}x{} bitmap → {} bytes {}",
        width,
        height,
        buf.len(),
        format
    );

    Ok(EncodedImage {
        bytes: buf,
        format,
        width,
        height,
    })
}

/// Encode on the blocking pool; compression is CPU-bound and large captures
/// would otherwise stall the async executor.
pub async fn encode_blocking(
    bitmap: RgbaImage,
    format: OutputFormat,
    quality: u8,
) -> Result<EncodedImage, CaptureError> {
    tokio::task::spawn_blocking(move || encode(&bitmap, format, quality))
        .await
        .map_err(|e| CaptureError::Internal(format!("Encode task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 7) as u8, (y * 3) as u8, 128, 255]))
    }

    #[test]
    fn png_round_trips_dimensions() {
        let img = gradient(40, 30);
        let enc = encode(&img, OutputFormat::Png, 10).unwrap();
        assert_eq!(&enc.bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&enc.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
        assert_eq!(decoded.to_rgba8(), img, "png must be lossless");
    }

    #[test]
    fn png_ignores_quality() {
        let img = gradient(20, 20);
        let a = encode(&img, OutputFormat::Png, 10).unwrap();
        let b = encode(&img, OutputFormat::Png, 100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn jpeg_quality_changes_size() {
        let img = gradient(128, 128);
        let low = encode(&img, OutputFormat::Jpeg, 10).unwrap();
        let high = encode(&img, OutputFormat::Jpeg, 100).unwrap();
        assert_eq!(&low.bytes[..2], &[0xFF, 0xD8]);
        assert!(low.bytes.len() < high.bytes.len());
    }

    #[test]
    fn encoding_is_deterministic() {
        let img = gradient(64, 48);
        let a = encode(&img, OutputFormat::Jpeg, 75).unwrap();
        let b = encode(&img, OutputFormat::Jpeg, 75).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn empty_bitmap_is_an_encoding_error() {
        let img = RgbaImage::new(0, 10);
        assert!(matches!(
            encode(&img, OutputFormat::Png, 90),
            Err(CaptureError::Encoding(_))
        ));
    }

    #[test]
    fn data_uri_prefix() {
        let enc = encode(&gradient(4, 4), OutputFormat::Png, 90).unwrap();
        let uri = enc.to_data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));
        let payload = uri.trim_start_matches("data:image/png;base64,");
        assert_eq!(STANDARD.decode(payload).unwrap(), enc.bytes);
    }
}
