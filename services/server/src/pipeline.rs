//! Image normalization pipeline
//!
//! Every accepted upload is decoded, flattened to 3-channel RGB (dropping
//! alpha and any embedded EXIF/ICC metadata), downscaled when it exceeds the
//! dimension caps, and re-encoded as JPEG at a fixed quality. The output is
//! deterministic for a given input, so storage size stays predictable.

use image::ImageReader;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::io::Cursor;
use std::time::Duration;
use tokio::task;
use tokio::time::timeout;

use crate::error::AppError;

/// Largest stored width in pixels
pub const MAX_WIDTH: u32 = 3840;
/// Largest stored height in pixels
pub const MAX_HEIGHT: u32 = 2160;
/// Fixed JPEG quality for all stored images
pub const JPEG_QUALITY: u8 = 75;

/// A normalized, encoded image ready for storage
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode, normalize and re-encode an uploaded image.
///
/// CPU-bound; callers on the request path should go through
/// [`normalize_with_timeout`] instead of calling this directly.
pub fn normalize(data: &[u8]) -> Result<NormalizedImage, AppError> {
    let decoded = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|_| AppError::DecodeError)?
        .decode()
        .map_err(|_| AppError::DecodeError)?;

    let mut rgb: RgbImage = decoded.to_rgb8();

    if let Some((new_width, new_height)) = target_dimensions(rgb.width(), rgb.height()) {
        rgb = imageops::resize(&rgb, new_width, new_height, FilterType::Lanczos3);
    }

    let (width, height) = rgb.dimensions();
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JPEG encoding failed: {}", e)))?;

    Ok(NormalizedImage {
        bytes,
        width,
        height,
    })
}

/// Run [`normalize`] on the blocking pool with a wall-clock budget.
///
/// On timeout the blocking task is not cancelled; it finishes in the
/// background while the request fails with `ProcessingTimeout`.
pub async fn normalize_with_timeout(
    data: Vec<u8>,
    budget: Duration,
) -> Result<NormalizedImage, AppError> {
    let work = task::spawn_blocking(move || normalize(&data));
    match timeout(budget, work).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(AppError::Internal(anyhow::anyhow!(
            "normalization task failed: {}",
            join_err
        ))),
        Err(_) => Err(AppError::ProcessingTimeout),
    }
}

/// Compute the output dimensions for an oversized image, or None when the
/// input already fits inside the caps and must not be resampled.
fn target_dimensions(width: u32, height: u32) -> Option<(u32, u32)> {
    if width <= MAX_WIDTH && height <= MAX_HEIGHT {
        return None;
    }

    let aspect_ratio = width as f64 / height as f64;
    let new_width = if width > height {
        MAX_WIDTH
    } else {
        (MAX_HEIGHT as f64 * aspect_ratio).round() as u32
    };
    let new_height = (new_width as f64 / aspect_ratio).round() as u32;

    Some((new_width.max(1), new_height.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([120, 30, 60, 200]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
        buf.into_inner()
    }

    fn decode_output(normalized: &NormalizedImage) -> (u32, u32, ImageFormat) {
        let reader = ImageReader::new(Cursor::new(&normalized.bytes))
            .with_guessed_format()
            .expect("guess format");
        let format = reader.format().expect("recognized format");
        let decoded = reader.decode().expect("decode output");
        (decoded.width(), decoded.height(), format)
    }

    #[test]
    fn test_within_bounds_keeps_dimensions() {
        let normalized = normalize(&png_bytes(640, 480)).expect("normalize");
        assert_eq!((normalized.width, normalized.height), (640, 480));
        let (w, h, format) = decode_output(&normalized);
        assert_eq!((w, h), (640, 480));
        assert_eq!(format, ImageFormat::Jpeg);
    }

    #[test]
    fn test_wide_image_is_capped() {
        // 5000x2000 has aspect 2.5; the width pins to 3840 and the height
        // follows to 1536.
        let normalized = normalize(&png_bytes(5000, 2000)).expect("normalize");
        assert_eq!((normalized.width, normalized.height), (3840, 1536));
        let (w, h, _) = decode_output(&normalized);
        assert_eq!((w, h), (3840, 1536));
    }

    #[test]
    fn test_tall_image_is_capped() {
        // 1000x4000 has aspect 0.25; the height pins to 2160.
        let normalized = normalize(&png_bytes(1000, 4000)).expect("normalize");
        assert_eq!((normalized.width, normalized.height), (540, 2160));
    }

    #[test]
    fn test_alpha_is_flattened() {
        let normalized = normalize(&png_bytes(32, 32)).expect("normalize");
        let reader = ImageReader::new(Cursor::new(&normalized.bytes))
            .with_guessed_format()
            .expect("guess format");
        let decoded = reader.decode().expect("decode output");
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_corrupt_input_is_a_decode_error() {
        assert!(matches!(
            normalize(b"definitely not an image"),
            Err(AppError::DecodeError)
        ));

        // A valid PNG signature followed by garbage purports to be an image
        // but is structurally corrupt.
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0u8; 64]);
        assert!(matches!(normalize(&bytes), Err(AppError::DecodeError)));
    }

    #[test]
    fn test_target_dimensions() {
        // In-bounds images are never resampled, and never upscaled.
        assert_eq!(target_dimensions(100, 100), None);
        assert_eq!(target_dimensions(3840, 2160), None);

        assert_eq!(target_dimensions(5000, 2000), Some((3840, 1536)));
        assert_eq!(target_dimensions(1000, 4000), Some((540, 2160)));
        assert_eq!(target_dimensions(7680, 4320), Some((3840, 2160)));
    }

    #[tokio::test]
    async fn test_normalize_with_timeout_happy_path() {
        let normalized = normalize_with_timeout(png_bytes(64, 64), Duration::from_secs(30))
            .await
            .expect("normalize within budget");
        assert_eq!((normalized.width, normalized.height), (64, 64));
    }
}
