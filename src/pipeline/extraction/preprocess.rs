//! Image preprocessing for Tesseract input.
//!
//! Three fixed steps, applied to every page or photo before OCR:
//! grayscale, 3x3 median filter (salt-and-pepper noise), contrast x2.
//! Photos additionally get EXIF orientation applied at decode time.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageOutputFormat};
use imageproc::filter::median_filter;
use tracing::debug;

use super::ExtractionError;
use crate::config::CONTRAST_FACTOR;

/// Median filter radius in both axes (radius 1 = 3x3 window).
const MEDIAN_RADIUS: u32 = 1;

/// Normalize an image for character recognition.
pub fn preprocess_for_ocr(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let denoised = median_filter(&gray, MEDIAN_RADIUS, MEDIAN_RADIUS);
    enhance_contrast(&denoised, CONTRAST_FACTOR)
}

/// Scale each pixel's distance from the image's mean gray level.
///
/// `out = mean + factor * (in - mean)`, truncated and clamped to 0..=255.
/// The mean is rounded to an integer gray level first.
pub fn enhance_contrast(image: &GrayImage, factor: f32) -> GrayImage {
    let Some(mean) = mean_gray_level(image) else {
        return image.clone();
    };

    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let value = mean + factor * (pixel.0[0] as f32 - mean);
        pixel.0[0] = (value as i32).clamp(0, 255) as u8;
    }
    out
}

/// Mean luminance rounded to the nearest integer level, `None` for empty images.
fn mean_gray_level(image: &GrayImage) -> Option<f32> {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return None;
    }
    let sum: u64 = image.pixels().map(|p| p.0[0] as u64).sum();
    Some((sum as f64 / count as f64 + 0.5).floor() as f32)
}

/// Read and decode an image file, applying its EXIF orientation.
pub fn load_image_file(path: &Path) -> Result<DynamicImage, ExtractionError> {
    let bytes = std::fs::read(path)?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| ExtractionError::ImageDecode(format!("{}: {e}", path.display())))?;

    let orientation = read_exif_orientation(&bytes);
    if orientation != 1 {
        debug!(orientation, file = %path.display(), "Applying EXIF orientation");
    }
    Ok(apply_orientation(image, orientation))
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
///
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Encode a grayscale image as PNG bytes for engines that take encoded input.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, ExtractionError> {
    let dynamic = DynamicImage::ImageLuma8(img.clone());
    let mut cursor = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}
