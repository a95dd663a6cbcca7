//! PDF page rendering via Google PDFium.
//!
//! Renders PDF pages to raster images for the OCR fallback pass.
//!
//! `PdfiumRenderer` is stateless (`Send + Sync`). Each operation creates
//! a fresh `Pdfium` instance because the upstream type is `!Send`.
//! The OS caches `dlopen`/`LoadLibrary` calls, so repeat loads are near-free.

use std::path::Path;

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::types::PdfPageRenderer;
use super::ExtractionError;

/// Maximum dimension (width or height) for rendered page images.
/// Prevents OOM on extremely large pages or absurd DPI settings.
const MAX_DIMENSION_PX: u32 = 4096;

/// PDF points per inch (standard PDF unit).
const POINTS_PER_INCH: f32 = 72.0;

/// Renders PDF pages using Google PDFium.
///
/// The library is located lazily on each call, so constructing a renderer
/// never fails; a missing library surfaces as `PdfRendering` at use.
pub struct PdfiumRenderer;

/// Load the PDFium dynamic library.
///
/// Discovery order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path)
/// 2. Alongside the running executable
/// 3. System library search paths
fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            ExtractionError::PdfRendering {
                page: 0,
                reason: format!("Failed to load PDFium from {path}: {e}"),
            }
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let lib_path =
            Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            debug!(dir = %exe_dir.display(), "Loaded PDFium next to executable");
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings =
        Pdfium::bind_to_system_library().map_err(|e| ExtractionError::PdfRendering {
            page: 0,
            reason: format!(
                "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
            ),
        })?;
    Ok(Pdfium::new(bindings))
}

/// Map PDF load errors, detecting encrypted PDFs.
fn map_load_error(e: PdfiumError) -> ExtractionError {
    let msg = format!("{e}");
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfRendering {
            page: 0,
            reason: format!("Failed to load PDF: {e}"),
        }
    }
}

/// Pixel size of a page rendered at `dpi`, scaled down so the longer
/// side never exceeds `MAX_DIMENSION_PX`. Each side is at least 1px.
fn render_size(width_pt: f32, height_pt: f32, dpi: u32) -> (u32, u32) {
    let mut scale = dpi as f32 / POINTS_PER_INCH;
    let longest_px = width_pt.max(height_pt) * scale;
    if longest_px > MAX_DIMENSION_PX as f32 {
        scale *= MAX_DIMENSION_PX as f32 / longest_px;
    }
    let to_px = |points: f32| ((points * scale).round() as u32).clamp(1, MAX_DIMENSION_PX);
    (to_px(width_pt), to_px(height_pt))
}

impl PdfPageRenderer for PdfiumRenderer {
    fn render_pages(
        &self,
        pdf_path: &Path,
        dpi: u32,
        visit: &mut dyn FnMut(usize, DynamicImage),
    ) -> Result<usize, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(map_load_error)?;

        let mut rendered = 0;
        for (page_index, page) in document.pages().iter().enumerate() {
            let (target_w, target_h) =
                render_size(page.width().value, page.height().value, dpi);
            if target_w == MAX_DIMENSION_PX || target_h == MAX_DIMENSION_PX {
                warn!(
                    page = page_index,
                    width = target_w,
                    height = target_h,
                    "Page dimensions capped to {MAX_DIMENSION_PX}px",
                );
            }

            let config = PdfRenderConfig::new()
                .set_target_width(target_w as i32)
                .set_maximum_height(target_h as i32);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| ExtractionError::PdfRendering {
                    page: page_index,
                    reason: format!("Rendering failed: {e}"),
                })?;

            debug!(page = page_index, width = target_w, height = target_h, "Rendered PDF page");
            visit(page_index, bitmap.as_image());
            rendered += 1;
        }

        Ok(rendered)
    }
}

/// Mock renderer producing blank pages, or failing when `page_count` is `None`.
///
/// Used by orchestrator and processor tests that need a PdfPageRenderer
/// without requiring the actual PDFium binary.
pub struct MockPdfPageRenderer {
    page_count: Option<usize>,
}

impl MockPdfPageRenderer {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count: Some(page_count),
        }
    }

    pub fn failing() -> Self {
        Self { page_count: None }
    }
}

impl PdfPageRenderer for MockPdfPageRenderer {
    fn render_pages(
        &self,
        _pdf_path: &Path,
        _dpi: u32,
        visit: &mut dyn FnMut(usize, DynamicImage),
    ) -> Result<usize, ExtractionError> {
        let count = self.page_count.ok_or_else(|| ExtractionError::PdfRendering {
            page: 0,
            reason: "mock renderer failure".into(),
        })?;
        for i in 0..count {
            let blank = image::GrayImage::from_pixel(32, 32, image::Luma([255u8]));
            visit(i, DynamicImage::ImageLuma8(blank));
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_page_at_ocr_dpi() {
        assert_eq!(render_size(612.0, 792.0, 300), (2550, 3300));
    }

    #[test]
    fn tabloid_page_is_capped_on_long_side() {
        // 11x17in at 300 DPI would be 3300x5100.
        let (w, h) = render_size(792.0, 1224.0, 300);
        assert_eq!(h, MAX_DIMENSION_PX);
        assert_eq!(w, (3300.0f32 * 4096.0 / 5100.0).round() as u32);
    }

    #[test]
    fn degenerate_page_still_renders_a_pixel() {
        assert_eq!(render_size(0.0, 0.0, 300), (1, 1));
    }

    #[test]
    fn mock_renders_every_page_in_order() {
        let mut seen = Vec::new();
        let count = MockPdfPageRenderer::new(3)
            .render_pages(Path::new("x.pdf"), 300, &mut |i, _| seen.push(i))
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn failing_mock_errors() {
        let err = MockPdfPageRenderer::failing()
            .render_pages(Path::new("x.pdf"), 300, &mut |_, _| {})
            .unwrap_err();
        assert!(matches!(err, ExtractionError::PdfRendering { page: 0, .. }));
    }
}
