use std::path::Path;

use super::ocr::recognize_text;
use super::preprocess::preprocess_for_ocr;
use super::types::{ExtractionOutcome, OcrEngine, PdfPageRenderer};
use crate::config::{FallbackConfig, OcrConfig};

/// Whether extracted text looks like real content rather than garbled output.
///
/// Meaningful iff the trimmed text is longer than `threshold` chars and more
/// than `ratio` of all chars are alphanumeric. Empty text is never meaningful.
pub fn is_text_meaningful(text: &str, threshold: usize, ratio: f64) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    if text.trim().chars().count() <= threshold {
        return false;
    }
    let alnum = text.chars().filter(|c| c.is_alphanumeric()).count();
    alnum as f64 / total as f64 > ratio
}

/// `is_text_meaningful` with configured thresholds.
pub fn is_meaningful(text: &str, config: &FallbackConfig) -> bool {
    is_text_meaningful(text, config.threshold, config.ratio)
}

/// Re-extract a PDF by rendering every page and running OCR on each.
///
/// Page texts are concatenated in page order. A rendering failure degrades
/// the whole pass to empty text; an OCR failure only blanks its page.
pub fn ocr_pdf(
    renderer: &dyn PdfPageRenderer,
    engine: &dyn OcrEngine,
    pdf_path: &Path,
    config: &OcrConfig,
) -> ExtractionOutcome {
    let mut text = String::new();
    let mut failures = Vec::new();

    let rendered = renderer.render_pages(pdf_path, config.dpi, &mut |page_index, image| {
        let processed = preprocess_for_ocr(&image);
        let context = format!("{} page {}", pdf_path.display(), page_index + 1);
        match recognize_text(engine, &processed, config.page_seg_mode, &context) {
            ExtractionOutcome::Degraded(e) => failures.push(e),
            outcome => text.push_str(&outcome.into_text()),
        }
    });

    match rendered {
        Err(e) => ExtractionOutcome::degraded(e, &pdf_path.display().to_string()),
        Ok(pages) => {
            tracing::debug!(
                file = %pdf_path.display(),
                pages,
                failed_pages = failures.len(),
                chars = text.len(),
                "OCR pass complete"
            );
            if failures.is_empty() {
                ExtractionOutcome::Extracted(text)
            } else {
                ExtractionOutcome::Partial { text, failures }
            }
        }
    }
}
