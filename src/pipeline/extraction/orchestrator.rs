use super::fallback::{is_meaningful, ocr_pdf};
use super::ocr::{default_ocr_engine, extract_text_from_image};
use super::pdf::{extract_pdf_text, PdfTextExtractor};
use super::pdfium::PdfiumRenderer;
use super::types::{
    ExtractedText, ExtractionMethod, FileKind, OcrEngine, PdfExtractor, PdfPageRenderer,
    RawDocument,
};
use crate::config::PipelineConfig;

/// Drives extraction for a single document: the digital text layer first
/// for PDFs, with OCR fallback; OCR directly for images.
/// Uses trait objects for every engine, enabling dependency injection.
pub struct DocumentExtractor {
    ocr_engine: Box<dyn OcrEngine>,
    pdf_extractor: Box<dyn PdfExtractor>,
    pdf_renderer: Box<dyn PdfPageRenderer>,
    config: PipelineConfig,
}

impl DocumentExtractor {
    pub fn new(
        config: PipelineConfig,
        ocr_engine: Box<dyn OcrEngine>,
        pdf_extractor: Box<dyn PdfExtractor>,
        pdf_renderer: Box<dyn PdfPageRenderer>,
    ) -> Self {
        Self {
            ocr_engine,
            pdf_extractor,
            pdf_renderer,
            config,
        }
    }

    /// Production engines: Tesseract (when built with `ocr`), pdf-extract, PDFium.
    pub fn with_defaults(config: PipelineConfig) -> Self {
        let ocr_engine = default_ocr_engine(&config.ocr);
        Self::new(
            config,
            ocr_engine,
            Box::new(PdfTextExtractor),
            Box::new(PdfiumRenderer),
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract text from one document. Never fails: every stage degrades to
    /// empty text, and `ExtractedText::degraded` records that it happened.
    pub fn extract(&self, doc: &RawDocument, try_table_extraction: bool) -> ExtractedText {
        match doc.file_kind {
            FileKind::Pdf => self.extract_pdf(doc, try_table_extraction),
            FileKind::Image => {
                let outcome = extract_text_from_image(
                    &*self.ocr_engine,
                    &doc.path,
                    self.config.ocr.page_seg_mode,
                );
                ExtractedText {
                    source: doc.clone(),
                    degraded: outcome.is_degraded(),
                    text: outcome.into_text(),
                    method: ExtractionMethod::Ocr,
                }
            }
        }
    }

    fn extract_pdf(&self, doc: &RawDocument, try_table_extraction: bool) -> ExtractedText {
        let digital = extract_pdf_text(&*self.pdf_extractor, &doc.path, try_table_extraction);

        if is_meaningful(digital.text(), &self.config.fallback) {
            return ExtractedText {
                source: doc.clone(),
                degraded: digital.is_degraded(),
                text: digital.into_text(),
                method: ExtractionMethod::Digital,
            };
        }

        let digital_degraded = digital.is_degraded();
        tracing::info!(
            file = %doc.filename,
            digital_chars = digital.text().chars().count(),
            "Digital text not meaningful, falling back to OCR"
        );

        let ocr = ocr_pdf(
            &*self.pdf_renderer,
            &*self.ocr_engine,
            &doc.path,
            &self.config.ocr,
        );
        ExtractedText {
            source: doc.clone(),
            degraded: digital_degraded || ocr.is_degraded(),
            text: ocr.into_text(),
            method: ExtractionMethod::Ocr,
        }
    }
}
