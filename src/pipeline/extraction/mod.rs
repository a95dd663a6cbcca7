pub mod types;
pub mod preprocess;
pub mod ocr;
pub mod table_detect;
pub mod pdf;
pub mod pdfium;
pub mod fallback;
pub mod orchestrator;

pub use types::*;
pub use preprocess::*;
pub use ocr::*;
pub use pdf::*;
pub use fallback::*;
pub use orchestrator::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding failed: {0}")]
    ImageDecode(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("PDF is password-protected")]
    PdfEncrypted,

    #[error("Tesseract OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Tessdata not found at: {0}")]
    TessdataNotFound(PathBuf),

    #[error("OCR support not compiled in (enable the `ocr` feature)")]
    OcrUnavailable,
}
