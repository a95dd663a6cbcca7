use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Image extensions routed to the OCR path (compared lower-cased).
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Broad file categories we handle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    Image,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
        }
    }

    /// Classify by file extension, case-insensitively.
    /// Returns `None` for anything other than PDF/PNG/JPEG.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if ext == "pdf" {
            Some(Self::Pdf)
        } else if SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else {
            None
        }
    }
}

/// One input file, as found in the batch directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawDocument {
    pub filename: String,
    pub file_kind: FileKind,
    pub path: PathBuf,
}

impl RawDocument {
    /// Build from a path, or `None` if the extension is unsupported.
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_kind = FileKind::from_path(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(Self {
            filename,
            file_kind,
            path: path.to_path_buf(),
        })
    }
}

/// How text was extracted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Embedded PDF text layer.
    Digital,
    /// Optical character recognition on a photo or rendered page.
    Ocr,
}

/// Text extracted from a single document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedText {
    pub source: RawDocument,
    pub text: String,
    pub method: ExtractionMethod,
    /// True when a stage failed and contributed empty text instead.
    pub degraded: bool,
}

/// Result of a best-effort extraction stage.
///
/// Stages never abort the batch: failures become empty text, and the
/// cause is logged when the outcome is built.
#[derive(Debug)]
pub enum ExtractionOutcome {
    Extracted(String),
    /// Some pages failed and contributed no text.
    Partial {
        text: String,
        failures: Vec<ExtractionError>,
    },
    Degraded(ExtractionError),
}

impl ExtractionOutcome {
    /// Log the failure and wrap it.
    pub fn degraded(error: ExtractionError, context: &str) -> Self {
        tracing::warn!(context, error = %error, "Extraction degraded to empty text");
        Self::Degraded(error)
    }

    pub fn from_result(result: Result<String, ExtractionError>, context: &str) -> Self {
        match result {
            Ok(text) => Self::Extracted(text),
            Err(e) => Self::degraded(e, context),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Extracted(text) | Self::Partial { text, .. } => text,
            Self::Degraded(_) => "",
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Extracted(_))
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Extracted(text) | Self::Partial { text, .. } => text,
            Self::Degraded(_) => String::new(),
        }
    }
}

/// One table row; `None` is an empty cell.
pub type TableRow = Vec<Option<String>>;
pub type PdfTable = Vec<TableRow>;

/// Per-page output of the PDF library boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfPage {
    pub page_number: usize,
    pub text: Option<String>,
    pub tables: Vec<PdfTable>,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine: Send + Sync {
    /// Recognize text in a preprocessed image using the given Tesseract
    /// page segmentation mode.
    fn recognize(&self, image: &GrayImage, page_seg_mode: u32) -> Result<String, ExtractionError>;
}

/// PDF text-layer extraction abstraction
pub trait PdfExtractor: Send + Sync {
    fn extract_pages(
        &self,
        pdf_path: &Path,
        try_table_extraction: bool,
    ) -> Result<Vec<PdfPage>, ExtractionError>;
}

/// Renders PDF pages to raster images for OCR.
pub trait PdfPageRenderer: Send + Sync {
    /// Render every page in order, handing each image to `visit` as soon as
    /// it is ready. Returns the number of pages rendered.
    fn render_pages(
        &self,
        pdf_path: &Path,
        dpi: u32,
        visit: &mut dyn FnMut(usize, DynamicImage),
    ) -> Result<usize, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_from_extension() {
        assert_eq!(FileKind::from_path(Path::new("a/report.pdf")), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_path(Path::new("scan.PNG")), Some(FileKind::Image));
        assert_eq!(FileKind::from_path(Path::new("scan.Jpeg")), Some(FileKind::Image));
        assert_eq!(FileKind::from_path(Path::new("scan.jpg")), Some(FileKind::Image));
        assert_eq!(FileKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(FileKind::from_path(Path::new("scan.tiff")), None);
        assert_eq!(FileKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn raw_document_keeps_filename() {
        let doc = RawDocument::from_path(Path::new("/data/in/cbc_2024.pdf")).unwrap();
        assert_eq!(doc.filename, "cbc_2024.pdf");
        assert_eq!(doc.file_kind, FileKind::Pdf);
        assert!(RawDocument::from_path(Path::new("/data/in/notes.txt")).is_none());
    }

    #[test]
    fn degraded_outcome_yields_empty_text() {
        let outcome = ExtractionOutcome::degraded(ExtractionError::OcrUnavailable, "test");
        assert!(outcome.is_degraded());
        assert_eq!(outcome.text(), "");
        assert_eq!(outcome.into_text(), "");
    }

    #[test]
    fn partial_outcome_keeps_text_but_is_degraded() {
        let outcome = ExtractionOutcome::Partial {
            text: "page one".into(),
            failures: vec![ExtractionError::OcrProcessing("page two".into())],
        };
        assert!(outcome.is_degraded());
        assert_eq!(outcome.text(), "page one");
    }

    #[test]
    fn from_result_maps_ok_and_err() {
        let ok = ExtractionOutcome::from_result(Ok("text".into()), "test");
        assert!(!ok.is_degraded());
        assert_eq!(ok.into_text(), "text");

        let err = ExtractionOutcome::from_result(Err(ExtractionError::PdfEncrypted), "test");
        assert!(matches!(err, ExtractionOutcome::Degraded(ExtractionError::PdfEncrypted)));
    }
}
