//! Batch document processing.
//!
//! Walks an input directory and drives each supported file through
//! extraction and field parsing. Per-file failures never abort the batch:
//! extraction degrades to empty text, so every recognized file yields one
//! record.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::pipeline::extraction::orchestrator::DocumentExtractor;
use crate::pipeline::extraction::types::{ExtractedText, RawDocument};
use crate::pipeline::storage::StorageError;
use crate::pipeline::structuring::{parse_medical_fields, ParsedFields};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during batch processing.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Cannot read input directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ingestion failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Usage: {0}")]
    Usage(String),
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One processed input file, handed to output and ingestion.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub filename: String,
    pub timestamp: DateTime<Local>,
    pub raw_text: ExtractedText,
    pub parsed_fields: ParsedFields,
}

impl ProcessedDocument {
    /// ISO-8601 processing time, as written to records and chunk metadata.
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339()
    }

    pub fn to_record(&self) -> DocumentRecord {
        DocumentRecord {
            filename: self.filename.clone(),
            timestamp: self.timestamp_iso(),
            raw_text: self.raw_text.text.clone(),
            parsed_fields: self.parsed_fields.to_string_map(),
        }
    }
}

/// Serialized output record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub filename: String,
    pub timestamp: String,
    pub raw_text: String,
    pub parsed_fields: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Processes every supported file in a directory, one at a time.
pub struct BatchProcessor {
    extractor: DocumentExtractor,
}

impl BatchProcessor {
    pub fn new(extractor: DocumentExtractor) -> Self {
        Self { extractor }
    }

    /// Process a directory in listing order (not sorted).
    ///
    /// Only a failure to list the directory itself is an error.
    pub fn process_directory(&self, input_dir: &Path) -> Result<Vec<ProcessedDocument>, ProcessingError> {
        let entries = std::fs::read_dir(input_dir).map_err(|source| ProcessingError::ReadDir {
            path: input_dir.to_path_buf(),
            source,
        })?;

        let mut documents = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(dir = %input_dir.display(), error = %e, "Unreadable directory entry, skipping");
                    continue;
                }
            };

            let path = entry.path();
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                tracing::debug!(path = %path.display(), "Skipping subdirectory");
                continue;
            }

            if let Some(doc) = self.process_file(&path) {
                documents.push(doc);
            }
        }

        tracing::info!(
            dir = %input_dir.display(),
            documents = documents.len(),
            "Batch processing complete"
        );
        Ok(documents)
    }

    /// Process one file; `None` when its extension is unsupported.
    pub fn process_file(&self, path: &Path) -> Option<ProcessedDocument> {
        let Some(raw) = RawDocument::from_path(path) else {
            tracing::info!(file = %path.display(), "Skipping unsupported file type");
            return None;
        };

        tracing::info!(file = %raw.filename, kind = raw.file_kind.as_str(), "Processing document");

        let extracted = self.extractor.extract(&raw, true);
        let parsed_fields = parse_medical_fields(&extracted.text);

        tracing::info!(
            file = %raw.filename,
            method = ?extracted.method,
            degraded = extracted.degraded,
            chars = extracted.text.len(),
            fields = parsed_fields.len(),
            "Document processed"
        );

        Some(ProcessedDocument {
            filename: raw.filename.clone(),
            timestamp: Local::now(),
            raw_text: extracted,
            parsed_fields,
        })
    }
}

/// Write documents as a pretty-printed JSON array of records.
pub fn write_records<W: Write>(documents: &[ProcessedDocument], writer: W) -> Result<(), ProcessingError> {
    let records: Vec<DocumentRecord> = documents.iter().map(ProcessedDocument::to_record).collect();
    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::extraction::ocr::MockOcrEngine;
    use crate::pipeline::extraction::pdf::test_pdf::make_test_pdf;
    use crate::pipeline::extraction::pdf::PdfTextExtractor;
    use crate::pipeline::extraction::pdfium::MockPdfPageRenderer;
    use crate::pipeline::structuring::FieldKey;

    fn build_test_processor(ocr_text: &str) -> BatchProcessor {
        BatchProcessor::new(DocumentExtractor::new(
            PipelineConfig::default(),
            Box::new(MockOcrEngine::new(ocr_text)),
            Box::new(PdfTextExtractor),
            Box::new(MockPdfPageRenderer::new(1)),
        ))
    }

    fn write_jpeg(path: &Path) {
        image::RgbImage::from_pixel(16, 16, image::Rgb([240, 240, 240]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn processes_pdf_and_image_skips_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.pdf"), make_test_pdf(&["@@"])).unwrap();
        write_jpeg(&dir.path().join("photo.jpg"));
        std::fs::write(dir.path().join("notes.txt"), "Hemoglobin 13.8").unwrap();

        let processor = build_test_processor("Hemoglobin: 13.8 (11.5 - 16.5)");
        let docs = processor.process_directory(dir.path()).unwrap();

        assert_eq!(docs.len(), 2);
        let mut names: Vec<&str> = docs.iter().map(|d| d.filename.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["photo.jpg", "report.pdf"]);
        for doc in &docs {
            assert!(!doc.timestamp_iso().is_empty());
            assert_eq!(doc.parsed_fields.get(FieldKey::Hemoglobin), Some("13.8"));
        }
    }

    #[test]
    fn garbled_pdf_text_is_replaced_by_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, make_test_pdf(&["#% ~ @"])).unwrap();

        let processor = build_test_processor("Glucose 98.5 mg/dL");
        let doc = processor.process_file(&path).unwrap();

        assert_ne!(doc.raw_text.text.trim(), "#% ~ @");
        assert_eq!(doc.raw_text.text, "Glucose 98.5 mg/dL");
        assert_eq!(doc.parsed_fields.get(FieldKey::Glucose), Some("98.5"));
    }

    #[test]
    fn extension_matching_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PHOTO.JPEG");
        write_jpeg(&path);

        let doc = build_test_processor("ESR 12.00").process_file(&path).unwrap();
        assert_eq!(doc.filename, "PHOTO.JPEG");
        assert_eq!(doc.parsed_fields.get(FieldKey::Esr), Some("12.00"));
    }

    #[test]
    fn unreadable_image_still_yields_record() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not an image").unwrap();

        let docs = build_test_processor("unused").process_directory(dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].raw_text.text, "");
        assert!(docs[0].raw_text.degraded);
        assert!(docs[0].parsed_fields.is_empty());
    }

    #[test]
    fn subdirectories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();
        let docs = build_test_processor("x").process_directory(dir.path()).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_test_processor("x")
            .process_directory(&dir.path().join("absent"))
            .unwrap_err();
        assert!(matches!(err, ProcessingError::ReadDir { .. }));
    }

    #[test]
    fn records_serialize_with_flat_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cbc.png");
        image::GrayImage::from_pixel(8, 8, image::Luma([255u8]))
            .save(&path)
            .unwrap();
        let doc = build_test_processor("WBC 7.20\nRBC 4.50")
            .process_file(&path)
            .unwrap();

        let mut buf = Vec::new();
        write_records(&[doc], &mut buf).unwrap();
        let records: Vec<DocumentRecord> = serde_json::from_slice(&buf).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "cbc.png");
        assert_eq!(records[0].raw_text, "WBC 7.20\nRBC 4.50");
        assert_eq!(records[0].parsed_fields["wbc_count"], "7.20");
        assert_eq!(records[0].parsed_fields["rbc_count"], "4.50");
        assert!(chrono::DateTime::parse_from_rfc3339(&records[0].timestamp).is_ok());
    }
}
