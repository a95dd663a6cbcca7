use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use super::table_detect::{detect_tables, render_table, render_tables_in_place};
use super::types::{ExtractionOutcome, PdfExtractor, PdfPage};
use super::ExtractionError;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_pages(
        &self,
        pdf_path: &Path,
        try_table_extraction: bool,
    ) -> Result<Vec<PdfPage>, ExtractionError> {
        let bytes = std::fs::read(pdf_path)?;

        // pdf-extract panics on some malformed inputs instead of erroring.
        let page_texts = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        }))
        .map_err(|_| ExtractionError::PdfParsing("PDF parser panicked on malformed input".into()))?
        .map_err(map_parse_error)?;

        let pages = page_texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let tables = if try_table_extraction {
                    detect_tables(&text)
                } else {
                    vec![]
                };
                PdfPage {
                    page_number: i + 1,
                    text: Some(text),
                    tables,
                }
            })
            .collect();

        Ok(pages)
    }
}

/// Map parse errors, detecting encrypted PDFs.
fn map_parse_error(e: pdf_extract::OutputError) -> ExtractionError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfParsing(msg)
    }
}

/// Concatenate page content in page order.
///
/// When table extraction was requested and a page has tables, its table
/// runs are rendered as pipe-delimited rows in place; the rest of the page
/// text is kept. Pages with empty text contribute nothing, while
/// whitespace-only text is kept as is.
pub fn assemble_pages(pages: &[PdfPage], try_table_extraction: bool) -> String {
    let mut parts: Vec<String> = Vec::new();

    for page in pages {
        let with_tables = try_table_extraction && !page.tables.is_empty();
        match page.text.as_deref() {
            Some(text) if with_tables => parts.push(render_tables_in_place(text)),
            Some(text) if !text.is_empty() => parts.push(text.to_string()),
            Some(_) => {}
            None if with_tables => parts.extend(page.tables.iter().map(render_table)),
            None => {}
        }
    }

    parts.join("\n")
}

/// Extract a PDF's text layer.
/// Any library failure yields empty text for the whole document.
pub fn extract_pdf_text(
    extractor: &dyn PdfExtractor,
    pdf_path: &Path,
    try_table_extraction: bool,
) -> ExtractionOutcome {
    let result = extractor
        .extract_pages(pdf_path, try_table_extraction)
        .map(|pages| {
            tracing::debug!(
                file = %pdf_path.display(),
                pages = pages.len(),
                tables = pages.iter().map(|p| p.tables.len()).sum::<usize>(),
                "Read PDF text layer"
            );
            assemble_pages(&pages, try_table_extraction)
        });
    ExtractionOutcome::from_result(result, &pdf_path.display().to_string())
}


#[cfg(test)]
mod tests {
    use super::test_pdf::make_test_pdf;
    use super::*;
    use crate::pipeline::structuring::{parse_medical_fields, FieldKey};

    fn page(n: usize, text: Option<&str>, tables: Vec<crate::pipeline::extraction::PdfTable>) -> PdfPage {
        PdfPage {
            page_number: n,
            text: text.map(str::to_string),
            tables,
        }
    }

    fn row(cells: &[Option<&str>]) -> Vec<Option<String>> {
        cells.iter().map(|c| c.map(str::to_string)).collect()
    }

    #[test]
    fn extract_text_from_digital_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, make_test_pdf(&["Hello World from the lab"])).unwrap();

        let pages = PdfTextExtractor.extract_pages(&path, false).unwrap();
        assert_eq!(pages.len(), 1);
        let text = pages[0].text.clone().unwrap_or_default();
        assert!(
            text.contains("Hello") || text.contains("World"),
            "Expected text to contain 'Hello' or 'World', got: {text}"
        );
        assert!(pages[0].tables.is_empty());
    }

    #[test]
    fn pages_are_numbered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two.pdf");
        std::fs::write(&path, make_test_pdf(&["First page", "Second page"])).unwrap();

        let pages = PdfTextExtractor.extract_pages(&path, true).unwrap();
        let numbers: Vec<usize> = pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        assert!(PdfTextExtractor.extract_pages(&path, true).is_err());
    }

    #[test]
    fn invalid_pdf_degrades_to_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"%PDF-1.4 truncated").unwrap();

        let outcome = extract_pdf_text(&PdfTextExtractor, &path, true);
        assert!(outcome.is_degraded());
        assert_eq!(outcome.text(), "");
    }

    #[test]
    fn assemble_joins_pages_with_newlines() {
        let pages = vec![
            page(1, Some("Page one"), vec![]),
            page(2, Some(""), vec![]),
            page(3, None, vec![]),
            page(4, Some("Page four"), vec![]),
        ];
        assert_eq!(assemble_pages(&pages, true), "Page one\nPage four");
    }

    #[test]
    fn whitespace_only_page_is_kept() {
        let pages = vec![page(1, Some("A"), vec![]), page(2, Some("  "), vec![]), page(3, Some("B"), vec![])];
        assert_eq!(assemble_pages(&pages, true), "A\n  \nB");
    }

    #[test]
    fn tables_rendered_in_place_of_their_lines() {
        let text = "Hemoglobin  13.8\nWBC  7.20  10^3/uL";
        let pages = vec![
            page(1, Some(text), detect_tables(text)),
            page(2, Some("Comments follow"), vec![]),
        ];
        assert_eq!(
            assemble_pages(&pages, true),
            "Hemoglobin | 13.8 | \nWBC | 7.20 | 10^3/uL\nComments follow"
        );
    }

    #[test]
    fn mixed_page_keeps_lines_outside_tables() {
        let text = "Patient: Jane Doe    Age: 45\n\
                    Doctor: Dr Who    Ward: 3\n\
                    Hemoglobin 13.8 g/dL\n\
                    Glucose 98.5 mg/dL";
        let pages = vec![page(1, Some(text), detect_tables(text))];
        let assembled = assemble_pages(&pages, true);

        assert!(assembled.starts_with("Patient: Jane Doe | Age: 45\nDoctor: Dr Who | Ward: 3"));
        let fields = parse_medical_fields(&assembled);
        assert_eq!(fields.get(FieldKey::Hemoglobin), Some("13.8"));
        assert_eq!(fields.get(FieldKey::Glucose), Some("98.5"));
    }

    #[test]
    fn tables_ignored_without_flag() {
        let table = vec![row(&[Some("A"), Some("1")]), row(&[Some("B"), Some("2")])];
        let pages = vec![page(1, Some("A  1\nB  2"), vec![table])];
        assert_eq!(assemble_pages(&pages, false), "A  1\nB  2");
    }

    #[test]
    fn each_table_on_a_page_is_appended() {
        let t1 = vec![row(&[Some("A"), Some("1")]), row(&[Some("B"), Some("2")])];
        let t2 = vec![row(&[Some("C"), Some("3")]), row(&[Some("D"), Some("4")])];
        let pages = vec![page(1, None, vec![t1, t2])];
        assert_eq!(assemble_pages(&pages, true), "A | 1\nB | 2\nC | 3\nD | 4");
    }
}
