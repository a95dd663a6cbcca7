use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::GrayImage;

use super::preprocess::{load_image_file, preprocess_for_ocr};
use super::types::{ExtractionOutcome, OcrEngine};
use super::ExtractionError;
use crate::config::OcrConfig;

/// Tesseract OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct TesseractEngine {
    tessdata_dir: Option<std::path::PathBuf>,
    language: String,
}

#[cfg(feature = "ocr")]
impl TesseractEngine {
    /// Configure from `OcrConfig`. When a tessdata directory is given, the
    /// traineddata for the first requested language must exist there.
    pub fn new(config: &OcrConfig) -> Result<Self, ExtractionError> {
        if let Some(dir) = &config.tessdata_dir {
            let primary = config.language.split('+').next().unwrap_or("eng");
            if !dir.join(format!("{primary}.traineddata")).exists() {
                return Err(ExtractionError::TessdataNotFound(dir.clone()));
            }
        }

        tracing::info!(
            language = %config.language,
            tessdata = ?config.tessdata_dir,
            "Tesseract OCR engine configured"
        );

        Ok(Self {
            tessdata_dir: config.tessdata_dir.clone(),
            language: config.language.clone(),
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &GrayImage, page_seg_mode: u32) -> Result<String, ExtractionError> {
        let png = super::preprocess::encode_png(image)?;

        let datapath = match &self.tessdata_dir {
            Some(dir) => Some(
                dir.to_str()
                    .ok_or_else(|| ExtractionError::OcrInit("Invalid tessdata path".into()))?,
            ),
            None => None,
        };

        let mut tess = tesseract::Tesseract::new(datapath, Some(&self.language))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;
        tess.set_page_seg_mode(page_seg_mode_from_u32(page_seg_mode));

        let mut tess = tess
            .set_image_from_mem(&png)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        tess.get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))
    }
}

/// Map Tesseract's numeric `--psm` values; unknown values use fully automatic.
#[cfg(feature = "ocr")]
fn page_seg_mode_from_u32(mode: u32) -> tesseract::PageSegMode {
    use tesseract::PageSegMode;
    match mode {
        0 => PageSegMode::PsmOsdOnly,
        1 => PageSegMode::PsmAutoOsd,
        2 => PageSegMode::PsmAutoOnly,
        4 => PageSegMode::PsmSingleColumn,
        5 => PageSegMode::PsmSingleBlockVertText,
        6 => PageSegMode::PsmSingleBlock,
        7 => PageSegMode::PsmSingleLine,
        8 => PageSegMode::PsmSingleWord,
        9 => PageSegMode::PsmCircleWord,
        10 => PageSegMode::PsmSingleChar,
        11 => PageSegMode::PsmSparseText,
        12 => PageSegMode::PsmSparseTextOsd,
        13 => PageSegMode::PsmRawLine,
        _ => PageSegMode::PsmAuto,
    }
}

/// Stand-in engine for builds without the `ocr` feature.
/// Every call fails, which the pipeline degrades to empty text.
pub struct UnavailableOcrEngine;

impl OcrEngine for UnavailableOcrEngine {
    fn recognize(&self, _image: &GrayImage, _page_seg_mode: u32) -> Result<String, ExtractionError> {
        Err(ExtractionError::OcrUnavailable)
    }
}

/// Build the best OCR engine this binary supports.
pub fn default_ocr_engine(config: &OcrConfig) -> Box<dyn OcrEngine> {
    #[cfg(feature = "ocr")]
    {
        match TesseractEngine::new(config) {
            Ok(engine) => return Box::new(engine),
            Err(e) => {
                tracing::warn!(error = %e, "Tesseract unavailable, OCR will yield empty text");
            }
        }
    }
    #[cfg(not(feature = "ocr"))]
    {
        tracing::warn!(
            language = %config.language,
            "Built without the `ocr` feature, OCR will yield empty text"
        );
    }
    Box::new(UnavailableOcrEngine)
}

/// Run OCR on an already preprocessed image. Engine errors degrade to empty text.
pub fn recognize_text(
    engine: &dyn OcrEngine,
    image: &GrayImage,
    page_seg_mode: u32,
    context: &str,
) -> ExtractionOutcome {
    ExtractionOutcome::from_result(engine.recognize(image, page_seg_mode), context)
}

/// Decode, preprocess and OCR a single image file.
/// Decode and engine failures degrade to empty text.
pub fn extract_text_from_image(
    engine: &dyn OcrEngine,
    image_path: &Path,
    page_seg_mode: u32,
) -> ExtractionOutcome {
    let context = image_path.display().to_string();
    let image = match load_image_file(image_path) {
        Ok(img) => img,
        Err(e) => return ExtractionOutcome::degraded(e, &context),
    };
    let processed = preprocess_for_ocr(&image);
    recognize_text(engine, &processed, page_seg_mode, &context)
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    text: String,
    fail: bool,
    calls: AtomicUsize,
}

impl MockOcrEngine {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// An engine whose every call fails.
    pub fn failing() -> Self {
        Self {
            text: String::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, _image: &GrayImage, _page_seg_mode: u32) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExtractionError::OcrProcessing("mock engine failure".into()));
        }
        Ok(self.text.clone())
    }
}

impl<T: OcrEngine + ?Sized> OcrEngine for std::sync::Arc<T> {
    fn recognize(&self, image: &GrayImage, page_seg_mode: u32) -> Result<String, ExtractionError> {
        (**self).recognize(image, page_seg_mode)
    }
}
