use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Medscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum trimmed length (in chars) for digitally extracted text to be trusted.
pub const DEFAULT_MEANINGFUL_THRESHOLD: usize = 500;

/// Minimum alphanumeric share of extracted text to be trusted.
pub const DEFAULT_ALNUM_RATIO: f64 = 0.25;

/// Rendering resolution for OCR of PDF pages.
pub const DEFAULT_OCR_DPI: u32 = 300;

/// Tesseract page segmentation mode 6: assume a single uniform block of text.
pub const DEFAULT_PAGE_SEG_MODE: u32 = 6;

/// Fixed contrast multiplier applied before OCR.
pub const CONTRAST_FACTOR: f32 = 2.0;

pub const DEFAULT_OCR_LANG: &str = "eng";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medscan_lib=info,medscan=info,warn"
}

/// OCR engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Tesseract `tessdata` directory. `None` lets Tesseract use its compiled-in default.
    pub tessdata_dir: Option<PathBuf>,
    /// Tesseract language string, e.g. "eng" or "eng+fra".
    pub language: String,
    pub page_seg_mode: u32,
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tessdata_dir: None,
            language: DEFAULT_OCR_LANG.to_string(),
            page_seg_mode: DEFAULT_PAGE_SEG_MODE,
            dpi: DEFAULT_OCR_DPI,
        }
    }
}

/// Thresholds for deciding whether digital extraction must be redone via OCR.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub threshold: usize,
    pub ratio: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MEANINGFUL_THRESHOLD,
            ratio: DEFAULT_ALNUM_RATIO,
        }
    }
}

/// Everything the extraction pipeline needs, passed explicitly to constructors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub ocr: OcrConfig,
    pub fallback: FallbackConfig,
}

impl PipelineConfig {
    /// Defaults overridden by `MEDSCAN_*` environment variables.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("MEDSCAN_TESSDATA_DIR") {
            config.ocr.tessdata_dir = Some(PathBuf::from(dir));
        }
        if let Some(lang) = lookup("MEDSCAN_OCR_LANG") {
            if !lang.trim().is_empty() {
                config.ocr.language = lang.trim().to_string();
            }
        }
        if let Some(dpi) = parse_var(&lookup, "MEDSCAN_OCR_DPI") {
            config.ocr.dpi = dpi;
        }
        if let Some(threshold) = parse_var(&lookup, "MEDSCAN_MEANINGFUL_THRESHOLD") {
            config.fallback.threshold = threshold;
        }
        if let Some(ratio) = parse_var(&lookup, "MEDSCAN_ALNUM_RATIO") {
            config.fallback.ratio = ratio;
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable config override");
            None
        }
    }
}
