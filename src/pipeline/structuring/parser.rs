use std::sync::LazyLock;

use regex::Regex;

use super::types::{ParsedFields, FIELD_KEYWORDS};

/// Inequality such as `<4.0` or `>= 2`.
static RE_INEQUALITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<>]=?\s*\d").unwrap());
/// Reference range such as `11.5 - 16.5` (hyphen, en dash or em dash).
static RE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,3}\.\d{1,2}\s*[-\u{2013}\u{2014}]\s*\d{1,3}\.\d{1,2}\b").unwrap()
});
static RE_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}\.\d{1,2}").unwrap());
static RE_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3}\.\d{1,2})\b").unwrap());

/// Extract a confident decimal value from one line.
///
/// Lines with inequalities give nothing, as do lines holding only a
/// reference range (a range plus at most two decimals in total).
/// Otherwise the first standalone `ddd.dd` token is returned.
pub fn safe_extract_value(line: &str) -> Option<String> {
    if RE_INEQUALITY.is_match(line) {
        return None;
    }

    if RE_RANGE.is_match(line) && RE_DECIMAL.find_iter(line).count() <= 2 {
        return None;
    }

    RE_VALUE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Line boundaries recognised in extracted text: `\n`, `\r`, vertical tab,
/// form feed (Tesseract page separator), file/group/record separators,
/// NEL and the Unicode line/paragraph separators.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Scan text line by line for known lab tests.
/// The first confident value per field across the document is kept.
pub fn parse_medical_fields(text: &str) -> ParsedFields {
    let mut fields = ParsedFields::new();

    for line in text.split(is_line_break) {
        let lower = line.to_lowercase();
        for (key, keywords) in FIELD_KEYWORDS {
            if fields.contains(*key) || !keywords.iter().any(|k| lower.contains(k)) {
                continue;
            }
            if let Some(value) = safe_extract_value(&lower) {
                tracing::debug!(field = %key, value = %value, "Parsed lab value");
                fields.insert_if_absent(*key, value);
            }
        }
    }

    fields
}
