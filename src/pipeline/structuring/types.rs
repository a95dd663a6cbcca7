use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lab-test fields resolved per document.
///
/// Variant order is the keyword table order; `ParsedFields` iterates in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Hemoglobin,
    WbcCount,
    RbcCount,
    PlateletCount,
    Esr,
    Glucose,
    Creatinine,
    UricAcid,
    VitaminD,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hemoglobin => "hemoglobin",
            Self::WbcCount => "wbc_count",
            Self::RbcCount => "rbc_count",
            Self::PlateletCount => "platelet_count",
            Self::Esr => "esr",
            Self::Glucose => "glucose",
            Self::Creatinine => "creatinine",
            Self::UricAcid => "uric_acid",
            Self::VitaminD => "vitamin_d",
        }
    }

    /// Title-cased label, e.g. `wbc_count` -> `Wbc Count`.
    pub fn display_name(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword table, matched as lowercase substrings in this order.
pub const FIELD_KEYWORDS: &[(FieldKey, &[&str])] = &[
    (FieldKey::Hemoglobin, &["hemoglobin"]),
    (FieldKey::WbcCount, &["wbc"]),
    (FieldKey::RbcCount, &["rbc"]),
    (FieldKey::PlateletCount, &["platelet"]),
    (FieldKey::Esr, &["esr"]),
    (FieldKey::Glucose, &["glucose"]),
    (FieldKey::Creatinine, &["creatinine"]),
    (FieldKey::UricAcid, &["uric acid"]),
    (FieldKey::VitaminD, &["vitamin d"]),
];

/// Confident values found in one document, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedFields(BTreeMap<FieldKey, String>);

impl ParsedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    /// Record a value unless the field already has one. Returns whether it was stored.
    pub fn insert_if_absent(&mut self, key: FieldKey, value: String) -> bool {
        if self.0.contains_key(&key) {
            return false;
        }
        self.0.insert(key, value);
        true
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// One `Display Name: value` line per resolved field, in keyword-table
    /// order rather than the order values were found in the text.
    pub fn summary_text(&self) -> String {
        self.iter()
            .map(|(key, value)| format!("{}: {value}", key.display_name()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// String-keyed view used by output records.
    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_are_title_case() {
        assert_eq!(FieldKey::WbcCount.display_name(), "Wbc Count");
        assert_eq!(FieldKey::VitaminD.display_name(), "Vitamin D");
        assert_eq!(FieldKey::Esr.display_name(), "Esr");
    }

    #[test]
    fn keyword_table_covers_every_key_in_order() {
        let keys: Vec<FieldKey> = FIELD_KEYWORDS.iter().map(|(k, _)| *k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 9);
    }

    #[test]
    fn first_insert_wins() {
        let mut fields = ParsedFields::new();
        assert!(fields.insert_if_absent(FieldKey::Glucose, "98.5".into()));
        assert!(!fields.insert_if_absent(FieldKey::Glucose, "110.0".into()));
        assert_eq!(fields.get(FieldKey::Glucose), Some("98.5"));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn summary_follows_table_order() {
        let mut fields = ParsedFields::new();
        fields.insert_if_absent(FieldKey::VitaminD, "32.10".into());
        fields.insert_if_absent(FieldKey::Hemoglobin, "13.8".into());
        fields.insert_if_absent(FieldKey::WbcCount, "7.20".into());
        assert_eq!(
            fields.summary_text(),
            "Hemoglobin: 13.8\nWbc Count: 7.20\nVitamin D: 32.10"
        );
    }

    #[test]
    fn serializes_as_flat_map() {
        let mut fields = ParsedFields::new();
        fields.insert_if_absent(FieldKey::UricAcid, "5.40".into());
        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"uric_acid":"5.40"}"#);
    }

    #[test]
    fn empty_summary_is_empty() {
        assert_eq!(ParsedFields::new().summary_text(), "");
    }
}
