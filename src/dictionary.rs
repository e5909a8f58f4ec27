//! Original → translated term dictionary.
//!
//! Folder names in the collection are Hebrew; the dictionary maps them (and
//! the interface terms the frontend shows) to English. Lookups are exact
//! matches with no normalization, and a miss echoes the original back, so an
//! incomplete dictionary degrades to untranslated labels instead of errors.
//!
//! The file is a flat JSON object. Like every other operator-edited JSON
//! file, a missing or malformed dictionary loads as empty.

use crate::metadata::read_json_object;
use crate::types::Label;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    terms: BTreeMap<String, String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the dictionary file, keeping only string-valued entries.
    pub fn load(path: &Path) -> Self {
        let raw = read_json_object(path);
        let mut terms = BTreeMap::new();
        for (original, translated) in raw {
            match translated {
                Value::String(t) => {
                    terms.insert(original, t);
                }
                other => debug!(
                    path = %path.display(),
                    term = %original,
                    value = %other,
                    "ignoring non-string dictionary value"
                ),
            }
        }
        Self { terms }
    }

    /// Write the dictionary as pretty JSON with non-ASCII text kept readable.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        crate::metadata::write_json_pretty(path, &self.terms)
    }

    /// Translate `original`, falling back to the original itself.
    pub fn translate<'a>(&'a self, original: &'a str) -> &'a str {
        self.terms.get(original).map(String::as_str).unwrap_or(original)
    }

    /// Build the bilingual label for a raw folder name.
    pub fn label(&self, original: &str) -> Label {
        Label::new(original, self.translate(original))
    }

    pub fn contains(&self, original: &str) -> bool {
        self.terms.contains_key(original)
    }

    pub fn insert(&mut self, original: impl Into<String>, translated: impl Into<String>) {
        self.terms.insert(original.into(), translated.into());
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            terms: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn label_uses_translation_when_present() {
        let dict: Dictionary = [("שקל", "Shekel")].into_iter().collect();
        assert_eq!(dict.label("שקל"), Label::new("שקל", "Shekel"));
    }

    #[test]
    fn label_echoes_missing_term() {
        let dict = Dictionary::new();
        let label = dict.label("אגורה");
        assert_eq!(label.original, "אגורה");
        assert_eq!(label.translated, "אגורה");
    }

    #[test]
    fn lookup_is_exact_match() {
        let dict: Dictionary = [("Lira", "Pound")].into_iter().collect();
        assert_eq!(dict.translate("lira"), "lira");
        assert_eq!(dict.translate(" Lira"), " Lira");
        assert_eq!(dict.translate("Lira"), "Pound");
    }

    #[test]
    fn load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(Dictionary::load(&tmp.path().join("folder_map.json")).is_empty());
    }

    #[test]
    fn load_malformed_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("folder_map.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Dictionary::load(&path).is_empty());
    }

    #[test]
    fn load_skips_non_string_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("folder_map.json");
        fs::write(&path, r#"{"שקל": "Shekel", "broken": 3, "list": ["a"]}"#).unwrap();

        let dict = Dictionary::load(&path);
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.translate("שקל"), "Shekel");
    }

    #[test]
    fn save_and_load_keeps_hebrew_readable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("folder_map.json");
        let mut dict = Dictionary::new();
        dict.insert("חצי שקל", "Half Shekel");
        dict.save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("חצי שקל"));
        assert_eq!(Dictionary::load(&path), dict);
    }
}
