//! Catalog differ: which keys of a target language need translation

use serde::{Deserialize, Serialize};

use super::keys::{FlatMap, Leaf};

/// Selection policy for keys to translate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DiffMode {
    /// Keys present in the source but absent from the target
    #[default]
    Missing,

    /// Every translatable source key, regardless of the target
    All,

    /// Missing keys plus keys whose target text equals the source text
    Untranslated,
}

/// Keys of `source` selected for translation, in source order.
///
/// Only translatable leaves are considered; verbatim leaves never need a
/// translation.
pub fn missing_keys(source: &FlatMap, target: &FlatMap, mode: DiffMode) -> Vec<String> {
    source
        .iter()
        .filter_map(|(key, leaf)| leaf.as_text().map(|text| (key, text)))
        .filter(|(key, text)| match mode {
            DiffMode::All => true,
            DiffMode::Missing => !target.contains_key(key.as_str()),
            DiffMode::Untranslated => match target.get(key.as_str()) {
                None => true,
                Some(Leaf::Text(existing)) => existing == text,
                Some(Leaf::Verbatim(_)) => false,
            },
        })
        .map(|(key, _)| key.clone())
        .collect()
}

/// Number of translatable keys in a flat mapping
pub fn translatable_count(flat: &FlatMap) -> usize {
    flat.values().filter(|leaf| leaf.as_text().is_some()).count()
}

/// Missing keys of one target language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingKeysReport {
    /// Target language code
    pub language: String,

    /// Keys selected for translation, in source order
    pub missing_keys: Vec<String>,

    /// Translatable keys in the source catalog
    pub total_keys: usize,
}

impl MissingKeysReport {
    /// Diff two flat catalogs into a report
    pub fn from_flat(language: &str, source: &FlatMap, target: &FlatMap, mode: DiffMode) -> Self {
        Self {
            language: language.to_string(),
            missing_keys: missing_keys(source, target, mode),
            total_keys: translatable_count(source),
        }
    }

    /// Number of missing keys
    pub fn missing_count(&self) -> usize {
        self.missing_keys.len()
    }

    /// Number of keys already translated
    pub fn translated_count(&self) -> usize {
        self.total_keys.saturating_sub(self.missing_keys.len())
    }

    /// Completion percentage, 100% for an empty source
    pub fn completion_percentage(&self) -> f64 {
        if self.total_keys == 0 {
            return 100.0;
        }
        self.translated_count() as f64 / self.total_keys as f64 * 100.0
    }

    /// Whether nothing is missing
    pub fn is_complete(&self) -> bool {
        self.missing_keys.is_empty()
    }
}
