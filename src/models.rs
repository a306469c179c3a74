// Core data structures for intl-sync

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::ErrorCategory;

/// One key queued for translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationItem {
    pub key: String,
    pub text: String,
}

impl TranslationItem {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }

    /// Multi-line texts cannot travel in the numbered-list format
    pub fn is_multiline(&self) -> bool {
        self.text.contains('\n')
    }
}

/// Proposed translation, not yet committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationCandidate {
    pub key: String,
    pub original: String,
    pub translated: String,
}

impl TranslationCandidate {
    pub fn new(item: &TranslationItem, translated: impl Into<String>) -> Self {
        Self {
            key: item.key.clone(),
            original: item.text.clone(),
            translated: translated.into(),
        }
    }
}

/// Why a key was left unchanged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The candidate failed structural validation
    Validation { errors: Vec<String> },

    /// The backend call for this key failed
    Backend { message: String },

    /// An earlier element of the same array is still missing, so the
    /// translation cannot be placed at its index
    ArrayGap,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { errors } => write!(f, "validation: {}", errors.join("; ")),
            Self::Backend { message } => write!(f, "backend: {message}"),
            Self::ArrayGap => f.write_str("array: an earlier element is missing"),
        }
    }
}

/// A key that was attempted but not committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedKey {
    pub key: String,
    pub reason: SkipReason,
}

/// Translator counters for one language pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorStats {
    /// Batch requests sent
    pub batches: u32,
    /// Batches whose response was rejected or whose call failed
    pub batch_failures: u32,
    /// Items retried individually after a batch failure
    pub fallback_items: u32,
    /// Requests sent for a single item
    pub single_requests: u32,
    /// Total backend calls
    pub backend_calls: u32,
    /// Items resolved from the glossary
    pub glossary_hits: u32,
    /// Empty items copied without a backend call
    pub passthrough: u32,
}

/// Result of translating one language's item list
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Validated translations in input order
    pub accepted: IndexMap<String, String>,
    /// Keys attempted but rejected
    pub skipped: Vec<SkippedKey>,
    /// Keys never attempted because the run was cancelled
    pub pending: Vec<String>,
    pub stats: TranslatorStats,
    pub cancelled: bool,
}

/// Stage of one language pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    #[default]
    Idle,
    Discovering,
    Diffing,
    Batching,
    Translating,
    Validating,
    Merging,
    Persisting,
    Reported,
}

impl PassState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Diffing => "diffing",
            Self::Batching => "batching",
            Self::Translating => "translating",
            Self::Validating => "validating",
            Self::Merging => "merging",
            Self::Persisting => "persisting",
            Self::Reported => "reported",
        }
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a language pass ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LanguageOutcome {
    /// Pass ran to the end
    Completed,
    /// Nothing was missing
    NothingToDo,
    /// A fatal error aborted the pass
    Failed {
        error: String,
        category: ErrorCategory,
    },
    /// The run was interrupted during or before this pass
    Cancelled,
}

/// Summary of one language pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageReport {
    pub language: String,
    pub outcome: LanguageOutcome,
    /// Last state reached
    pub final_state: PassState,
    /// Keys selected for translation
    pub missing: usize,
    /// Keys committed
    pub translated: usize,
    pub skipped: Vec<SkippedKey>,
    /// Keys left untouched because the run was cancelled
    pub pending: Vec<String>,
    pub elapsed_secs: f64,
    /// Committed keys per second
    pub throughput: f64,
    pub stats: TranslatorStats,
    pub backup: Option<PathBuf>,
    pub persisted: bool,
}

impl LanguageReport {
    /// Empty report for a language whose pass is starting
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            outcome: LanguageOutcome::Completed,
            final_state: PassState::Idle,
            missing: 0,
            translated: 0,
            skipped: Vec::new(),
            pending: Vec::new(),
            elapsed_secs: 0.0,
            throughput: 0.0,
            stats: TranslatorStats::default(),
            backup: None,
            persisted: false,
        }
    }

    /// Report for a language that was never started
    pub fn cancelled(language: &str) -> Self {
        Self {
            outcome: LanguageOutcome::Cancelled,
            ..Self::new(language)
        }
    }

    /// Record elapsed time and derive throughput
    pub fn finish(&mut self, elapsed_secs: f64) {
        self.elapsed_secs = elapsed_secs;
        self.throughput = if elapsed_secs > 0.0 {
            self.translated as f64 / elapsed_secs
        } else {
            0.0
        };
    }

    /// Completed (or had nothing to do) without fatal error
    pub fn is_success(&self) -> bool {
        matches!(
            self.outcome,
            LanguageOutcome::Completed | LanguageOutcome::NothingToDo
        )
    }
}

/// Summary of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub source_lang: String,
    pub dry_run: bool,
    pub languages: Vec<LanguageReport>,
    /// True only if every language succeeded and the run was not cancelled
    pub success: bool,
}

impl RunReport {
    pub fn new(source_lang: &str, dry_run: bool, languages: Vec<LanguageReport>) -> Self {
        let success = languages.iter().all(LanguageReport::is_success);
        Self {
            generated_at: Utc::now(),
            source_lang: source_lang.to_string(),
            dry_run,
            languages,
            success,
        }
    }

    pub fn total_translated(&self) -> usize {
        self.languages.iter().map(|l| l.translated).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.languages.iter().map(|l| l.skipped.len()).sum()
    }

    /// Every skipped key, prefixed by its language
    pub fn skipped_keys(&self) -> impl Iterator<Item = (&str, &SkippedKey)> {
        self.languages
            .iter()
            .flat_map(|l| l.skipped.iter().map(move |s| (l.language.as_str(), s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_multiline() {
        assert!(TranslationItem::new("a", "one\ntwo").is_multiline());
        assert!(!TranslationItem::new("a", "one two").is_multiline());
    }

    #[test]
    fn test_throughput() {
        let mut report = LanguageReport::new("ru");
        report.translated = 10;
        report.finish(4.0);
        assert!((report.throughput - 2.5).abs() < f64::EPSILON);

        let mut empty = LanguageReport::new("de");
        empty.finish(0.0);
        assert_eq!(empty.throughput, 0.0);
    }

    #[test]
    fn test_run_success_requires_every_language() {
        let ok = LanguageReport::new("ru");
        let mut nothing = LanguageReport::new("de");
        nothing.outcome = LanguageOutcome::NothingToDo;
        assert!(RunReport::new("en", false, vec![ok.clone(), nothing]).success);

        let failed = LanguageReport {
            outcome: LanguageOutcome::Failed {
                error: "Catalog not found".into(),
                category: ErrorCategory::Storage,
            },
            ..LanguageReport::new("fr")
        };
        assert!(!RunReport::new("en", false, vec![ok.clone(), failed]).success);
        assert!(!RunReport::new("en", false, vec![ok, LanguageReport::cancelled("es")]).success);
    }

    #[test]
    fn test_skip_reason_serialization() {
        let skipped = SkippedKey {
            key: "a.b".into(),
            reason: SkipReason::Validation {
                errors: vec!["Missing placeholders: {name}".into()],
            },
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["reason"]["kind"], "validation");
        assert_eq!(json["reason"]["errors"][0], "Missing placeholders: {name}");
    }

    #[test]
    fn test_report_json_has_timestamp() {
        let report = RunReport::new("en", true, vec![]);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["generated_at"].is_string());
        assert_eq!(json["success"], true);
    }
}
