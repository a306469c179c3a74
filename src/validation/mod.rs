//! Structural validation of candidate translations
//!
//! A candidate may only replace catalog data if it keeps the structure of the
//! original message: the same placeholders, the same ICU control keywords and
//! the same markup tags. Errors block the commit; warnings are logged, and are
//! promoted to errors in [`ValidationMode::Strict`].
//!
//! Validation is pure and deterministic over its two string inputs.

pub mod rules;

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Translated text longer than this multiple of the original is suspicious
pub const LENGTH_RATIO_LIMIT: usize = 3;

/// Originals up to this many characters are exempt from the length check
const LENGTH_CHECK_MIN_CHARS: usize = 10;

/// Originals up to this many characters may legitimately stay unchanged
const UNCHANGED_CHECK_MIN_CHARS: usize = 3;

/// How warnings are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Warnings are promoted to errors
    Strict,

    /// Only errors block a translation
    #[default]
    Relaxed,
}

/// Result of validating one candidate translation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the candidate may be committed
    pub is_valid: bool,

    /// Blocking problems, in check order
    pub errors: Vec<String>,

    /// Non-blocking problems, in check order
    pub warnings: Vec<String>,
}

impl Verdict {
    /// Check if validation has errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Check if validation has warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Validate a candidate translation against its original
pub fn validate(original: &str, translated: &str, mode: ValidationMode) -> Verdict {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if translated.trim().is_empty() && !original.trim().is_empty() {
        errors.push("Translation is empty".to_string());
    }

    check_placeholders(original, translated, &mut errors);
    check_tags(original, translated, &mut errors);
    check_icu_keywords(original, translated, &mut errors, &mut warnings);
    check_identifiers(original, translated, &mut warnings);
    check_length(original, translated, &mut warnings);

    if original.trim() == translated.trim() && original.chars().count() > UNCHANGED_CHECK_MIN_CHARS {
        warnings.push("Translation unchanged (possible untranslated passthrough)".to_string());
    }

    if mode == ValidationMode::Strict {
        errors.append(&mut warnings);
    }

    Verdict {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn check_placeholders(original: &str, translated: &str, errors: &mut Vec<String>) {
    let expected = rules::placeholders(original);
    let found = rules::placeholders(translated);

    let missing = join_sorted(expected.difference(&found));
    if !missing.is_empty() {
        errors.push(format!("Missing placeholders: {missing}"));
    }

    let extra = join_sorted(found.difference(&expected));
    if !extra.is_empty() {
        errors.push(format!("Extra or renamed placeholders: {extra}"));
    }
}

fn check_tags(original: &str, translated: &str, errors: &mut Vec<String>) {
    let expected = rules::tags(original);
    let found = rules::tags(translated);

    let missing = join_sorted(expected.identifiers.difference(&found.identifiers));
    if !missing.is_empty() {
        errors.push(format!("Missing markup tags: {missing}"));
    }

    let extra = join_sorted(found.identifiers.difference(&expected.identifiers));
    if !extra.is_empty() {
        errors.push(format!("Extra markup tags: {extra}"));
    }

    if expected.balanced && !found.balanced {
        errors.push("Unbalanced markup tags".to_string());
    }
}

fn check_icu_keywords(
    original: &str,
    translated: &str,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let expected = rules::icu_keywords(original);
    if expected.is_empty() {
        return;
    }
    let found = rules::icu_keywords(translated);

    let lost = join_sorted(expected.difference(&found));
    if !lost.is_empty() {
        errors.push(format!("ICU keywords lost: {lost}"));
    }
    if found.is_empty() {
        warnings.push("ICU syntax appears to be translated or broken".to_string());
    }
}

fn check_identifiers(original: &str, translated: &str, warnings: &mut Vec<String>) {
    let expected = rules::technical_identifiers(original);
    if expected.is_empty() {
        return;
    }
    let found = rules::technical_identifiers(translated);

    let missing = join_sorted(expected.difference(&found));
    if !missing.is_empty() {
        warnings.push(format!("Technical identifiers missing: {missing}"));
    }
}

fn check_length(original: &str, translated: &str, warnings: &mut Vec<String>) {
    let original_len = original.chars().count();
    let translated_len = translated.chars().count();

    if original_len > LENGTH_CHECK_MIN_CHARS && translated_len > original_len * LENGTH_RATIO_LIMIT {
        warnings.push(format!(
            "Translation is {:.1}x longer than original",
            translated_len as f64 / original_len as f64
        ));
    }
}

fn join_sorted<'a>(items: impl Iterator<Item = &'a String>) -> String {
    // BTreeSet differences already iterate in sorted order
    items.map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Placeholder-bearing text needs the preservation instruction in prompts
pub fn has_structure(text: &str) -> bool {
    !rules::placeholders(text).is_empty() || !rules::tags(text).identifiers.is_empty()
}

/// Multi-line description of a failed or warned candidate, for logs
pub fn format_report(key: &str, original: &str, translated: &str, verdict: &Verdict) -> String {
    let mut out = format!("Validation failed for '{key}':\n");
    let _ = writeln!(out, "  Original:   {original}");
    let _ = writeln!(out, "  Translated: {translated}");

    if verdict.has_errors() {
        out.push_str("  Errors:\n");
        for error in &verdict.errors {
            let _ = writeln!(out, "    - {error}");
        }
    }
    if verdict.has_warnings() {
        out.push_str("  Warnings:\n");
        for warning in &verdict.warnings {
            let _ = writeln!(out, "    - {warning}");
        }
    }

    out.trim_end().to_string()
}
