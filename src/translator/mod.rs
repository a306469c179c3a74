//! Batch translation with fallback
//!
//! Items of one language are routed three ways:
//!
//! - empty texts are copied as they are
//! - exact glossary matches are substituted without a backend call
//! - everything else is sent to the backend, in numbered batches when the text
//!   is single-line and alone otherwise
//!
//! A batch is split in halves until its rendered prompt fits the token budget.
//! When a batch call fails or its response cannot be parsed unambiguously,
//! every item of that batch is retried on its own. Every candidate, whatever
//! its origin, must pass structural validation before it is accepted.

pub mod prompt;
pub mod protocol;
pub mod tokens;

use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::TranslatorConfig;
use crate::llm::{Backend, BackendError};
use crate::models::{BatchOutcome, SkipReason, SkippedKey, TranslationCandidate, TranslationItem};
use crate::utils::{truncate_text, CancellationFlag};
use crate::validation::{self, format_report};
use prompt::PromptBuilder;
use protocol::parse_numbered;
use tokens::TokenEstimator;

/// Errors that abort a language pass
#[derive(Error, Debug)]
pub enum TranslatorError {
    /// The backend cannot be reached, so no remaining item can succeed
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[source] BackendError),

    /// A prompt template failed to compile or render
    #[error("Prompt template error: {0}")]
    Template(String),
}

impl From<handlebars::RenderError> for TranslatorError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for TranslatorError {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::Template(err.to_string())
    }
}

/// Translator for one run; holds no state across calls besides its config
pub struct BatchTranslator {
    backend: Arc<dyn Backend>,
    estimator: Arc<dyn TokenEstimator>,
    config: Arc<TranslatorConfig>,
    prompts: PromptBuilder,
}

/// Per-call working state
struct Pass<'a> {
    target_lang: &'a str,
    cancel: &'a CancellationFlag,
    outcome: BatchOutcome,
}

impl Pass<'_> {
    /// Returns true once cancellation was requested, marking `rest` pending
    fn check_cancelled<'i>(&mut self, rest: impl IntoIterator<Item = &'i TranslationItem>) -> bool {
        if !self.cancel.is_cancelled() {
            return false;
        }
        if !self.outcome.cancelled {
            tracing::warn!(language = self.target_lang, "Cancellation requested, stopping translation");
        }
        self.outcome.cancelled = true;
        self.outcome
            .pending
            .extend(rest.into_iter().map(|item| item.key.clone()));
        true
    }
}

impl BatchTranslator {
    pub fn new(
        backend: Arc<dyn Backend>,
        estimator: Arc<dyn TokenEstimator>,
        config: Arc<TranslatorConfig>,
    ) -> Result<Self, TranslatorError> {
        Ok(Self {
            backend,
            estimator,
            config,
            prompts: PromptBuilder::new()?,
        })
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate `items` from the source language into `target_lang`.
    ///
    /// Per-key failures are collected in the outcome; only an unreachable
    /// backend or a broken template returns an error.
    pub async fn translate(
        &self,
        target_lang: &str,
        items: &[TranslationItem],
        cancel: &CancellationFlag,
    ) -> Result<BatchOutcome, TranslatorError> {
        let mut pass = Pass {
            target_lang,
            cancel,
            outcome: BatchOutcome::default(),
        };

        let mut batchable = Vec::new();
        let mut singles = Vec::new();

        for item in items {
            if item.text.trim().is_empty() {
                pass.outcome.stats.passthrough += 1;
                pass.outcome
                    .accepted
                    .insert(item.key.clone(), item.text.clone());
            } else if let Some(forced) = self.config.glossary.get(&item.text) {
                pass.outcome.stats.glossary_hits += 1;
                tracing::debug!(key = %item.key, "Glossary match");
                self.accept_or_reject(&mut pass, TranslationCandidate::new(item, forced.as_str()));
            } else if item.is_multiline() {
                singles.push(item);
            } else {
                batchable.push(item);
            }
        }

        tracing::info!(
            language = target_lang,
            batchable = batchable.len(),
            single = singles.len(),
            glossary = pass.outcome.stats.glossary_hits,
            "Translating"
        );

        let mut groups = Vec::new();
        for chunk in batchable.chunks(self.config.batch_size.max(1)) {
            groups.extend(self.split_to_budget(target_lang, chunk)?);
        }

        for (index, group) in groups.iter().enumerate() {
            if pass.check_cancelled(groups[index..].iter().flat_map(|g| g.iter().copied())) {
                break;
            }

            if group.len() == 1 {
                self.translate_single(&mut pass, group[0]).await?;
            } else {
                self.translate_batch(&mut pass, group).await?;
            }
        }

        // After a cancellation this marks every single pending
        for (index, item) in singles.iter().enumerate() {
            if pass.check_cancelled(singles[index..].iter().copied()) {
                break;
            }
            self.translate_single(&mut pass, item).await?;
        }

        let mut outcome = pass.outcome;
        outcome.accepted = order_by_input(items, outcome.accepted);

        tracing::info!(
            language = target_lang,
            accepted = outcome.accepted.len(),
            skipped = outcome.skipped.len(),
            pending = outcome.pending.len(),
            batches = outcome.stats.batches,
            batch_failures = outcome.stats.batch_failures,
            backend_calls = outcome.stats.backend_calls,
            "Translation finished"
        );

        Ok(outcome)
    }

    /// Halve `chunk` until each part's rendered prompt fits the budget
    fn split_to_budget<'i>(
        &self,
        target_lang: &str,
        chunk: &'i [&'i TranslationItem],
    ) -> Result<Vec<&'i [&'i TranslationItem]>, TranslatorError> {
        let budget = self.config.context_token_budget;
        let mut groups = Vec::new();
        let mut stack = vec![chunk];

        while let Some(group) = stack.pop() {
            let tokens = self.estimate_batch(target_lang, group)?;
            if tokens <= budget {
                groups.push(group);
            } else if group.len() > 1 {
                tracing::debug!(items = group.len(), tokens, budget, "Batch exceeds budget, splitting");
                let (left, right) = group.split_at(group.len() / 2);
                stack.push(right);
                stack.push(left);
            } else {
                tracing::warn!(key = %group[0].key, tokens, budget, "Single item exceeds token budget, sending anyway");
                groups.push(group);
            }
        }

        Ok(groups)
    }

    fn estimate_batch(&self, target_lang: &str, group: &[&TranslationItem]) -> Result<usize, TranslatorError> {
        let prompt = if group.len() == 1 {
            self.prompts
                .single(&self.config.source_lang, target_lang, &group[0].text)?
        } else {
            self.prompts.batch(&self.config.source_lang, target_lang, group)?
        };
        Ok(self.estimator.estimate(&prompt))
    }

    async fn translate_batch(
        &self,
        pass: &mut Pass<'_>,
        group: &[&TranslationItem],
    ) -> Result<(), TranslatorError> {
        let prompt = self.prompts.batch(&self.config.source_lang, pass.target_lang, group)?;
        let max_new_tokens = self.config.max_tokens.saturating_mul(group.len() as u32);

        pass.outcome.stats.batches += 1;
        pass.outcome.stats.backend_calls += 1;

        let failure = match self.backend.generate(&prompt, max_new_tokens).await {
            Ok(response) => match parse_numbered(&response, group.len()) {
                Ok(translations) => {
                    for (item, translated) in group.iter().zip(translations) {
                        self.accept_or_reject(pass, TranslationCandidate::new(item, translated));
                    }
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(response = %truncate_text(&response, 200), "Unparseable batch response");
                    e.to_string()
                }
            },
            Err(e) => e.to_string(),
        };

        tracing::warn!(
            language = pass.target_lang,
            items = group.len(),
            error = %failure,
            "Batch failed, falling back to individual translation"
        );
        pass.outcome.stats.batch_failures += 1;
        pass.outcome.stats.fallback_items += group.len() as u32;

        for (index, item) in group.iter().enumerate() {
            if index > 0 && pass.check_cancelled(group[index..].iter().copied()) {
                break;
            }
            self.translate_single(pass, item).await?;
        }

        Ok(())
    }

    async fn translate_single(&self, pass: &mut Pass<'_>, item: &TranslationItem) -> Result<(), TranslatorError> {
        let prompt = self.prompts.single(&self.config.source_lang, pass.target_lang, &item.text)?;

        pass.outcome.stats.single_requests += 1;
        pass.outcome.stats.backend_calls += 1;

        match self.backend.generate(&prompt, self.config.max_tokens).await {
            Ok(response) => {
                let translated = clean_single_response(&response);
                self.accept_or_reject(pass, TranslationCandidate::new(item, translated));
                Ok(())
            }
            Err(e) if e.is_unavailable() => Err(TranslatorError::BackendUnavailable(e)),
            Err(e) => {
                tracing::warn!(key = %item.key, error = %e, "Translation request failed");
                pass.outcome.skipped.push(SkippedKey {
                    key: item.key.clone(),
                    reason: SkipReason::Backend {
                        message: e.to_string(),
                    },
                });
                Ok(())
            }
        }
    }

    fn accept_or_reject(&self, pass: &mut Pass<'_>, candidate: TranslationCandidate) {
        let verdict = validation::validate(&candidate.original, &candidate.translated, self.config.validation);

        if verdict.is_valid {
            for warning in &verdict.warnings {
                tracing::warn!(key = %candidate.key, warning = %warning, "Validation warning");
            }
            pass.outcome.accepted.insert(candidate.key, candidate.translated);
        } else {
            tracing::warn!(
                "{}",
                format_report(&candidate.key, &candidate.original, &candidate.translated, &verdict)
            );
            pass.outcome.skipped.push(SkippedKey {
                key: candidate.key,
                reason: SkipReason::Validation {
                    errors: verdict.errors,
                },
            });
        }
    }
}

/// Trim a single-item response and unwrap a surrounding code fence
fn clean_single_response(response: &str) -> String {
    let trimmed = response.trim();
    if let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    {
        // Drop an info string such as ```text
        let body = match inner.split_once('\n') {
            Some((first, body)) if !first.trim().contains(' ') => body,
            _ => inner,
        };
        return body.trim().to_string();
    }
    trimmed.to_string()
}

fn order_by_input(items: &[TranslationItem], mut accepted: IndexMap<String, String>) -> IndexMap<String, String> {
    let mut ordered = IndexMap::with_capacity(accepted.len());
    for item in items {
        if let Some(value) = accepted.swap_remove(&item.key) {
            ordered.insert(item.key.clone(), value);
        }
    }
    ordered
}
