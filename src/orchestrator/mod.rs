//! Translation orchestrator
//!
//! Runs one pass per target language, strictly one after another:
//!
//! ```text
//! Idle -> Discovering -> Diffing -> Batching -> Translating -> Validating
//!      -> Merging -> Persisting -> Reported
//! ```
//!
//! A fatal error aborts only the pass it happened in; the run always ends
//! with a report covering every requested language.

use serde_json::Value;
use std::time::Instant;

use crate::catalog::keys::resolve_structure;
use crate::catalog::order::order_like_source;
use crate::catalog::{
    leaves_array_gap, unflatten_with_shape, Catalog, CatalogError, CatalogStore, DiffMode, FlatMap, Leaf,
    MissingKeysReport, Structure,
};
use crate::error::{Error, IntlErrorTrait};
use crate::models::{
    LanguageOutcome, LanguageReport, PassState, RunReport, SkipReason, SkippedKey, TranslationItem,
};
use crate::translator::BatchTranslator;
use crate::utils::CancellationFlag;

/// Options of one run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Which keys to translate
    pub mode: DiffMode,

    /// Requested catalog layout; `None` detects it from the source
    pub structure: Option<Structure>,

    /// Translate but never write files
    pub dry_run: bool,

    /// Write `<file>.bak` before replacing a catalog
    pub backup: bool,
}

/// Drives language passes over a messages directory
pub struct Orchestrator {
    store: CatalogStore,
    translator: BatchTranslator,
    cancel: CancellationFlag,
}

/// Source catalog prepared for one pass
struct Source {
    catalog: Catalog,
    structure: Structure,
    flat: FlatMap,
}

impl Orchestrator {
    pub fn new(store: CatalogStore, translator: BatchTranslator, cancel: CancellationFlag) -> Self {
        Self {
            store,
            translator,
            cancel,
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Configured target languages, or every catalog besides the source
    pub fn target_languages(&self) -> Result<Vec<String>, CatalogError> {
        let config = self.translator.config();
        if !config.target_langs.is_empty() {
            return Ok(config.target_langs.clone());
        }
        self.store.discover_languages(&[config.source_lang.as_str()])
    }

    /// Translate every target language in turn
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport, Error> {
        let languages = self.target_languages()?;
        let source_lang = self.translator.config().source_lang.clone();

        tracing::info!(
            source = %source_lang,
            targets = ?languages,
            mode = ?options.mode,
            dry_run = options.dry_run,
            "Starting translation run"
        );

        let mut reports = Vec::with_capacity(languages.len());
        for language in &languages {
            if self.cancel.is_cancelled() {
                tracing::warn!(language = %language, "Run cancelled before language pass");
                reports.push(LanguageReport::cancelled(language));
                continue;
            }
            reports.push(self.run_language(language, options).await);
        }

        let report = RunReport::new(&source_lang, options.dry_run, reports);
        tracing::info!(
            success = report.success,
            translated = report.total_translated(),
            skipped = report.total_skipped(),
            "Translation run finished"
        );
        Ok(report)
    }

    /// One language pass; never fails, failures end up in the report
    pub async fn run_language(&self, language: &str, options: &RunOptions) -> LanguageReport {
        let started = Instant::now();
        let mut report = LanguageReport::new(language);

        if let Err(err) = self.execute_pass(language, options, &mut report).await {
            tracing::error!(
                language,
                state = %report.final_state,
                category = ?err.category(),
                error = %err,
                "Language pass failed"
            );
            report.outcome = LanguageOutcome::Failed {
                error: err.to_string(),
                category: err.category(),
            };
        }

        report.finish(started.elapsed().as_secs_f64());
        if report.is_success() || report.outcome == LanguageOutcome::Cancelled {
            transition(&mut report, PassState::Reported);
        }

        tracing::info!(
            language,
            translated = report.translated,
            skipped = report.skipped.len(),
            elapsed_secs = report.elapsed_secs,
            throughput = report.throughput,
            "Language pass reported"
        );
        report
    }

    async fn execute_pass(
        &self,
        language: &str,
        options: &RunOptions,
        report: &mut LanguageReport,
    ) -> Result<(), Error> {
        transition(report, PassState::Discovering);
        let source = self.load_source(options.structure)?;
        let mut target = self.store.load_or_empty(language)?;
        let target_flat = target.flatten(source.structure)?;

        transition(report, PassState::Diffing);
        let diff = MissingKeysReport::from_flat(language, &source.flat, &target_flat, options.mode);
        report.missing = diff.missing_count();
        let mut additions = verbatim_additions(&source.flat, &target_flat);
        tracing::info!(
            language,
            missing = diff.missing_count(),
            total = diff.total_keys,
            completion = diff.completion_percentage(),
            verbatim = additions.len(),
            "Catalog diffed"
        );

        transition(report, PassState::Batching);
        let items: Vec<TranslationItem> = diff
            .missing_keys
            .iter()
            .filter_map(|key| {
                source
                    .flat
                    .get(key.as_str())
                    .and_then(Leaf::as_text)
                    .map(|text| TranslationItem::new(key.clone(), text))
            })
            .collect();

        let mut cancelled = false;
        if items.is_empty() {
            report.outcome = LanguageOutcome::NothingToDo;
        } else {
            transition(report, PassState::Translating);
            let outcome = self.translator.translate(language, &items, &self.cancel).await?;

            transition(report, PassState::Validating);
            for skipped in &outcome.skipped {
                tracing::debug!(language, key = %skipped.key, reason = %skipped.reason, "Key skipped");
            }
            report.stats = outcome.stats;
            report.skipped = outcome.skipped;
            report.pending = outcome.pending;
            cancelled = outcome.cancelled;

            for (key, translated) in outcome.accepted {
                additions.insert(key, Leaf::Text(translated));
            }
        }

        transition(report, PassState::Merging);
        let trees = [&target.data, &source.catalog.data];
        let shapes: &[&Value] = match source.structure {
            Structure::Nested => &trees,
            Structure::Flat => &[],
        };
        let merge = merge_additions(&target_flat, additions, shapes);
        let accepted = merge.committed.values().filter(|leaf| leaf.as_text().is_some()).count();
        let copied = merge.committed.len() - accepted;
        for (key, leaf) in merge.held_back {
            if leaf.as_text().is_some() {
                tracing::warn!(language, key = %key, "Translation held back, an earlier array element is missing");
                report.skipped.push(SkippedKey {
                    key,
                    reason: SkipReason::ArrayGap,
                });
            } else {
                tracing::debug!(language, key = %key, "Verbatim leaf not copied, an earlier array element is missing");
            }
        }
        let target_flat = merge.flat;

        let merged = unflatten_with_shape(&target_flat, source.structure, &trees)?;
        let merged = order_like_source(&source.catalog.data, merged);

        let changed = accepted > 0 || copied > 0 || !target.existed;
        target.data = merged;

        transition(report, PassState::Persisting);
        if options.dry_run {
            tracing::info!(language, path = %target.path.display(), "Dry run, catalog not written");
        } else if changed {
            report.backup = self.store.save(&target, options.backup)?;
            report.persisted = true;
            tracing::info!(language, path = %target.path.display(), backup = ?report.backup, "Catalog written");
        } else {
            tracing::debug!(language, "Catalog unchanged, not written");
        }

        report.translated = accepted;
        if cancelled {
            report.outcome = LanguageOutcome::Cancelled;
        }
        Ok(())
    }

    fn load_source(&self, requested: Option<Structure>) -> Result<Source, CatalogError> {
        let catalog = self.store.load(&self.translator.config().source_lang)?;
        let structure = resolve_structure(requested, &catalog.data);
        let flat = catalog.flatten(structure)?;
        Ok(Source {
            catalog,
            structure,
            flat,
        })
    }

    /// Completeness of every target language, without translating
    pub fn check(&self, mode: DiffMode, structure: Option<Structure>) -> Result<Vec<MissingKeysReport>, Error> {
        let source = self.load_source(structure)?;

        self.target_languages()?
            .iter()
            .map(|language| -> Result<MissingKeysReport, Error> {
                let target = self.store.load_or_empty(language)?;
                let target_flat = target.flatten(source.structure)?;
                Ok(MissingKeysReport::from_flat(language, &source.flat, &target_flat, mode))
            })
            .collect()
    }
}

/// Leaves added to a target mapping
struct Merge {
    /// Target with committed additions
    flat: FlatMap,
    committed: FlatMap,
    /// Additions that would leave a hole in an array
    held_back: FlatMap,
}

/// Insert `additions` into `target`, holding back every addition that would
/// leave a hole in an array until none does
fn merge_additions(target: &FlatMap, mut additions: FlatMap, shapes: &[&Value]) -> Merge {
    let mut held_back = FlatMap::new();
    loop {
        let mut flat = target.clone();
        for (key, leaf) in &additions {
            flat.insert(key.clone(), leaf.clone());
        }

        let gaps: Vec<String> = additions
            .keys()
            .filter(|key| leaves_array_gap(&flat, key, shapes))
            .cloned()
            .collect();
        if gaps.is_empty() {
            return Merge {
                flat,
                committed: additions,
                held_back,
            };
        }
        for key in gaps {
            if let Some(leaf) = additions.shift_remove(&key) {
                held_back.insert(key, leaf);
            }
        }
    }
}

fn transition(report: &mut LanguageReport, next: PassState) {
    tracing::debug!(
        language = %report.language,
        from = %report.final_state,
        to = %next,
        "Pass state transition"
    );
    report.final_state = next;
}

/// Verbatim source leaves the target lacks
fn verbatim_additions(source: &FlatMap, target: &FlatMap) -> FlatMap {
    source
        .iter()
        .filter(|(key, leaf)| match leaf {
            Leaf::Verbatim(value) => !target.contains_key(*key) && !shadows_existing(target, key, value),
            Leaf::Text(_) => false,
        })
        .map(|(key, leaf)| (key.clone(), leaf.clone()))
        .collect()
}

/// An empty container in the source never replaces target content under it
fn shadows_existing(target: &FlatMap, key: &str, value: &Value) -> bool {
    let is_empty_container = match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    is_empty_container && {
        let prefix = format!("{key}.");
        target.keys().any(|k| k.starts_with(&prefix))
    }
}
