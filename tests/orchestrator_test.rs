//! End-to-end language passes over a temporary messages directory

mod common;

use serde_json::json;
use std::sync::Arc;

use common::{
    answer_prompt, messages_dir, orchestrator, read_catalog, translator, translator_config, write_catalog,
    MockBackend,
};
use intl_sync::catalog::{CatalogStore, DiffMode};
use intl_sync::error::ErrorCategory;
use intl_sync::models::{LanguageOutcome, PassState, SkipReason};
use intl_sync::orchestrator::{Orchestrator, RunOptions};
use intl_sync::utils::CancellationFlag;

fn options(mode: DiffMode) -> RunOptions {
    RunOptions {
        mode,
        structure: None,
        dry_run: false,
        backup: true,
    }
}

fn keys(value: &serde_json::Value) -> Vec<&str> {
    value.as_object().unwrap().keys().map(String::as_str).collect()
}

fn hello_world() -> Arc<MockBackend> {
    Arc::new(MockBackend::dictionary(&[("Hello", "X"), ("World", "Y")]))
}

// ============================================================================
// Translation Passes
// ============================================================================

#[tokio::test]
async fn test_translate_into_empty_target() {
    let dir = messages_dir(&[("en", json!({"a": "Hello", "b": {"c": "World"}}))]);
    let orchestrator = orchestrator(dir.path(), hello_world(), translator_config(&["ru"]));

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    assert!(report.success);
    let ru = &report.languages[0];
    assert_eq!(ru.outcome, LanguageOutcome::Completed);
    assert_eq!(ru.final_state, PassState::Reported);
    assert_eq!(ru.missing, 2);
    assert_eq!(ru.translated, 2);
    assert!(ru.persisted);

    let written = read_catalog(dir.path(), "ru");
    assert_eq!(written, json!({"a": "X", "b": {"c": "Y"}}));
    assert_eq!(keys(&written), vec!["a", "b"]);
}

#[tokio::test]
async fn test_only_missing_keys_are_sent() {
    let dir = messages_dir(&[
        ("en", json!({"a": "Hello", "b": {"c": "World"}})),
        ("ru", json!({"a": "X"})),
    ]);
    let backend = hello_world();
    let orchestrator = orchestrator(dir.path(), backend.clone(), translator_config(&["ru"]));

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    assert_eq!(report.languages[0].missing, 1);
    assert_eq!(backend.calls(), 1);
    assert!(backend.prompts()[0].ends_with("World"));
    assert_eq!(read_catalog(dir.path(), "ru"), json!({"a": "X", "b": {"c": "Y"}}));
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let dir = messages_dir(&[("en", json!({"a": "Hello", "b": {"c": "World"}}))]);
    let backend = hello_world();
    let orchestrator = orchestrator(dir.path(), backend.clone(), translator_config(&["ru"]));

    orchestrator.run(&options(DiffMode::Missing)).await.unwrap();
    let first = std::fs::read_to_string(dir.path().join("ru.json")).unwrap();
    let calls = backend.calls();

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    assert!(report.success);
    assert_eq!(report.languages[0].outcome, LanguageOutcome::NothingToDo);
    assert!(!report.languages[0].persisted);
    assert_eq!(backend.calls(), calls);
    assert_eq!(std::fs::read_to_string(dir.path().join("ru.json")).unwrap(), first);
}

#[tokio::test]
async fn test_translate_all_writes_backup() {
    let dir = messages_dir(&[("en", json!({"a": "Hello"})), ("ru", json!({"a": "Old"}))]);
    let orchestrator = orchestrator(dir.path(), hello_world(), translator_config(&["ru"]));

    let report = orchestrator.run(&options(DiffMode::All)).await.unwrap();

    let backup = report.languages[0].backup.clone().unwrap();
    assert_eq!(backup, dir.path().join("ru.json.bak"));
    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(backup).unwrap()).unwrap();
    assert_eq!(saved, json!({"a": "Old"}));
    assert_eq!(read_catalog(dir.path(), "ru"), json!({"a": "X"}));
}

#[tokio::test]
async fn test_no_backup_when_disabled() {
    let dir = messages_dir(&[("en", json!({"a": "Hello"})), ("ru", json!({"a": "Old"}))]);
    let orchestrator = orchestrator(dir.path(), hello_world(), translator_config(&["ru"]));

    let mut opts = options(DiffMode::All);
    opts.backup = false;
    let report = orchestrator.run(&opts).await.unwrap();

    assert!(report.languages[0].backup.is_none());
    assert!(!dir.path().join("ru.json.bak").exists());
}

#[tokio::test]
async fn test_obsolete_keys_are_preserved() {
    let dir = messages_dir(&[
        ("en", json!({"a": "Hello", "b": "World"})),
        ("ru", json!({"legacy": "Старый", "a": "X"})),
    ]);
    let orchestrator = orchestrator(dir.path(), hello_world(), translator_config(&["ru"]));

    orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    let written = read_catalog(dir.path(), "ru");
    assert_eq!(written["legacy"], "Старый");
    assert_eq!(keys(&written), vec!["a", "b", "legacy"]);
}

#[tokio::test]
async fn test_verbatim_leaves_are_copied() {
    let dir = messages_dir(&[(
        "en",
        json!({"title": "Hello", "limits": {"max": 10, "enabled": true}}),
    )]);
    let backend = hello_world();
    let orchestrator = orchestrator(dir.path(), backend.clone(), translator_config(&["ru"]));

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    assert_eq!(report.languages[0].missing, 1);
    assert_eq!(
        read_catalog(dir.path(), "ru"),
        json!({"title": "X", "limits": {"max": 10, "enabled": true}})
    );
}

#[tokio::test]
async fn test_untranslated_mode_retranslates_copies() {
    let dir = messages_dir(&[
        ("en", json!({"a": "Hello", "b": "World"})),
        ("ru", json!({"a": "Hello", "b": "Мир"})),
    ]);
    let orchestrator = orchestrator(dir.path(), hello_world(), translator_config(&["ru"]));

    let report = orchestrator.run(&options(DiffMode::Untranslated)).await.unwrap();

    assert_eq!(report.languages[0].missing, 1);
    assert_eq!(read_catalog(dir.path(), "ru"), json!({"a": "X", "b": "Мир"}));
}

#[tokio::test]
async fn test_flat_catalogs() {
    let dir = messages_dir(&[("en", json!({"home.title": "Hello", "home.body": "World"}))]);
    let orchestrator = orchestrator(dir.path(), hello_world(), translator_config(&["ru"]));

    orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    assert_eq!(
        read_catalog(dir.path(), "ru"),
        json!({"home.title": "X", "home.body": "Y"})
    );
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let dir = messages_dir(&[("en", json!({"a": "Hello", "b": "World"}))]);
    let orchestrator = orchestrator(dir.path(), hello_world(), translator_config(&["ru"]));

    let mut opts = options(DiffMode::Missing);
    opts.dry_run = true;
    let report = orchestrator.run(&opts).await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.languages[0].translated, 2);
    assert!(!report.languages[0].persisted);
    assert!(!dir.path().join("ru.json").exists());
}

#[tokio::test]
async fn test_rejected_keys_leave_target_untouched() {
    let dir = messages_dir(&[
        ("en", json!({"greet": "Hello {name}", "a": "Hello"})),
        ("ru", json!({})),
    ]);
    // Drops the placeholder of the first text
    let backend = Arc::new(MockBackend::dictionary(&[("Hello {name}", "Привет"), ("Hello", "X")]));
    let orchestrator = orchestrator(dir.path(), backend, translator_config(&["ru"]));

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    // Skipped keys are reported, they do not fail the language
    assert!(report.success);
    assert_eq!(report.total_skipped(), 1);
    assert_eq!(report.skipped_keys().next().unwrap().1.key, "greet");
    assert_eq!(read_catalog(dir.path(), "ru"), json!({"a": "X"}));
}

// ============================================================================
// Arrays
// ============================================================================

#[tokio::test]
async fn test_array_translation_keeps_its_index_when_an_earlier_element_fails() {
    let dir = messages_dir(&[(
        "en",
        json!({"meta": {"t": "Title"}, "steps": ["Hi {name}", "Second step"]}),
    )]);
    // Renames the placeholder of the first step
    let backend = Arc::new(MockBackend::dictionary(&[
        ("Title", "Заголовок"),
        ("Hi {name}", "Привет {имя}"),
        ("Second step", "Второй шаг"),
    ]));
    let orchestrator = orchestrator(dir.path(), backend, translator_config(&["ru"]));

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    let ru = &report.languages[0];
    assert_eq!(ru.translated, 1);
    let skipped: Vec<(&str, &SkipReason)> = ru.skipped.iter().map(|s| (s.key.as_str(), &s.reason)).collect();
    assert!(matches!(skipped[0], ("steps.0", SkipReason::Validation { .. })));
    assert_eq!(skipped[1], ("steps.1", &SkipReason::ArrayGap));

    // Neither step is written, so both are missing on the next run
    assert_eq!(read_catalog(dir.path(), "ru"), json!({"meta": {"t": "Заголовок"}}));
}

#[tokio::test]
async fn test_array_translation_lands_after_existing_elements() {
    let dir = messages_dir(&[
        ("en", json!({"steps": ["Hi {name}", "Second step"]})),
        ("ru", json!({"steps": ["Привет, {name}"]})),
    ]);
    let backend = Arc::new(MockBackend::dictionary(&[("Second step", "Второй шаг")]));
    let orchestrator = orchestrator(dir.path(), backend.clone(), translator_config(&["ru"]));

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    assert_eq!(report.languages[0].translated, 1);
    assert_eq!(backend.calls(), 1);
    assert_eq!(
        read_catalog(dir.path(), "ru"),
        json!({"steps": ["Привет, {name}", "Второй шаг"]})
    );
}

#[tokio::test]
async fn test_top_level_string_arrays_are_translated() {
    let dir = messages_dir(&[("en", json!({"steps": ["One", "Two"]}))]);
    let backend = Arc::new(MockBackend::dictionary(&[("One", "Один"), ("Two", "Два")]));
    let orchestrator = orchestrator(dir.path(), backend.clone(), translator_config(&["ru"]));

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    assert_eq!(report.languages[0].missing, 2);
    assert!(backend.calls() > 0);
    assert_eq!(read_catalog(dir.path(), "ru"), json!({"steps": ["Один", "Два"]}));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_pass_reports_pending_keys() {
    let dir = messages_dir(&[("en", json!({"a": "Alpha", "b": "Bravo"}))]);
    let cancel = CancellationFlag::new();
    let trigger = cancel.clone();
    let backend = Arc::new(MockBackend::new(move |prompt| {
        trigger.cancel();
        Ok(answer_prompt(prompt, |text| format!("{text} (ru)")))
    }));
    let mut config = translator_config(&["ru", "de"]);
    config.batch_size = 1;
    let orchestrator = Orchestrator::new(
        CatalogStore::new(dir.path()).unwrap(),
        translator(backend, config),
        cancel,
    );

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    assert!(!report.success);
    let ru = &report.languages[0];
    assert_eq!(ru.outcome, LanguageOutcome::Cancelled);
    assert_eq!(ru.pending, vec!["b"]);
    assert!(ru.persisted);
    assert_eq!(read_catalog(dir.path(), "ru"), json!({"a": "Alpha (ru)"}));

    assert_eq!(report.languages[1].outcome, LanguageOutcome::Cancelled);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["languages"][0]["pending"], json!(["b"]));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_invalid_source_fails_every_language() {
    let dir = messages_dir(&[]);
    std::fs::write(dir.path().join("en.json"), "{ not json").unwrap();
    let orchestrator = orchestrator(dir.path(), hello_world(), translator_config(&["ru", "de"]));

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    assert!(!report.success);
    assert_eq!(report.languages.len(), 2);
    for language in &report.languages {
        match &language.outcome {
            LanguageOutcome::Failed { category, .. } => assert_eq!(*category, ErrorCategory::Parsing),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(language.final_state, PassState::Discovering);
    }
}

#[tokio::test]
async fn test_missing_source_is_a_storage_failure() {
    let dir = messages_dir(&[]);
    let orchestrator = orchestrator(dir.path(), hello_world(), translator_config(&["ru"]));

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    assert!(!report.success);
    assert!(matches!(
        report.languages[0].outcome,
        LanguageOutcome::Failed {
            category: ErrorCategory::Storage,
            ..
        }
    ));
}

#[tokio::test]
async fn test_key_conflict_fails_only_that_language() {
    let dir = messages_dir(&[
        ("en", json!({"a": {"b": "Hello"}})),
        ("ru", json!({"a": "Plain"})),
    ]);
    let orchestrator = orchestrator(dir.path(), hello_world(), translator_config(&["de", "ru"]));

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    assert!(!report.success);
    assert_eq!(report.languages[0].outcome, LanguageOutcome::Completed);
    match &report.languages[1].outcome {
        LanguageOutcome::Failed { category, .. } => assert_eq!(*category, ErrorCategory::Structure),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(report.languages[1].final_state, PassState::Merging);
    assert_eq!(read_catalog(dir.path(), "ru"), json!({"a": "Plain"}));
    assert_eq!(read_catalog(dir.path(), "de"), json!({"a": {"b": "X"}}));
}

#[tokio::test]
async fn test_unreachable_backend_persists_nothing() {
    let dir = messages_dir(&[("en", json!({"a": "Hello", "b": "World"}))]);
    let backend = Arc::new(MockBackend::new(|_| {
        Err(intl_sync::llm::BackendError::Unavailable("refused".into()))
    }));
    let orchestrator = orchestrator(dir.path(), backend, translator_config(&["ru"]));

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();

    assert!(matches!(
        report.languages[0].outcome,
        LanguageOutcome::Failed {
            category: ErrorCategory::Network,
            ..
        }
    ));
    assert!(!dir.path().join("ru.json").exists());
}

// ============================================================================
// Discovery and Completeness
// ============================================================================

#[tokio::test]
async fn test_targets_discovered_from_directory() {
    let dir = messages_dir(&[
        ("en", json!({"a": "Hello"})),
        ("ru", json!({})),
        ("de", json!({"a": "Hallo"})),
    ]);
    let orchestrator = orchestrator(dir.path(), hello_world(), translator_config(&[]));

    assert_eq!(orchestrator.target_languages().unwrap(), vec!["de", "ru"]);

    let report = orchestrator.run(&options(DiffMode::Missing)).await.unwrap();
    assert_eq!(report.languages[0].outcome, LanguageOutcome::NothingToDo);
    assert_eq!(report.languages[1].outcome, LanguageOutcome::Completed);
}

#[test]
fn test_check_reports_completeness() {
    let dir = messages_dir(&[
        ("en", json!({"a": "Hello", "b": {"c": "World", "d": "Again"}, "n": 3})),
        ("ru", json!({"a": "X", "b": {"c": "Y"}})),
    ]);
    write_catalog(dir.path(), "de", &json!({}));
    let orchestrator = orchestrator(dir.path(), hello_world(), translator_config(&[]));

    let reports = orchestrator.check(DiffMode::Missing, None).unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].language, "de");
    assert_eq!(reports[0].missing_count(), 3);
    assert_eq!(reports[1].language, "ru");
    assert_eq!(reports[1].missing_keys, vec!["b.d"]);
    assert_eq!(reports[1].total_keys, 3);
    assert!((reports[1].completion_percentage() - 66.666).abs() < 0.01);
}
