use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;

use intl_sync::catalog::{CatalogStore, DiffMode, MissingKeysReport, Structure};
use intl_sync::config::{Config, TranslatorConfig};
use intl_sync::i18n::t;
use intl_sync::llm::OllamaBackend;
use intl_sync::orchestrator::Orchestrator;
use intl_sync::report::{render_completeness, OutputFormat};
use intl_sync::translator::tokens::HeuristicEstimator;
use intl_sync::translator::BatchTranslator;
use intl_sync::utils::CancellationFlag;

/// Exit code when a language is below `--fail-under`
const BELOW_THRESHOLD: u8 = 2;

pub fn check(
    config: Config,
    mode: DiffMode,
    structure: Option<Structure>,
    format: OutputFormat,
    fail_under: Option<f64>,
) -> Result<ExitCode> {
    config.validate().context("Invalid configuration")?;

    // The backend is never called; the orchestrator needs one to exist
    let backend = Arc::new(OllamaBackend::with_config(config.backend.clone())?);
    let mut translator_config = TranslatorConfig::from_settings(&config.translator);
    translator_config.glossary.clear();
    let translator = BatchTranslator::new(backend, Arc::new(HeuristicEstimator), Arc::new(translator_config))?;

    let store = CatalogStore::new(&config.translator.messages_dir)?;
    let orchestrator = Orchestrator::new(store, translator, CancellationFlag::new());

    let reports = orchestrator.check(mode, structure)?;
    if reports.is_empty() {
        println!("{}", t!("cli.check.no_languages"));
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", render_completeness(&reports, format)?);

    let Some(threshold) = fail_under else {
        return Ok(ExitCode::SUCCESS);
    };

    let below = below_threshold(&reports, threshold);
    for report in &below {
        eprintln!(
            "{}",
            t!(
                "cli.check.below_threshold",
                language = report.language,
                threshold = threshold,
                actual = format!("{:.2}", report.completion_percentage())
            )
        );
    }

    Ok(if below.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(BELOW_THRESHOLD)
    })
}

fn below_threshold(reports: &[MissingKeysReport], threshold: f64) -> Vec<&MissingKeysReport> {
    reports
        .iter()
        .filter(|r| r.completion_percentage() < threshold)
        .collect()
}
