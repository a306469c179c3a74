use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;

use intl_sync::catalog::CatalogStore;
use intl_sync::config::{Config, TranslatorConfig};
use intl_sync::i18n::t;
use intl_sync::llm::{Backend, OllamaBackend};
use intl_sync::models::{LanguageOutcome, RunReport};
use intl_sync::orchestrator::{Orchestrator, RunOptions};
use intl_sync::report::{render_run_summary, OutputFormat};
use intl_sync::translator::tokens::build_estimator;
use intl_sync::translator::BatchTranslator;
use intl_sync::utils::{format_duration, CancellationFlag};

pub async fn translate(config: Config, options: RunOptions) -> Result<ExitCode> {
    config.validate().context("Invalid configuration")?;

    let backend = Arc::new(
        OllamaBackend::with_config(config.backend.clone()).context("Failed to create backend client")?,
    );
    if !backend.is_available().await {
        eprintln!(
            "{}",
            t!(
                "cli.translate.backend_unreachable",
                model = config.backend.model,
                endpoint = config.backend.endpoint
            )
        );
    }

    let estimator = build_estimator(&config.tokenizer).context("Failed to load tokenizer")?;
    let translator = BatchTranslator::new(
        backend,
        estimator,
        Arc::new(TranslatorConfig::from_settings(&config.translator)),
    )?;
    let store = CatalogStore::new(&config.translator.messages_dir)?;

    let cancel = CancellationFlag::new();
    spawn_interrupt_handler(cancel.clone());

    let orchestrator = Orchestrator::new(store, translator, cancel);
    let languages = orchestrator.target_languages()?;

    println!(
        "{}",
        t!(
            "cli.translate.starting",
            count = languages.len(),
            source = config.translator.source_lang
        )
    );
    println!("================================");
    if options.dry_run {
        println!("{}", t!("cli.translate.dry_run"));
    }

    let report = orchestrator.run(&options).await?;
    print_report(&report)?;

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// First Ctrl-C stops the run after the batch in flight
fn spawn_interrupt_handler(cancel: CancellationFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", t!("cli.translate.interrupt"));
            cancel.cancel();
        }
    });
}

fn print_report(report: &RunReport) -> Result<()> {
    println!();
    for language in &report.languages {
        let line = match &language.outcome {
            LanguageOutcome::Completed => t!(
                "cli.translate.language_done",
                language = language.language,
                translated = language.translated,
                missing = language.missing,
                skipped = language.skipped.len(),
                elapsed = format_duration(language.elapsed_secs)
            ),
            LanguageOutcome::NothingToDo => {
                t!("cli.translate.nothing_to_do", language = language.language)
            }
            LanguageOutcome::Failed { error, category } => t!(
                "cli.translate.failed",
                language = language.language,
                category = category.localized_desc(),
                error = error
            ),
            LanguageOutcome::Cancelled => t!("cli.translate.cancelled", language = language.language),
        };
        println!("{line}");
    }

    let pending: Vec<&String> = report.languages.iter().flat_map(|l| &l.pending).collect();
    if !pending.is_empty() {
        println!();
        for key in pending {
            println!("{}", t!("cli.translate.pending_key", key = key));
        }
    }

    if report.total_skipped() > 0 {
        println!();
        for (_, skipped) in report.skipped_keys() {
            println!(
                "{}",
                t!(
                    "cli.translate.skipped_key",
                    key = skipped.key,
                    reason = skipped.reason
                )
            );
        }
    }

    println!();
    println!("{}", render_run_summary(report, OutputFormat::Table)?);
    println!();

    if report.success {
        println!("{}", t!("cli.translate.summary_ok"));
    } else {
        println!("{}", t!("cli.translate.summary_failed"));
    }

    Ok(())
}
