//! Report rendering
//!
//! Completeness reports and run summaries as aligned text tables, JSON, or
//! markdown tables. Rendering is a read-only side channel: nothing here feeds
//! back into translation.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::catalog::MissingKeysReport;
use crate::i18n::t;
use crate::models::{LanguageOutcome, RunReport};
use crate::utils::format_duration;

/// Output format of rendered reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
}

/// Machine-readable completeness of one language
#[derive(Debug, Clone, Serialize)]
struct CompletenessRow<'a> {
    language: &'a str,
    missing_keys: &'a [String],
    missing_count: usize,
    total_keys: usize,
    completion_percentage: f64,
}

impl<'a> From<&'a MissingKeysReport> for CompletenessRow<'a> {
    fn from(report: &'a MissingKeysReport) -> Self {
        Self {
            language: &report.language,
            missing_keys: &report.missing_keys,
            missing_count: report.missing_count(),
            total_keys: report.total_keys,
            completion_percentage: round2(report.completion_percentage()),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Render completeness of every language
pub fn render_completeness(
    reports: &[MissingKeysReport],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    if format == OutputFormat::Json {
        let rows: Vec<CompletenessRow<'_>> = reports.iter().map(CompletenessRow::from).collect();
        return serde_json::to_string_pretty(&rows);
    }

    let headers = [
        t!("report.language").to_string(),
        t!("report.missing").to_string(),
        t!("report.total").to_string(),
        t!("report.completion").to_string(),
    ];
    let rows: Vec<[String; 4]> = reports
        .iter()
        .map(|r| {
            [
                r.language.clone(),
                r.missing_count().to_string(),
                r.total_keys.to_string(),
                format!("{:.2}%", r.completion_percentage()),
            ]
        })
        .collect();

    Ok(render_rows(&headers, &rows, format))
}

/// Render the per-language summary of a translation run
pub fn render_run_summary(report: &RunReport, format: OutputFormat) -> Result<String, serde_json::Error> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(report);
    }

    let headers = [
        t!("report.language").to_string(),
        t!("report.status").to_string(),
        t!("report.translated").to_string(),
        t!("report.skipped").to_string(),
        t!("report.elapsed").to_string(),
    ];
    let rows: Vec<[String; 5]> = report
        .languages
        .iter()
        .map(|l| {
            [
                l.language.clone(),
                outcome_label(&l.outcome),
                format!("{}/{}", l.translated, l.missing),
                l.skipped.len().to_string(),
                format_duration(l.elapsed_secs),
            ]
        })
        .collect();

    Ok(render_rows(&headers, &rows, format))
}

fn outcome_label(outcome: &LanguageOutcome) -> String {
    match outcome {
        LanguageOutcome::Completed => t!("report.outcome.completed"),
        LanguageOutcome::NothingToDo => t!("report.outcome.nothing_to_do"),
        LanguageOutcome::Failed { .. } => t!("report.outcome.failed"),
        LanguageOutcome::Cancelled => t!("report.outcome.cancelled"),
    }
    .to_string()
}

fn render_rows<const N: usize>(headers: &[String; N], rows: &[[String; N]], format: OutputFormat) -> String {
    let mut out = String::new();

    match format {
        OutputFormat::Markdown => {
            let _ = writeln!(out, "| {} |", headers.join(" | "));
            let _ = writeln!(out, "|{}", "---|".repeat(N));
            for row in rows {
                let _ = writeln!(out, "| {} |", row.join(" | "));
            }
        }
        _ => {
            let mut widths = [0usize; N];
            for (i, header) in headers.iter().enumerate() {
                widths[i] = header.chars().count();
            }
            for row in rows {
                for (i, cell) in row.iter().enumerate() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }

            write_aligned(&mut out, headers, &widths);
            let total: usize = widths.iter().sum::<usize>() + 2 * (N - 1);
            let _ = writeln!(out, "{}", "=".repeat(total));
            for row in rows {
                write_aligned(&mut out, row, &widths);
            }
        }
    }

    out.trim_end().to_string()
}

fn write_aligned(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}
