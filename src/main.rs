// CLI messages are looked up from the binary crate too
rust_i18n::i18n!("locales", fallback = "en");

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{CatalogArgs, TranslateArgs};
use intl_sync::catalog::DiffMode;
use intl_sync::config::Config;
use intl_sync::orchestrator::RunOptions;
use intl_sync::report::OutputFormat;

#[derive(Parser)]
#[command(
    name = "intl-sync",
    version,
    about = "Translate JSON message catalogs with a local LLM, keeping ICU structure intact",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (pretty, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate every source key, overwriting existing translations
    TranslateAll {
        #[command(flatten)]
        args: TranslateArgs,
    },

    /// Translate only keys the target catalogs lack
    TranslateMissing {
        #[command(flatten)]
        args: TranslateArgs,

        /// Also retranslate keys whose text equals the source text
        #[arg(long, default_value = "false")]
        include_untranslated: bool,
    },

    /// Report completeness of the target catalogs
    Check {
        #[command(flatten)]
        args: CatalogArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output_format: OutputFormat,

        /// Exit with status 2 when a language is below this completion percentage
        #[arg(long)]
        fail_under: Option<f64>,

        /// Count keys whose text equals the source text as missing
        #[arg(long, default_value = "false")]
        include_untranslated: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    intl_sync::i18n::init_from_env();

    let mut config = Config::load(cli.config.as_deref())?;

    // Initialize tracing/logging
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("intl-sync starting");

    let code = match cli.command {
        Commands::TranslateAll { args } => {
            args.apply(&mut config);
            tracing::info!(
                messages_dir = %config.translator.messages_dir.display(),
                dry_run = %args.dry_run,
                "Starting translate-all command"
            );
            let options = run_options(&args, &config, DiffMode::All);
            commands::translate(config, options).await?
        }

        Commands::TranslateMissing {
            args,
            include_untranslated,
        } => {
            args.apply(&mut config);
            let mode = if include_untranslated {
                DiffMode::Untranslated
            } else {
                DiffMode::Missing
            };
            tracing::info!(
                messages_dir = %config.translator.messages_dir.display(),
                mode = ?mode,
                dry_run = %args.dry_run,
                "Starting translate-missing command"
            );
            let options = run_options(&args, &config, mode);
            commands::translate(config, options).await?
        }

        Commands::Check {
            args,
            output_format,
            fail_under,
            include_untranslated,
        } => {
            args.apply(&mut config);
            let mode = if include_untranslated {
                DiffMode::Untranslated
            } else {
                DiffMode::Missing
            };
            tracing::info!(
                messages_dir = %config.translator.messages_dir.display(),
                format = ?output_format,
                fail_under = ?fail_under,
                "Starting check command"
            );
            commands::check(config, mode, args.structure(), output_format, fail_under)?
        }
    };

    tracing::info!("intl-sync finished");
    Ok(code)
}

fn run_options(args: &TranslateArgs, config: &Config, mode: DiffMode) -> RunOptions {
    RunOptions {
        mode,
        structure: args.catalog.structure(),
        dry_run: args.dry_run,
        backup: config.translator.backup,
    }
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("intl_sync=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("intl_sync={level},warn"))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
