pub mod check;
pub mod translate;

use clap::Args;
use std::path::PathBuf;

use intl_sync::catalog::Structure;
use intl_sync::config::Config;

// Re-export command functions for convenience
pub use check::check;
pub use translate::translate;

/// Flags shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// Directory holding <lang>.json catalogs
    #[arg(short, long)]
    pub messages_dir: Option<PathBuf>,

    /// Source language code
    #[arg(short, long)]
    pub source: Option<String>,

    /// Target language codes (repeatable or comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub target: Vec<String>,

    /// Use every catalog found in the messages directory as a target
    #[arg(short, long, conflicts_with = "target")]
    pub all: bool,

    /// Catalogs are single-level objects with dotted keys
    #[arg(long, conflicts_with = "nested")]
    pub flat: bool,

    /// Catalogs are nested objects
    #[arg(long)]
    pub nested: bool,
}

impl CatalogArgs {
    /// Apply command-line overrides on top of file and environment settings
    pub fn apply(&self, config: &mut Config) {
        let t = &mut config.translator;

        if let Some(dir) = &self.messages_dir {
            t.messages_dir = dir.clone();
        }
        if let Some(source) = &self.source {
            t.source_lang = source.clone();
        }
        if self.all {
            t.target_langs.clear();
        } else if !self.target.is_empty() {
            t.target_langs = self.target.clone();
        }
    }

    /// Requested layout; `None` detects it from the source catalog
    pub fn structure(&self) -> Option<Structure> {
        match (self.flat, self.nested) {
            (true, _) => Some(Structure::Flat),
            (_, true) => Some(Structure::Nested),
            _ => None,
        }
    }
}

/// Flags of the translating subcommands
#[derive(Args, Debug, Clone)]
pub struct TranslateArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Maximum generated tokens per item
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Maximum items per batch request
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Token budget for one rendered prompt
    #[arg(long)]
    pub context_budget: Option<usize>,

    /// Glossary file (JSON object of source text to forced translation)
    #[arg(short, long)]
    pub glossary: Option<PathBuf>,

    /// Treat validation warnings as errors
    #[arg(long, default_value = "false")]
    pub strict: bool,

    /// Translate but do not write any file
    #[arg(long, default_value = "false")]
    pub dry_run: bool,

    /// Do not write <file>.bak before replacing a catalog
    #[arg(long, default_value = "false")]
    pub no_backup: bool,

    /// Backend model name
    #[arg(long)]
    pub model: Option<String>,

    /// Backend endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,
}

impl TranslateArgs {
    pub fn apply(&self, config: &mut Config) {
        self.catalog.apply(config);

        let t = &mut config.translator;
        if let Some(v) = self.max_tokens {
            t.max_tokens = v;
        }
        if let Some(v) = self.batch_size {
            t.batch_size = v;
        }
        if let Some(v) = self.context_budget {
            t.context_token_budget = v;
        }
        if let Some(path) = &self.glossary {
            t.glossary_path = Some(path.clone());
        }
        if self.strict {
            t.validation = intl_sync::validation::ValidationMode::Strict;
        }
        if self.no_backup {
            t.backup = false;
        }

        if let Some(model) = &self.model {
            config.backend.model = model.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.backend.endpoint = endpoint.clone();
        }
    }
}
