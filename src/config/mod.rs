//! Configuration management for intl-sync
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables, then command-line flags (applied by the commands).

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::llm::LlmConfig;
use crate::translator::tokens::TokenizerConfig;
use crate::validation::ValidationMode;

/// Glossary picked up from the working directory when none is given
pub const DEFAULT_GLOSSARY_PATH: &str = "glossary.json";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Translation run settings
    pub translator: TranslatorSettings,

    /// Text-generation backend
    pub backend: LlmConfig,

    /// Prompt size estimation
    pub tokenizer: TokenizerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// `[translator]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorSettings {
    /// Directory holding `<lang>.json` catalogs
    pub messages_dir: PathBuf,

    /// Source language code
    pub source_lang: String,

    /// Target language codes; empty means every catalog found besides the source
    pub target_langs: Vec<String>,

    /// Maximum items per batch request
    pub batch_size: usize,

    /// Maximum generated tokens per item
    pub max_tokens: u32,

    /// Token budget for one rendered prompt
    pub context_token_budget: usize,

    /// Validation policy
    pub validation: ValidationMode,

    /// Write `<file>.bak` before replacing a catalog
    pub backup: bool,

    /// Glossary file (JSON object of source text to forced translation)
    pub glossary_path: Option<PathBuf>,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            messages_dir: PathBuf::from("messages"),
            source_lang: String::from("en"),
            target_langs: Vec::new(),
            batch_size: 20,
            max_tokens: 200,
            context_token_budget: 18_000,
            validation: ValidationMode::Relaxed,
            backup: true,
            glossary_path: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("pretty"),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Defaults, then the optional file, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Override fields from `INTL_SYNC_*` and `OLLAMA_*` variables
    pub fn apply_env(&mut self) {
        let t = &mut self.translator;

        if let Ok(dir) = std::env::var("INTL_SYNC_MESSAGES_DIR") {
            t.messages_dir = PathBuf::from(dir);
        }
        if let Ok(source) = std::env::var("INTL_SYNC_SOURCE_LANG") {
            t.source_lang = source;
        }
        if let Ok(targets) = std::env::var("INTL_SYNC_TARGET_LANGS") {
            t.target_langs = targets
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = env_parse("INTL_SYNC_BATCH_SIZE") {
            t.batch_size = v;
        }
        if let Some(v) = env_parse("INTL_SYNC_MAX_TOKENS") {
            t.max_tokens = v;
        }
        if let Some(v) = env_parse("INTL_SYNC_CONTEXT_BUDGET") {
            t.context_token_budget = v;
        }
        if let Ok(path) = std::env::var("INTL_SYNC_GLOSSARY") {
            t.glossary_path = Some(PathBuf::from(path));
        }
        if let Ok(level) = std::env::var("INTL_SYNC_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("INTL_SYNC_LOG_FORMAT") {
            self.logging.format = format;
        }

        self.backend.apply_env();
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let t = &self.translator;

        if t.source_lang.trim().is_empty() {
            anyhow::bail!("source_lang must not be empty");
        }

        if t.batch_size == 0 {
            anyhow::bail!("batch_size must be greater than 0");
        }

        if t.max_tokens == 0 {
            anyhow::bail!("max_tokens must be greater than 0");
        }

        if t.context_token_budget == 0 {
            anyhow::bail!("context_token_budget must be greater than 0");
        }

        if t.target_langs.iter().any(|lang| lang == &t.source_lang) {
            anyhow::bail!("target_langs must not contain the source language '{}'", t.source_lang);
        }

        if !(0.0..=2.0).contains(&self.backend.temperature) {
            anyhow::bail!("backend.temperature must be between 0.0 and 2.0");
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Immutable settings handed to the translator for one run
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub source_lang: String,
    pub target_langs: Vec<String>,
    pub batch_size: usize,
    pub max_tokens: u32,
    pub context_token_budget: usize,
    pub validation: ValidationMode,
    /// Source text to forced translation; empty when no glossary is loaded
    pub glossary: IndexMap<String, String>,
}

impl TranslatorConfig {
    /// Build from settings, resolving and loading the glossary
    pub fn from_settings(settings: &TranslatorSettings) -> Self {
        let glossary = resolve_glossary_path(settings.glossary_path.as_deref())
            .map(|path| load_glossary(&path))
            .unwrap_or_default();

        Self {
            source_lang: settings.source_lang.clone(),
            target_langs: settings.target_langs.clone(),
            batch_size: settings.batch_size.max(1),
            max_tokens: settings.max_tokens,
            context_token_budget: settings.context_token_budget,
            validation: settings.validation,
            glossary,
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        let settings = TranslatorSettings::default();
        Self {
            source_lang: settings.source_lang,
            target_langs: settings.target_langs,
            batch_size: settings.batch_size,
            max_tokens: settings.max_tokens,
            context_token_budget: settings.context_token_budget,
            validation: settings.validation,
            glossary: IndexMap::new(),
        }
    }
}

/// Explicit path, else `./glossary.json` if it exists
pub fn resolve_glossary_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let default_path = PathBuf::from(DEFAULT_GLOSSARY_PATH);
    default_path.is_file().then_some(default_path)
}

/// Load a glossary file.
///
/// A glossary that cannot be used is reported and skipped, never fatal.
pub fn load_glossary(path: &Path) -> IndexMap<String, String> {
    match try_load_glossary(path) {
        Ok(glossary) => {
            tracing::info!(path = %path.display(), terms = glossary.len(), "Glossary loaded");
            glossary
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = ?e, "Glossary ignored");
            IndexMap::new()
        }
    }
}

fn try_load_glossary(path: &Path) -> Result<IndexMap<String, String>> {
    if !path.exists() {
        anyhow::bail!("Glossary not found");
    }

    let content = std::fs::read_to_string(path).context("Unable to read glossary")?;
    let value: serde_json::Value =
        serde_json::from_str(&content).context("Invalid glossary JSON")?;

    let serde_json::Value::Object(map) = value else {
        anyhow::bail!("Glossary must be a JSON object");
    };

    let mut glossary = IndexMap::with_capacity(map.len());
    for (term, translation) in map {
        match translation {
            serde_json::Value::String(translation) => {
                glossary.insert(term, translation);
            }
            other => {
                tracing::warn!(term = %term, value = %other, "Glossary entry is not a string, skipped");
            }
        }
    }

    Ok(glossary)
}
