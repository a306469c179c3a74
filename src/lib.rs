//! intl-sync - LLM-backed translator for JSON message catalogs
//!
//! Keeps `<lang>.json` catalogs of a messages directory in sync with the
//! source language. Missing keys are translated in numbered batches by a
//! local text-generation backend, and every translation must keep the ICU
//! structure (placeholders, plural/select keywords, rich-text tags) of its
//! original before it is merged.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`catalog`] - Catalog files, flat key mapping, diffing and key order
//! - [`validation`] - Structural checks of candidate translations
//! - [`translator`] - Prompt rendering, batching, budget splitting and fallback
//! - [`llm`] - Text-generation backend abstraction and the Ollama client
//! - [`orchestrator`] - Per-language passes over a messages directory
//! - [`report`] - Completeness and run summaries (table, JSON, markdown)
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use intl_sync::prelude::*;
//! use intl_sync::translator::tokens::HeuristicEstimator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let backend = Arc::new(OllamaBackend::with_config(config.backend.clone())?);
//!     let translator = BatchTranslator::new(
//!         backend,
//!         Arc::new(HeuristicEstimator),
//!         Arc::new(TranslatorConfig::from_settings(&config.translator)),
//!     )?;
//!     let store = CatalogStore::new(&config.translator.messages_dir)?;
//!     let orchestrator = Orchestrator::new(store, translator, CancellationFlag::new());
//!     let report = orchestrator.run(&RunOptions::default()).await?;
//!     println!("{} keys translated", report.total_translated());
//!     Ok(())
//! }
//! ```

// Initialize rust-i18n at crate root level
rust_i18n::i18n!("locales", fallback = "en");

pub mod catalog;
pub mod config;
pub mod error;
pub mod i18n;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod translator;
pub mod utils;
pub mod validation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{CatalogStore, DiffMode, MissingKeysReport, Structure};
    pub use crate::config::{Config, TranslatorConfig};
    pub use crate::error::{Error, ErrorCategory, IntlErrorTrait, Result};
    pub use crate::llm::{Backend, BackendError, OllamaBackend};
    pub use crate::models::{LanguageOutcome, LanguageReport, RunReport, TranslationItem};
    pub use crate::orchestrator::{Orchestrator, RunOptions};
    pub use crate::translator::BatchTranslator;
    pub use crate::utils::CancellationFlag;
    pub use crate::validation::ValidationMode;
}

// Direct re-exports for convenience
pub use models::{LanguageOutcome, LanguageReport, RunReport, TranslationItem};
