//! Prompt size estimation
//!
//! Batches are split against a token budget measured on the rendered prompt.
//! The default estimate needs no model files; a HuggingFace tokenizer can be
//! loaded for exact counts when the backend model's tokenizer is available.

use anyhow::Result;
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::Tokenizer;

/// Counts tokens of a prompt
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// `ceil(chars / 4) + lines`
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        let chars = text.chars().count();
        chars.div_ceil(4) + text.lines().count()
    }
}

/// Exact counts from a HuggingFace `tokenizer.json`
pub struct HfTokenizerEstimator {
    tokenizer: Tokenizer,
}

impl HfTokenizerEstimator {
    /// Load a tokenizer from a local file
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer from {}: {e}", path.display()))?;
        Ok(Self { tokenizer })
    }

    /// Download a model's tokenizer from the HuggingFace Hub
    pub fn from_pretrained(model_id: &str) -> Result<Self> {
        let api =
            Api::new().map_err(|e| anyhow::anyhow!("Failed to create HuggingFace API: {e}"))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| anyhow::anyhow!("Failed to download tokenizer for {model_id}: {e}"))?;

        Self::from_file(&tokenizer_path)
    }
}

impl TokenEstimator for HfTokenizerEstimator {
    fn estimate(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.get_ids().len(),
            Err(e) => {
                tracing::warn!(error = %e, "Tokenization failed, using heuristic estimate");
                HeuristicEstimator.estimate(text)
            }
        }
    }
}

/// Which estimator to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    #[default]
    Heuristic,
    HuggingFace,
}

/// `[tokenizer]` configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub kind: TokenizerKind,

    /// Local `tokenizer.json`, preferred over `model_id`
    pub path: Option<PathBuf>,

    /// HuggingFace model id to download the tokenizer from
    pub model_id: Option<String>,
}

/// Build the configured estimator
pub fn build_estimator(config: &TokenizerConfig) -> Result<Arc<dyn TokenEstimator>> {
    match config.kind {
        TokenizerKind::Heuristic => Ok(Arc::new(HeuristicEstimator)),
        TokenizerKind::HuggingFace => {
            let estimator = match (&config.path, &config.model_id) {
                (Some(path), _) => HfTokenizerEstimator::from_file(path)?,
                (None, Some(model_id)) => HfTokenizerEstimator::from_pretrained(model_id)?,
                (None, None) => {
                    anyhow::bail!("tokenizer.kind = \"huggingface\" needs tokenizer.path or tokenizer.model_id")
                }
            };
            tracing::info!(
                path = ?config.path,
                model_id = ?config.model_id,
                "HuggingFace tokenizer loaded"
            );
            Ok(Arc::new(estimator))
        }
    }
}
