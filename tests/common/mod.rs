//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use intl_sync::catalog::CatalogStore;
use intl_sync::config::TranslatorConfig;
use intl_sync::llm::{Backend, BackendError};
use intl_sync::orchestrator::Orchestrator;
use intl_sync::translator::tokens::HeuristicEstimator;
use intl_sync::translator::BatchTranslator;
use intl_sync::utils::CancellationFlag;

type Responder = Box<dyn Fn(&str) -> Result<String, BackendError> + Send + Sync>;

/// Backend answering from a closure and recording every prompt
pub struct MockBackend {
    responder: Responder,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new(responder: impl Fn(&str) -> Result<String, BackendError> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Translates known texts from `pairs`, marks unknown ones with a suffix
    pub fn dictionary(pairs: &[(&str, &str)]) -> Self {
        let words: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::new(move |prompt| {
            Ok(answer_prompt(prompt, |text| {
                words
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| format!("{text} [tr]"))
            }))
        })
    }

    /// Replays `responses` in order; fails as unavailable once exhausted
    pub fn scripted(responses: Vec<Result<String, BackendError>>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::Unavailable("script exhausted".into())))
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn generate(&self, prompt: &str, _max_new_tokens: u32) -> Result<String, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.responder)(prompt)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Whether a prompt is a numbered batch prompt
pub fn is_batch_prompt(prompt: &str) -> bool {
    prompt.contains("numbered lines")
}

/// Texts listed in a batch prompt, in order
pub fn batch_texts(prompt: &str) -> Vec<String> {
    let body = prompt
        .split_once("and nothing else.")
        .map_or(prompt, |(_, body)| body);
    body.lines()
        .filter_map(|line| line.split_once(". "))
        .filter(|(number, _)| number.chars().all(|c| c.is_ascii_digit()))
        .map(|(_, text)| text.to_string())
        .collect()
}

/// Text of a single-item prompt
pub fn single_text(prompt: &str) -> String {
    prompt
        .split_once("Reply with the translation only.\n\n")
        .map_or(prompt, |(_, text)| text)
        .to_string()
}

/// Answer a batch or single prompt by translating each text with `translate`
pub fn answer_prompt(prompt: &str, translate: impl Fn(&str) -> String) -> String {
    if is_batch_prompt(prompt) {
        batch_texts(prompt)
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{}. {}", i + 1, translate(text)))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        translate(&single_text(prompt))
    }
}

/// Translator config targeting `targets` from English
pub fn translator_config(targets: &[&str]) -> TranslatorConfig {
    TranslatorConfig {
        target_langs: targets.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

pub fn translator(backend: Arc<MockBackend>, config: TranslatorConfig) -> BatchTranslator {
    BatchTranslator::new(backend, Arc::new(HeuristicEstimator), Arc::new(config)).unwrap()
}

pub fn orchestrator(dir: &Path, backend: Arc<MockBackend>, config: TranslatorConfig) -> Orchestrator {
    let store = CatalogStore::new(dir).unwrap();
    Orchestrator::new(store, translator(backend, config), CancellationFlag::new())
}

/// Messages directory with one `<lang>.json` per entry
pub fn messages_dir(catalogs: &[(&str, Value)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (language, data) in catalogs {
        write_catalog(dir.path(), language, data);
    }
    dir
}

pub fn write_catalog(dir: &Path, language: &str, data: &Value) {
    let content = serde_json::to_string_pretty(data).unwrap();
    std::fs::write(dir.join(format!("{language}.json")), content).unwrap();
}

pub fn read_catalog(dir: &Path, language: &str) -> Value {
    let content = std::fs::read_to_string(dir.join(format!("{language}.json"))).unwrap();
    serde_json::from_str(&content).unwrap()
}
