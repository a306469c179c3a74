//! Text-generation backends
//!
//! The translator only needs a single capability from a backend: turn a
//! prompt into the full generated text. [`Backend`] is that contract, and
//! [`OllamaBackend`] implements it against a local Ollama server.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::utils::retry::{with_retry_if, RetryConfig};

/// Errors raised by a backend call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend cannot be reached at all
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer in time
    #[error("Backend request timed out: {0}")]
    Timeout(String),

    /// The backend answered with a non-success status
    #[error("Backend request failed: {status} - {body}")]
    Status { status: u16, body: String },

    /// The backend returned no text
    #[error("Backend returned an empty response")]
    EmptyResponse,

    /// The backend response could not be decoded
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// Client-side failure building or sending the request
    #[error("Backend client error: {0}")]
    Client(String),
}

impl BackendError {
    /// The backend is unreachable, so no later call can succeed either
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Worth retrying the same request
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Unavailable(err.to_string())
        } else if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Client(err.to_string())
        }
    }
}

/// Text-generation capability used by the translator
#[async_trait]
pub trait Backend: Send + Sync {
    /// Generate the complete response for `prompt`, bounded by `max_new_tokens`
    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String, BackendError>;

    /// Short name for logs
    fn name(&self) -> &str;

    /// Whether the backend answers at all
    async fn is_available(&self) -> bool {
        true
    }
}

/// Configuration for the Ollama backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama endpoint URL (default: http://localhost:11434)
    pub endpoint: String,

    /// Model name to use
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for generation (0.0 - 1.0)
    pub temperature: f32,

    /// Retries for transient failures (timeouts, 429, 5xx)
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds
    pub retry_base_delay_ms: u64,

    /// Upper bound for backoff delay in milliseconds
    pub retry_max_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "translategemma:4b".to_string(),
            timeout_secs: 120,
            temperature: 0.1,
            max_retries: 2,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 5_000,
        }
    }
}

impl LlmConfig {
    /// Override fields from `OLLAMA_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("OLLAMA_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            self.model = model;
        }
        if let Some(timeout) = std::env::var("OLLAMA_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.timeout_secs = timeout;
        }
        if let Some(temperature) = std::env::var("OLLAMA_TEMPERATURE")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.temperature = temperature;
        }
    }

    fn retry_config(&self) -> RetryConfig {
        RetryConfig::with_delays(
            self.max_retries,
            self.retry_base_delay_ms,
            self.retry_max_delay_ms,
        )
    }
}

/// Ollama generate request
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama generate response
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    #[allow(dead_code)]
    done: bool,
}

/// Backend talking to an Ollama server over HTTP
pub struct OllamaBackend {
    client: Client,
    config: LlmConfig,
    retry: RetryConfig,
}

impl OllamaBackend {
    /// Create a backend with the default config
    pub fn new() -> Result<Self, BackendError> {
        Self::with_config(LlmConfig::default())
    }

    /// Create a backend with a custom config
    pub fn with_config(config: LlmConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Client(format!("Failed to create HTTP client: {e}")))?;

        let retry = config.retry_config();
        Ok(Self {
            client,
            config,
            retry,
        })
    }

    /// Backend configuration
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn generate_once(&self, prompt: &str, max_new_tokens: u32) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));

        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: max_new_tokens,
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        if ollama_response.response.trim().is_empty() {
            return Err(BackendError::EmptyResponse);
        }

        Ok(ollama_response.response)
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    async fn generate(&self, prompt: &str, max_new_tokens: u32) -> Result<String, BackendError> {
        tracing::debug!(
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            max_new_tokens,
            "Sending generate request"
        );

        with_retry_if(
            &self.retry,
            || self.generate_once(prompt, max_new_tokens),
            BackendError::is_transient,
        )
        .await
    }

    fn name(&self) -> &str {
        &self.config.model
    }

    /// Check if Ollama is available
    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.endpoint.trim_end_matches('/'));
        matches!(self.client.get(&url).send().await, Ok(r) if r.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = LlmConfig::default();
        assert_eq!(config.endpoint, "http://localhost:11434");
        assert_eq!(config.model, "translategemma:4b");
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_config_from_partial_toml() {
        let config: LlmConfig = toml::from_str(r#"model = "qwen2.5:7b""#).unwrap();
        assert_eq!(config.model, "qwen2.5:7b");
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_error_classification() {
        assert!(BackendError::Unavailable("refused".into()).is_unavailable());
        assert!(BackendError::Timeout("slow".into()).is_transient());
        assert!(BackendError::Status {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!BackendError::Status {
            status: 404,
            body: "model not found".into()
        }
        .is_transient());
        assert!(!BackendError::EmptyResponse.is_transient());
    }

    #[test]
    fn test_request_serialization() {
        let request = OllamaRequest {
            model: "m",
            prompt: "p",
            stream: false,
            options: OllamaOptions {
                temperature: 0.5,
                num_predict: 400,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 400);
    }
}
