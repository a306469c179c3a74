//! Unified error handling for the intl-sync crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`IntlErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use intl_sync::error::{Error, IntlErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying: {}", err.localized_desc());
//!     } else {
//!         eprintln!("Fatal error: {}", err);
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::catalog::CatalogError;
pub use crate::llm::BackendError;
pub use crate::translator::protocol::BatchParseError;
pub use crate::translator::TranslatorError;

use crate::i18n::t;

/// Common trait for all intl-sync error types
pub trait IntlErrorTrait: std::error::Error {
    /// Check if this error is recoverable (a retry or fallback may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get localized description for user-facing messages
    fn localized_desc(&self) -> String;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Backend connectivity (unreachable, timeout)
    Network,
    /// Backend answered but the answer is unusable
    Llm,
    /// Malformed JSON or batch responses
    Parsing,
    /// Catalog trees that cannot be flattened or restored
    Structure,
    /// File system errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get localized description for the category
    pub fn localized_desc(&self) -> String {
        match self {
            Self::Network => t!("errors.category.network").to_string(),
            Self::Llm => t!("errors.category.llm").to_string(),
            Self::Parsing => t!("errors.category.parsing").to_string(),
            Self::Structure => t!("errors.category.structure").to_string(),
            Self::Storage => t!("errors.category.storage").to_string(),
            Self::Config => t!("errors.category.config").to_string(),
            Self::Other => t!("errors.category.other").to_string(),
        }
    }
}

impl IntlErrorTrait for CatalogError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::KeyConflict { key, path } => {
                t!("errors.catalog.key_conflict", key = key, path = path).to_string()
            }
            Self::ArrayGap { path, index } => {
                t!("errors.catalog.array_gap", path = path, index = index).to_string()
            }
            Self::SeparatorInKey { key, segment } => {
                t!("errors.catalog.separator_in_key", key = key, segment = segment).to_string()
            }
            Self::NotAnObject { found } => t!("errors.catalog.not_an_object", found = found).to_string(),
            Self::DirectoryNotFound(path) => {
                t!("errors.catalog.directory_not_found", path = path.display()).to_string()
            }
            Self::NotFound(path) => t!("errors.catalog.not_found", path = path.display()).to_string(),
            Self::Read { path, source } | Self::Write { path, source } => format!(
                "{}: {source}",
                t!("errors.catalog.io", path = path.display())
            ),
            Self::InvalidJson { path, source } => format!(
                "{}: {source}",
                t!("errors.catalog.invalid_json", path = path.display())
            ),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::KeyConflict { .. }
            | Self::ArrayGap { .. }
            | Self::SeparatorInKey { .. }
            | Self::NotAnObject { .. } => {
                ErrorCategory::Structure
            }
            Self::InvalidJson { .. } => ErrorCategory::Parsing,
            Self::DirectoryNotFound(_) | Self::NotFound(_) | Self::Read { .. } | Self::Write { .. } => {
                ErrorCategory::Storage
            }
        }
    }
}

impl IntlErrorTrait for BackendError {
    fn is_recoverable(&self) -> bool {
        !self.is_unavailable()
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Unavailable(msg) => format!("{}: {msg}", t!("errors.backend.unavailable")),
            Self::Timeout(_) => t!("errors.backend.timeout").to_string(),
            Self::Status { status, .. } => t!("errors.backend.status", status = status).to_string(),
            Self::EmptyResponse => t!("errors.backend.empty").to_string(),
            Self::InvalidResponse(msg) => format!("{}: {msg}", t!("errors.backend.invalid")),
            Self::Client(msg) => format!("{}: {msg}", t!("errors.backend.client")),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) | Self::Client(_) => ErrorCategory::Network,
            Self::Status { .. } | Self::EmptyResponse | Self::InvalidResponse(_) => ErrorCategory::Llm,
        }
    }
}

impl IntlErrorTrait for BatchParseError {
    /// The batch falls back to single-item requests
    fn is_recoverable(&self) -> bool {
        true
    }

    fn localized_desc(&self) -> String {
        format!("{}: {self}", t!("errors.batch.parse"))
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Parsing
    }
}

impl IntlErrorTrait for TranslatorError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::BackendUnavailable(e) => e.localized_desc(),
            Self::Template(msg) => format!("{}: {msg}", t!("errors.translator.template")),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::BackendUnavailable(_) => ErrorCategory::Network,
            Self::Template(_) => ErrorCategory::Config,
        }
    }
}

/// Unified error type for the intl-sync crate
///
/// This enum wraps all domain-specific errors, providing a single error type
/// that can be used across module boundaries while preserving the detailed
/// error information.
#[derive(Error, Debug)]
pub enum Error {
    /// Catalog loading, restoring or persisting errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Backend call errors
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Batch response protocol errors
    #[error("Batch parse error: {0}")]
    BatchParse(#[from] BatchParseError),

    /// Errors that abort a translation pass
    #[error("Translator error: {0}")]
    Translator(#[from] TranslatorError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl IntlErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Catalog(e) => e.is_recoverable(),
            Self::Backend(e) => e.is_recoverable(),
            Self::BatchParse(e) => e.is_recoverable(),
            Self::Translator(e) => e.is_recoverable(),
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Catalog(e) => e.localized_desc(),
            Self::Backend(e) => e.localized_desc(),
            Self::BatchParse(e) => e.localized_desc(),
            Self::Translator(e) => e.localized_desc(),
            Self::Io(e) => format!("{}: {e}", t!("errors.io.error")),
            Self::Json(e) => format!("{}: {e}", t!("errors.json.error")),
            Self::Config(msg) => format!("{}: {msg}", t!("errors.config.error")),
            Self::Other { context, .. } => context.clone(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Catalog(e) => e.category(),
            Self::Backend(e) => e.category(),
            Self::BatchParse(e) => e.category(),
            Self::Translator(e) => e.category(),
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
