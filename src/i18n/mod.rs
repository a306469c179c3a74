//! Internationalization (i18n) support for intl-sync
//!
//! CLI summaries and error descriptions are localized. Supported languages:
//! English (en) and Korean (ko).
//!
//! # Environment Variables
//!
//! - `INTL_SYNC_LANG`: Set the preferred language (en, ko). Defaults to English.
//!
//! # Usage
//!
//! ```rust,ignore
//! use intl_sync::i18n::{set_locale, t};
//!
//! set_locale("ko");
//! let msg = t!("cli.run.finished");
//! ```

use std::sync::OnceLock;

// Note: rust_i18n::i18n! macro is declared in lib.rs (crate root)

static CURRENT_LOCALE: OnceLock<String> = OnceLock::new();

/// Set the current locale for translations
pub fn set_locale(locale: &str) {
    let normalized = normalize_locale(locale);
    rust_i18n::set_locale(normalized);
    CURRENT_LOCALE.get_or_init(|| normalized.to_string());
}

/// Get the locale chosen at startup, or the fallback
pub fn current_locale() -> &'static str {
    CURRENT_LOCALE.get().map(|s| s.as_str()).unwrap_or("en")
}

/// Initialize i18n from `INTL_SYNC_LANG`, falling back to `LANG`
pub fn init_from_env() {
    let locale = std::env::var("INTL_SYNC_LANG")
        .or_else(|_| std::env::var("LANG"))
        .unwrap_or_else(|_| "en".to_string());
    set_locale(&locale);
}

/// Map locale spellings to a supported locale:
/// `ko-KR`, `ko_KR.UTF-8`, `korean` become `ko`, everything else `en`
fn normalize_locale(locale: &str) -> &'static str {
    let lower = locale.to_lowercase();

    if lower.starts_with("ko") || lower == "korean" {
        "ko"
    } else {
        "en"
    }
}

/// Translate a key with optional parameters
///
/// This is a re-export of rust_i18n::t! for convenience.
///
/// ```rust,ignore
/// use intl_sync::i18n::t;
///
/// let msg = t!("cli.translate.language_done", language = "ru", translated = 10);
/// ```
#[doc(inline)]
pub use rust_i18n::t;
