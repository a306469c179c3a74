//! Prompt rendering with Handlebars templates

use handlebars::Handlebars;
use serde::Serialize;

use crate::models::TranslationItem;
use crate::validation;

const BATCH_TEMPLATE: &str = include_str!("../../templates/batch.hbs");
const SINGLE_TEMPLATE: &str = include_str!("../../templates/single.hbs");

/// Prepended once when any text carries placeholders or markup
pub const PLACEHOLDER_INSTRUCTION: &str = "[IMPORTANT: Keep all {placeholders} and <tags> EXACTLY as they are. \
Do NOT translate words inside {curly braces}. \
Translate only the text outside placeholders.]";

#[derive(Debug, Serialize)]
struct NumberedText<'a> {
    number: usize,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchData<'a> {
    instruction: Option<&'static str>,
    count: usize,
    source: String,
    target: String,
    items: Vec<NumberedText<'a>>,
}

#[derive(Debug, Serialize)]
struct SingleData<'a> {
    instruction: Option<&'static str>,
    source: String,
    target: String,
    text: &'a str,
}

/// Renders batch and single-item prompts
pub struct PromptBuilder {
    handlebars: Handlebars<'static>,
}

impl PromptBuilder {
    pub fn new() -> Result<Self, handlebars::TemplateError> {
        let mut handlebars = Handlebars::new();
        // Prompts are plain text, never HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(true);

        handlebars.register_template_string("batch", BATCH_TEMPLATE)?;
        handlebars.register_template_string("single", SINGLE_TEMPLATE)?;

        Ok(Self { handlebars })
    }

    /// Numbered-list prompt for several items, 1-indexed in input order
    pub fn batch(
        &self,
        source_lang: &str,
        target_lang: &str,
        items: &[&TranslationItem],
    ) -> Result<String, handlebars::RenderError> {
        let needs_instruction = items.iter().any(|item| validation::has_structure(&item.text));
        let data = BatchData {
            instruction: needs_instruction.then_some(PLACEHOLDER_INSTRUCTION),
            count: items.len(),
            source: language_label(source_lang),
            target: language_label(target_lang),
            items: items
                .iter()
                .enumerate()
                .map(|(i, item)| NumberedText {
                    number: i + 1,
                    text: &item.text,
                })
                .collect(),
        };

        Ok(self.handlebars.render("batch", &data)?.trim_end().to_string())
    }

    /// Prompt for a single text
    pub fn single(
        &self,
        source_lang: &str,
        target_lang: &str,
        text: &str,
    ) -> Result<String, handlebars::RenderError> {
        let data = SingleData {
            instruction: validation::has_structure(text).then_some(PLACEHOLDER_INSTRUCTION),
            source: language_label(source_lang),
            target: language_label(target_lang),
            text,
        };

        Ok(self.handlebars.render("single", &data)?.trim_end().to_string())
    }
}

/// `Russian (ru)` for known codes, the bare code otherwise
pub fn language_label(code: &str) -> String {
    match language_name(code) {
        Some(name) => format!("{name} ({code})"),
        None => code.to_string(),
    }
}

fn language_name(code: &str) -> Option<&'static str> {
    let base = code.split(['-', '_']).next().unwrap_or(code);
    let name = match base.to_ascii_lowercase().as_str() {
        "ar" => "Arabic",
        "bg" => "Bulgarian",
        "cs" => "Czech",
        "da" => "Danish",
        "de" => "German",
        "el" => "Greek",
        "en" => "English",
        "es" => "Spanish",
        "fa" => "Persian",
        "fi" => "Finnish",
        "fr" => "French",
        "he" => "Hebrew",
        "hi" => "Hindi",
        "hu" => "Hungarian",
        "id" => "Indonesian",
        "it" => "Italian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "nl" => "Dutch",
        "no" | "nb" => "Norwegian",
        "pl" => "Polish",
        "pt" => "Portuguese",
        "ro" => "Romanian",
        "ru" => "Russian",
        "sv" => "Swedish",
        "th" => "Thai",
        "tr" => "Turkish",
        "uk" => "Ukrainian",
        "vi" => "Vietnamese",
        "zh" => "Chinese",
        _ => return None,
    };
    Some(name)
}
