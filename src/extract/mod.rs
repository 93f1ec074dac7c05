// ============================================
// WORLDSMITH - Tolerant Structured-Output Extraction
// ============================================

pub mod repair;
mod validate;

use std::fmt;

use serde_json::Value;
use thiserror::Error;

pub use validate::{is_truthy, validate, validate_owned, ValidationError};

/// Characters kept from each end of a text in diagnostics
pub const PREVIEW_CHARS: usize = 500;

/// First and last [`PREVIEW_CHARS`] characters of a (possibly long) text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPreview {
    pub head: String,
    pub tail: String,
    pub total_chars: usize,
}

impl TextPreview {
    pub fn of(text: &str) -> Self {
        let total_chars = text.chars().count();
        let head = text.chars().take(PREVIEW_CHARS).collect();
        let tail = text
            .chars()
            .skip(total_chars.saturating_sub(PREVIEW_CHARS))
            .collect();
        Self {
            head,
            tail,
            total_chars,
        }
    }
}

impl fmt::Display for TextPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total_chars <= PREVIEW_CHARS {
            write!(f, "{}", self.head)
        } else {
            write!(
                f,
                "{} ... [{} chars] ... {}",
                self.head, self.total_chars, self.tail
            )
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no JSON object found in model output: {raw}")]
    NoObjectFound { raw: TextPreview },

    #[error("could not parse repaired JSON at line {line}, column {column}: {message}\n  raw: {raw}\n  repaired: {repaired}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
        raw: TextPreview,
        repaired: TextPreview,
    },
}

impl ExtractionError {
    pub fn user_message(&self) -> &'static str {
        "Could not process the model response."
    }
}

/// Toggles for the optional repair passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExtractOptions {
    /// Insert commas dropped between sibling properties
    #[serde(default = "default_true")]
    pub repair_missing_commas: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            repair_missing_commas: true,
        }
    }
}

/// Recovers a single JSON object from free-form model output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Everything up to, but not including, the strict parse.
    /// `None` when no `{ ... }` span survives the stripping passes.
    pub fn repair(&self, raw: &str) -> Option<String> {
        let text = repair::strip_reasoning(raw);
        let text = repair::strip_fences(&text);
        let sliced = repair::outermost_object(&text)?;

        let text = repair::normalize_string_newlines(sliced);
        let text = repair::remove_trailing_commas(&text);
        let text = if self.options.repair_missing_commas {
            repair::insert_missing_commas(&text)
        } else {
            text
        };
        Some(text)
    }

    pub fn extract(&self, raw: &str) -> Result<Value, ExtractionError> {
        let repaired = self.repair(raw).ok_or_else(|| {
            tracing::debug!(chars = raw.len(), "No JSON object in model output");
            ExtractionError::NoObjectFound {
                raw: TextPreview::of(raw),
            }
        })?;

        match serde_json::from_str::<Value>(&repaired) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(
                    line = e.line(),
                    column = e.column(),
                    error = %e,
                    "Repaired model output is still not valid JSON"
                );
                Err(ExtractionError::Syntax {
                    message: e.to_string(),
                    line: e.line(),
                    column: e.column(),
                    raw: TextPreview::of(raw),
                    repaired: TextPreview::of(&repaired),
                })
            }
        }
    }
}

/// Extract with default options.
pub fn extract(raw: &str) -> Result<Value, ExtractionError> {
    Extractor::new().extract(raw)
}
