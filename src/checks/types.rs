//! Core types for evaluation results.

use serde::{Deserialize, Serialize};

use crate::analysis::Span;
use crate::rules::{Category, Severity};

/// A raw predicate result, before the evaluator attributes it to a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub span: Span,
    pub message: String,
}

impl Hit {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

/// A single detected deviation from the standards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule: &'static str,
    pub category: Category,
    /// Effective severity, after configuration overrides.
    pub severity: Severity,
    pub file: String,
    pub span: Span,
    pub message: String,
}

impl Finding {
    /// Identity used for deduplication.
    pub fn key(&self) -> (&str, &str, Span) {
        (self.rule, &self.file, self.span)
    }
}

/// Numeric limits the predicates apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub max_line_length: usize,
    pub max_file_lines: usize,
    pub max_function_lines: usize,
    /// Minimum characters of doc content.
    pub min_doc_length: usize,
    pub secret_min_length: usize,
    /// Shannon entropy in bits per character.
    pub secret_min_entropy: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_line_length: 100,
            max_file_lines: 500,
            max_function_lines: 50,
            min_doc_length: 10,
            secret_min_length: 8,
            secret_min_entropy: 3.0,
        }
    }
}
