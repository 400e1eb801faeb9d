//! Conformcheck - standards conformance checker.
//!
//! Conformcheck checks Terraform, JavaScript and Python sources against a
//! fixed catalog of formatting, naming, documentation, error-handling,
//! security and performance rules, and reports every deviation with a
//! precise location.
//!
//! # Architecture
//!
//! - `analysis`: language adapters that turn source text into a `SourceUnit`
//! - `rules`: the immutable rule registry
//! - `checks`: rule predicates, the evaluator and the per-run pipeline
//! - `report`: aggregation and rendering (text, JSONL, JSON, SARIF)
//! - `config`: YAML configuration
//! - `fix`: optional external formatter pass
//!
//! # Adding a New Rule
//!
//! Write a predicate in the matching `checks` module and add a `Rule` entry
//! to `src/rules/catalog.rs`. Predicates only see the `SourceUnit`, never
//! the raw syntax tree.

pub mod analysis;
pub mod checks;
pub mod cli;
pub mod config;
pub mod error;
pub mod fix;
pub mod language;
pub mod report;
pub mod rules;

pub use analysis::{
    adapter_for, register_adapters, Declaration, DeclarationKind, LanguageAdapter, SourceUnit,
    Span,
};
pub use checks::{evaluate, CancelFlag, Evaluator, Finding, Runner, Thresholds};
pub use config::Config;
pub use error::CheckError;
pub use language::Language;
pub use report::{aggregate, render, Format, Report};
pub use rules::{find_rule, list_rules, Category, Rule, Severity};

/// Parse one source text with the adapter for `language`.
pub fn parse_source(language: Language, path: &str, source: &str) -> Result<SourceUnit, CheckError> {
    let adapter = adapter_for(language)
        .map_err(|e| CheckError::parse(path, 1, 1, format!("no usable {} adapter: {}", language, e)))?;
    adapter.parse(path, source)
}
