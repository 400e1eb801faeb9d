//! Error taxonomy for the checker.
//!
//! Per-file errors (`UnsupportedLanguage`, `Parse`, `Io`) are turned into
//! findings or skipped entries by the runner; `Configuration` is fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring or running a check.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("{path}:{line}:{column}: could not parse: {message}")]
    Parse {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckError {
    /// Build a parse error at a 1-indexed location.
    pub fn parse(path: &str, line: usize, column: usize, message: impl Into<String>) -> Self {
        CheckError::Parse {
            path: path.to_string(),
            line: line.max(1),
            column: column.max(1),
            message: message.into(),
        }
    }

    /// Build a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        CheckError::Configuration(message.into())
    }

    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CheckError::Configuration(_))
    }
}
