//! Core traits for language adapters.

use crate::error::CheckError;
use crate::language::Language;

use super::SourceUnit;

/// Language-specific adapter trait.
///
/// Each supported language implements this trait to turn raw source text
/// into a normalized `SourceUnit`. Adapters are purely structural: they
/// never execute or evaluate the source.
///
/// # Thread Safety
///
/// tree_sitter::Parser is not Sync, so implementations create parsers
/// per call.
pub trait LanguageAdapter: Send + Sync {
    /// The language this adapter handles.
    fn language(&self) -> Language;

    /// Parse source text into a `SourceUnit`.
    ///
    /// Returns `CheckError::Parse` with the best-effort location of the first
    /// syntax error when the input cannot be analyzed.
    fn parse(&self, path: &str, source: &str) -> Result<SourceUnit, CheckError>;

    /// Check if this adapter handles the given file extension (without dot).
    fn handles_extension(&self, ext: &str) -> bool {
        self.language().extensions().contains(&ext)
    }
}
