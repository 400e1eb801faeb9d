//! The closed set of supported languages.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CheckError;

/// Languages the checker has adapters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Terraform,
    JavaScript,
    Python,
}

impl Language {
    /// Every supported language, in registry order.
    pub const ALL: [Language; 3] = [Language::Terraform, Language::JavaScript, Language::Python];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Terraform => "terraform",
            Language::JavaScript => "javascript",
            Language::Python => "python",
        }
    }

    /// File extensions (without dot) handled by this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Terraform => &["tf"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::Python => &["py"],
        }
    }

    /// Determine the language from a file extension (without dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "tf" => Some(Language::Terraform),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "py" => Some(Language::Python),
            _ => None,
        }
    }

    /// Determine the language of a path, failing with `UnsupportedLanguage`.
    pub fn from_path(path: &Path) -> Result<Self, CheckError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext).ok_or_else(|| {
            let shown = if ext.is_empty() {
                format!("{} (no extension)", path.display())
            } else {
                format!(".{}", ext)
            };
            CheckError::UnsupportedLanguage(shown)
        })
    }

    /// Parse a language name or common alias.
    pub fn parse(s: &str) -> Result<Self, CheckError> {
        match s.to_lowercase().as_str() {
            "terraform" | "tf" | "hcl" => Ok(Language::Terraform),
            "javascript" | "js" => Ok(Language::JavaScript),
            "python" | "py" => Ok(Language::Python),
            _ => Err(CheckError::UnsupportedLanguage(s.to_string())),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::parse(s)
    }
}
