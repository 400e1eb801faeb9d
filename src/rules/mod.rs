//! The rule registry: an immutable catalog of conformance rules.
//!
//! Rules are plain data plus a predicate. The catalog is a static slice, so
//! lookups never allocate rules and every finding can point back to a
//! `&'static Rule`.

mod catalog;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::analysis::SourceUnit;
use crate::checks::{Hit, Thresholds};
use crate::error::CheckError;
use crate::language::Language;

pub use catalog::RULES;

/// Severity levels for findings. Declaration order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Error, Severity::Warning, Severity::Info];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    /// Blocking findings fail the run; advisory ones only inform.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Rule categories, mirroring the sections of the standards guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Formatting,
    Naming,
    Documentation,
    ErrorHandling,
    Security,
    Performance,
    Organization,
    /// Meta rules for files that could not be analyzed.
    Analysis,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Formatting,
        Category::Naming,
        Category::Documentation,
        Category::ErrorHandling,
        Category::Security,
        Category::Performance,
        Category::Organization,
        Category::Analysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Formatting => "formatting",
            Category::Naming => "naming",
            Category::Documentation => "documentation",
            Category::ErrorHandling => "error_handling",
            Category::Security => "security",
            Category::Performance => "performance",
            Category::Organization => "organization",
            Category::Analysis => "analysis",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule predicate: raw hits for one unit under the given thresholds.
pub type Predicate = fn(&SourceUnit, &Thresholds) -> Vec<Hit>;

/// A conformance rule.
#[derive(Debug, Serialize)]
pub struct Rule {
    /// Stable snake_case identifier.
    pub id: &'static str,
    pub category: Category,
    /// Default severity, before configuration overrides.
    pub severity: Severity,
    pub languages: &'static [Language],
    pub description: &'static str,
    /// `None` for meta rules raised by the runner itself.
    #[serde(skip)]
    pub check: Option<Predicate>,
}

impl Rule {
    pub fn applies_to(&self, language: Language) -> bool {
        self.languages.contains(&language)
    }

    pub fn is_meta(&self) -> bool {
        self.check.is_none()
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Rule {}

/// The whole catalog, in registry order.
pub fn all_rules() -> &'static [Rule] {
    RULES
}

/// Look a rule up by id.
pub fn find_rule(id: &str) -> Option<&'static Rule> {
    RULES.iter().find(|r| r.id == id)
}

/// Rules applicable to a language, in registry order.
pub fn rules_for(language: Language) -> Vec<&'static Rule> {
    RULES.iter().filter(|r| r.applies_to(language)).collect()
}

/// Rules applicable to a language given by name (`terraform`, `tf`, `js`, ...).
pub fn list_rules(language: &str) -> Result<Vec<&'static Rule>, CheckError> {
    let language = Language::parse(language)?;
    Ok(rules_for(language))
}

/// The `parse_error` meta rule.
pub fn parse_error_rule() -> &'static Rule {
    &catalog::PARSE_ERROR
}

/// The `io_error` meta rule.
pub fn io_error_rule() -> &'static Rule {
    &catalog::IO_ERROR
}
