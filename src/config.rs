//! Checker configuration.
//!
//! A YAML file selects rules and categories, overrides severities, tunes
//! thresholds and excludes paths. Every field has a default, so an empty
//! file is a valid configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checks::{Evaluator, Thresholds};
use crate::error::CheckError;
use crate::rules::{self, Category, Severity};

/// File names searched for in the working directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["conformcheck.yaml", ".conformcheck.yaml", "conformcheck.yml"];

/// The commented configuration written by `conformcheck init`.
pub const DEFAULT_TEMPLATE: &str = include_str!("templates/default.yaml");

const SUPPORTED_VERSION: &str = "1";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub categories: Toggle,
    #[serde(default)]
    pub rules: Toggle,
    /// Rule id -> severity name.
    #[serde(default)]
    pub severity: BTreeMap<String, String>,
    /// Glob patterns for paths to leave out of the run.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Keys no other field claimed; any entry here fails validation.
    #[serde(flatten, skip_serializing)]
    pub unknown: BTreeMap<String, serde_yaml::Value>,
}

/// A list of names to switch off.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Toggle {
    #[serde(default)]
    pub disable: Vec<String>,
}

impl Config {
    /// Parse configuration from YAML text. The result is not yet validated.
    pub fn from_yaml(content: &str) -> Result<Self, CheckError> {
        // An empty document deserializes to unit, not to an empty mapping.
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(content).map_err(|e| CheckError::config(e.to_string()))
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, CheckError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CheckError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml(&content)
            .map_err(|e| CheckError::config(format!("{}: {}", path.display(), strip_prefix(&e))))?;
        config
            .validate()
            .map_err(|e| CheckError::config(format!("{}: {}", path.display(), strip_prefix(&e))))?;
        Ok(config)
    }

    /// Find and load the configuration for a run.
    ///
    /// An explicit path wins; otherwise the working directory is searched,
    /// then the user configuration directory. Returns the path that was
    /// loaded, if any.
    pub fn discover(
        explicit: Option<&Path>,
        cwd: &Path,
    ) -> Result<(Self, Option<PathBuf>), CheckError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        let user = user_config_path();
        let candidates = CONFIG_FILE_NAMES
            .iter()
            .map(|name| cwd.join(name))
            .chain(user);

        for path in candidates {
            if path.is_file() {
                debug!(path = %path.display(), "using configuration");
                return Ok((Self::load(&path)?, Some(path)));
            }
        }

        debug!("no configuration file found; using defaults");
        Ok((Self::default(), None))
    }

    /// Check the configuration for unknown names and unusable values.
    pub fn validate(&self) -> Result<(), CheckError> {
        if let Some(key) = self.unknown.keys().next() {
            return Err(CheckError::config(format!("unknown key {:?}", key)));
        }

        if !self.version.is_empty() && self.version != SUPPORTED_VERSION {
            return Err(CheckError::config(format!(
                "unsupported version {:?} (expected {:?})",
                self.version, SUPPORTED_VERSION
            )));
        }

        for name in &self.categories.disable {
            match Category::parse(name) {
                None => {
                    return Err(CheckError::config(format!("unknown category {:?}", name)));
                }
                Some(Category::Analysis) => {
                    return Err(CheckError::config("the analysis category cannot be disabled"));
                }
                Some(_) => {}
            }
        }

        for id in &self.rules.disable {
            match rules::find_rule(id) {
                None => return Err(CheckError::config(format!("unknown rule {:?}", id))),
                Some(rule) if rule.is_meta() => {
                    return Err(CheckError::config(format!("rule {:?} cannot be disabled", id)));
                }
                Some(_) => {}
            }
        }

        for (id, severity) in &self.severity {
            if rules::find_rule(id).is_none() {
                return Err(CheckError::config(format!("unknown rule {:?} in severity", id)));
            }
            severity
                .parse::<Severity>()
                .map_err(|e| CheckError::config(format!("{} (rule {:?})", e, id)))?;
        }

        validate_thresholds(&self.thresholds)?;
        self.exclude_set()?;
        Ok(())
    }

    /// Layer command-line options over the file and re-validate.
    ///
    /// Each `disable` entry may name a category or a rule.
    pub fn apply_overrides(
        &mut self,
        max_line_length: Option<usize>,
        exclude: &[String],
        disable: &[String],
    ) -> Result<(), CheckError> {
        if let Some(max) = max_line_length {
            self.thresholds.max_line_length = max;
        }
        self.exclude.extend(exclude.iter().cloned());
        for name in disable {
            if Category::parse(name).is_some() {
                self.categories.disable.push(name.clone());
            } else {
                self.rules.disable.push(name.clone());
            }
        }
        self.validate()
    }

    /// Build the evaluator this configuration describes.
    pub fn to_evaluator(&self) -> Result<Evaluator, CheckError> {
        let mut evaluator = Evaluator::new(self.thresholds.clone());
        for name in &self.categories.disable {
            let category = Category::parse(name)
                .ok_or_else(|| CheckError::config(format!("unknown category {:?}", name)))?;
            evaluator = evaluator.disable_category(category);
        }
        for id in &self.rules.disable {
            evaluator = evaluator.disable_rule(id.clone());
        }
        for (id, severity) in &self.severity {
            let severity = severity.parse::<Severity>().map_err(CheckError::config)?;
            evaluator = evaluator.with_override(id.clone(), severity);
        }
        Ok(evaluator)
    }

    /// Compile the exclude globs.
    pub fn exclude_set(&self) -> Result<GlobSet, CheckError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).map_err(|e| {
                CheckError::config(format!("invalid exclude pattern {:?}: {}", pattern, e))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| CheckError::config(format!("invalid exclude patterns: {}", e)))
    }
}

fn validate_thresholds(t: &Thresholds) -> Result<(), CheckError> {
    let limits = [
        ("max_line_length", t.max_line_length),
        ("max_file_lines", t.max_file_lines),
        ("max_function_lines", t.max_function_lines),
        ("min_doc_length", t.min_doc_length),
        ("secret_min_length", t.secret_min_length),
    ];
    for (name, value) in limits {
        if value == 0 {
            return Err(CheckError::config(format!("{} must be greater than zero", name)));
        }
    }
    if !t.secret_min_entropy.is_finite() || t.secret_min_entropy < 0.0 {
        return Err(CheckError::config(format!(
            "secret_min_entropy must be a non-negative number, got {}",
            t.secret_min_entropy
        )));
    }
    Ok(())
}

/// `config.yaml` in the platform's configuration directory for conformcheck.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "conformcheck").map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// The message of a configuration error without its "invalid configuration" prefix.
fn strip_prefix(error: &CheckError) -> String {
    match error {
        CheckError::Configuration(message) => message.clone(),
        other => other.to_string(),
    }
}
