//! Optional formatter pre-step for `--fix`.
//!
//! Runs each language's standard formatter over the selected files before
//! analysis. A missing or failing formatter is logged and never stops the run.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::language::Language;

/// An external formatter invocation: program plus leading arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formatter {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

/// The formatter for a language.
pub fn formatter_for(language: Language) -> Formatter {
    match language {
        Language::Terraform => Formatter {
            program: "terraform",
            args: &["fmt"],
        },
        Language::JavaScript => Formatter {
            program: "prettier",
            args: &["--write"],
        },
        Language::Python => Formatter {
            program: "black",
            args: &["--quiet"],
        },
    }
}

/// What happened when formatting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    Formatted,
    /// The formatter ran but exited unsuccessfully.
    Failed(String),
    /// The formatter is not installed.
    Unavailable,
}

/// Format every supported file in place. Returns the outcome per file.
pub fn format_files(files: &[PathBuf]) -> Vec<(PathBuf, FixOutcome)> {
    let mut missing: Vec<&'static str> = Vec::new();
    let mut outcomes = Vec::with_capacity(files.len());

    for path in files {
        let language = match Language::from_path(path) {
            Ok(language) => language,
            Err(_) => continue,
        };
        let formatter = formatter_for(language);

        // Skip the spawn once a tool is known to be absent.
        if missing.contains(&formatter.program) {
            outcomes.push((path.clone(), FixOutcome::Unavailable));
            continue;
        }

        let outcome = run_formatter(formatter, path);
        if outcome == FixOutcome::Unavailable {
            warn!(
                tool = formatter.program,
                "{} not found; {} files will not be formatted", formatter.program, language
            );
            missing.push(formatter.program);
        }
        outcomes.push((path.clone(), outcome));
    }

    outcomes
}

fn run_formatter(formatter: Formatter, path: &Path) -> FixOutcome {
    debug!(tool = formatter.program, path = %path.display(), "formatting");
    let output = Command::new(formatter.program)
        .args(formatter.args)
        .arg(path)
        .output();

    match output {
        Ok(output) if output.status.success() => FixOutcome::Formatted,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                tool = formatter.program,
                path = %path.display(),
                "formatter failed: {}", stderr
            );
            FixOutcome::Failed(stderr)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => FixOutcome::Unavailable,
        Err(e) => {
            warn!(tool = formatter.program, "could not run formatter: {}", e);
            FixOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatter_for_each_language() {
        assert_eq!(formatter_for(Language::Terraform).program, "terraform");
        assert_eq!(formatter_for(Language::JavaScript).args, &["--write"]);
        assert_eq!(formatter_for(Language::Python).args, &["--quiet"]);
    }

    #[test]
    fn test_unsupported_files_are_ignored() {
        let outcomes = format_files(&[PathBuf::from("README.md")]);
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_missing_tool_is_unavailable() {
        let formatter = Formatter {
            program: "conformcheck-no-such-formatter",
            args: &[],
        };
        assert_eq!(
            run_formatter(formatter, Path::new("main.tf")),
            FixOutcome::Unavailable
        );
    }
}
