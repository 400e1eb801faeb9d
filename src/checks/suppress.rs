//! Inline suppression of findings via comments.
//!
//! Supports suppression comments like:
//! - `# conformcheck:ignore <rule> - <reason>`
//! - `// conformcheck:ignore-next-line <rule>,<rule>`
//! - `/* conformcheck:ignore-file * - generated */`
//!
//! `*` matches every rule. Findings of the `analysis` category (files that
//! could not be read or parsed) are never suppressed.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::rules::Category;

use super::Finding;

/// How far a suppression reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionKind {
    /// The line holding the comment.
    Line,
    /// The line after the comment.
    NextLine,
    /// The whole file.
    File,
}

/// An inline suppression directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suppression {
    /// Rule ids, or `*`.
    pub rules: Vec<String>,
    pub reason: String,
    /// 1-indexed line of the comment.
    pub line: usize,
    pub kind: SuppressionKind,
}

impl Suppression {
    fn covers_rule(&self, rule: &str) -> bool {
        self.rules.iter().any(|r| r == "*" || r == rule)
    }
}

/// A finding that was suppressed, with the directive responsible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuppressedFinding {
    pub finding: Finding,
    pub suppression: Suppression,
}

lazy_static! {
    static ref DIRECTIVE: Regex = Regex::new(
        r"(#|//|/\*)\s*conformcheck:(ignore(?:-file|-next-line)?)\s+([\w*,]+)(?:\s+-\s*(.*?))?\s*(?:\*/)?\s*$"
    )
    .unwrap();
}

/// Lines within which an `ignore-file` directive is honored even after code.
const FILE_DIRECTIVE_WINDOW: usize = 10;

fn is_comment_or_empty(trimmed: &str) -> bool {
    trimmed.is_empty()
        || ["#", "//", "/*", "*"]
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
}

/// Parse suppression directives from file content.
pub fn parse_suppressions(content: &str) -> Vec<Suppression> {
    let mut suppressions = Vec::new();
    let mut in_header = true;

    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();

        if in_header && !is_comment_or_empty(trimmed) {
            in_header = false;
        }

        let caps = match DIRECTIVE.captures(line) {
            Some(caps) => caps,
            None => continue,
        };
        let directive = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let rules: Vec<String> = caps
            .get(3)
            .map(|m| m.as_str())
            .unwrap_or("")
            .split(',')
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect();
        let reason = caps
            .get(4)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        let kind = match directive {
            "ignore-file" => {
                if !in_header && line_number > FILE_DIRECTIVE_WINDOW {
                    continue;
                }
                SuppressionKind::File
            }
            "ignore-next-line" => SuppressionKind::NextLine,
            "ignore" => {
                // Trailing a statement it covers that line; alone, the next one.
                let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
                if line[..start].trim().is_empty() {
                    SuppressionKind::NextLine
                } else {
                    SuppressionKind::Line
                }
            }
            _ => continue,
        };

        if rules.is_empty() {
            continue;
        }
        suppressions.push(Suppression {
            rules,
            reason,
            line: line_number,
            kind,
        });
    }

    suppressions
}

/// Check if a finding matches a suppression.
pub fn matches_suppression(finding: &Finding, suppression: &Suppression) -> bool {
    if finding.category == Category::Analysis || !suppression.covers_rule(finding.rule) {
        return false;
    }

    match suppression.kind {
        SuppressionKind::File => true,
        SuppressionKind::Line => finding.span.start_line == suppression.line,
        SuppressionKind::NextLine => finding.span.start_line == suppression.line + 1,
    }
}

/// Separate findings into active and suppressed.
pub fn filter_suppressed(
    findings: Vec<Finding>,
    suppressions: &[Suppression],
) -> (Vec<Finding>, Vec<SuppressedFinding>) {
    if suppressions.is_empty() {
        return (findings, Vec::new());
    }

    let mut active = Vec::new();
    let mut suppressed = Vec::new();

    for finding in findings {
        match suppressions.iter().find(|s| matches_suppression(&finding, s)) {
            Some(suppression) => suppressed.push(SuppressedFinding {
                finding,
                suppression: suppression.clone(),
            }),
            None => active.push(finding),
        }
    }

    (active, suppressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Span;
    use crate::rules::Severity;

    fn finding(rule: &'static str, category: Category, line: usize) -> Finding {
        Finding {
            rule,
            category,
            severity: Severity::Warning,
            file: "a.py".to_string(),
            span: Span::new(line, 1, line, 5),
            message: "m".to_string(),
        }
    }

    #[test]
    fn test_parse_directives() {
        let content = r#"# conformcheck:ignore-file missing_docstring - legacy module
import os

API_KEY = "sk_live_abcdef123456"  # conformcheck:ignore hardcoded_secret - test fixture
# conformcheck:ignore-next-line function_naming,class_naming
def CalculateTotal(): pass
// conformcheck:ignore *
/* conformcheck:ignore line_too_long - wide table */
"#;
        let suppressions = parse_suppressions(content);
        assert_eq!(suppressions.len(), 5);

        assert_eq!(suppressions[0].kind, SuppressionKind::File);
        assert_eq!(suppressions[0].reason, "legacy module");

        assert_eq!(suppressions[1].kind, SuppressionKind::Line);
        assert_eq!(suppressions[1].line, 4);
        assert_eq!(suppressions[1].rules, vec!["hardcoded_secret"]);
        assert_eq!(suppressions[1].reason, "test fixture");

        assert_eq!(suppressions[2].kind, SuppressionKind::NextLine);
        assert_eq!(suppressions[2].rules, vec!["function_naming", "class_naming"]);

        assert_eq!(suppressions[3].kind, SuppressionKind::NextLine);
        assert_eq!(suppressions[3].rules, vec!["*"]);

        assert_eq!(suppressions[4].rules, vec!["line_too_long"]);
        assert_eq!(suppressions[4].reason, "wide table");
    }

    #[test]
    fn test_file_directive_outside_header_ignored() {
        let mut content = String::from("x = 1\n");
        for _ in 0..12 {
            content.push_str("y = 2\n");
        }
        content.push_str("# conformcheck:ignore-file *\n");
        assert!(parse_suppressions(&content).is_empty());
    }

    #[test]
    fn test_filter_suppressed() {
        let suppressions = parse_suppressions(
            "x = 1  # conformcheck:ignore line_too_long\n# conformcheck:ignore *\ny = 2\n",
        );
        let findings = vec![
            finding("line_too_long", Category::Formatting, 1),
            finding("trailing_whitespace", Category::Formatting, 1),
            finding("variable_naming", Category::Naming, 3),
            finding("parse_error", Category::Analysis, 3),
        ];
        let (active, suppressed) = filter_suppressed(findings, &suppressions);
        let active_ids: Vec<_> = active.iter().map(|f| f.rule).collect();
        assert_eq!(active_ids, vec!["trailing_whitespace", "parse_error"]);
        assert_eq!(suppressed.len(), 2);
        assert_eq!(suppressed[0].suppression.line, 1);
    }
}
