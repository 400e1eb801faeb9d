//! Output formatting for reports.
//!
//! Supports four output formats:
//! - Text: grouped, optionally colored output for humans
//! - JSONL: one JSON record per finding, for streaming consumers
//! - JSON: the whole report as one document
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration
//!
//! Every renderer writes to an `io::Write` and produces the same bytes for
//! the same report.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use colored::*;
use serde::Serialize;

use crate::checks::{Finding, SuppressionKind};
use crate::rules::{self, Severity};

use super::Report;

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Jsonl,
    Json,
    Sarif,
}

impl Format {
    pub const NAMES: &'static [&'static str] = &["text", "jsonl", "json", "sarif"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Jsonl => "jsonl",
            Format::Json => "json",
            Format::Sarif => "sarif",
        }
    }

    /// Whether the output is meant for machines (no progress, no color).
    pub fn is_machine_readable(&self) -> bool {
        !matches!(self, Format::Text)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Format::Text),
            "jsonl" | "ndjson" => Ok(Format::Jsonl),
            "json" => Ok(Format::Json),
            "sarif" => Ok(Format::Sarif),
            _ => Err(format!(
                "invalid format {:?} (expected one of: {})",
                s,
                Format::NAMES.join(", ")
            )),
        }
    }
}

/// Options for the text renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextOptions {
    pub color: bool,
    pub show_suppressed: bool,
}

/// Render `report` in `format`.
pub fn render(
    report: &Report,
    format: Format,
    options: TextOptions,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match format {
        Format::Text => write_text(report, options, out),
        Format::Jsonl => write_jsonl(report, out),
        Format::Json => write_json(report, out),
        Format::Sarif => write_sarif(report, out),
    }
}

// =============================================================================
// Text
// =============================================================================

/// Applies color only when enabled, so plain output never carries escapes.
struct Painter {
    enabled: bool,
}

impl Painter {
    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.enabled {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn severity(&self, severity: Severity) -> String {
        let label = format!("{:<7}", severity.as_str());
        match severity {
            Severity::Error => self.paint(&label, |s| s.red().bold()),
            Severity::Warning => self.paint(&label, |s| s.yellow()),
            Severity::Info => self.paint(&label, |s| s.blue()),
        }
    }
}

/// Write the report in human-readable form.
pub fn write_text(report: &Report, options: TextOptions, out: &mut dyn Write) -> anyhow::Result<()> {
    let painter = Painter {
        enabled: options.color,
    };

    for file in &report.files {
        writeln!(out, "{}", painter.paint(&file.path, |s| s.bold().underline()))?;
        for finding in &file.findings {
            write_finding_line(&painter, finding, out)?;
        }
        writeln!(out)?;
    }

    if !report.skipped.is_empty() {
        writeln!(out, "{} ({}):", painter.paint("Skipped", |s| s.dimmed()), report.skipped.len())?;
        for skipped in &report.skipped {
            writeln!(out, "  {}  {}", skipped.path, painter.paint(&skipped.reason, |s| s.dimmed()))?;
        }
        writeln!(out)?;
    }

    if !report.suppressed.is_empty() {
        write_suppressed(&painter, report, options.show_suppressed, out)?;
    }

    write_summary(&painter, report, out)
}

fn write_finding_line(painter: &Painter, finding: &Finding, out: &mut dyn Write) -> anyhow::Result<()> {
    let location = format!("{:>5}", finding.span.to_string());
    writeln!(
        out,
        "  {}  {}  {}  {}",
        painter.paint(&location, |s| s.dimmed()),
        painter.severity(finding.severity),
        painter.paint(&format!("{:<22}", finding.rule), |s| s.cyan()),
        finding.message
    )?;
    Ok(())
}

fn write_suppressed(
    painter: &Painter,
    report: &Report,
    show_details: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    writeln!(out, "{} ({}):", painter.paint("Suppressed", |s| s.dimmed()), report.suppressed.len())?;

    if !show_details {
        writeln!(out, "  {}", painter.paint("(use --show-suppressed to see details)", |s| s.dimmed()))?;
        writeln!(out)?;
        return Ok(());
    }

    for sf in &report.suppressed {
        let f = &sf.finding;
        let scope = match sf.suppression.kind {
            SuppressionKind::File => "(file)".to_string(),
            _ => format!("line {}", sf.suppression.line),
        };
        writeln!(
            out,
            "  {}:{}  {}  {}",
            f.file,
            f.span,
            painter.paint(&format!("{:<22}", f.rule), |s| s.dimmed()),
            painter.paint(&scope, |s| s.dimmed())
        )?;
        if !sf.suppression.reason.is_empty() {
            writeln!(
                out,
                "      {}",
                painter.paint(&format!("reason: {:?}", sf.suppression.reason), |s| s.dimmed())
            )?;
        }
    }
    writeln!(out)?;
    Ok(())
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

fn write_summary(painter: &Painter, report: &Report, out: &mut dyn Write) -> anyhow::Result<()> {
    let s = &report.summary;
    let mut line = format!(
        "{}, {}, {} in {}",
        plural(s.errors, "error"),
        plural(s.warnings, "warning"),
        plural(s.infos, "info"),
        plural(s.files_checked, "file"),
    );
    if s.suppressed > 0 {
        line.push_str(&format!(" ({} suppressed)", s.suppressed));
    }
    if s.skipped > 0 {
        line.push_str(&format!(" ({} skipped)", s.skipped));
    }

    let status = if report.exit_status() == 0 {
        painter.paint("✓", |s| s.green())
    } else {
        painter.paint("✗", |s| s.red())
    };
    writeln!(out, "{} {}", status, line)?;

    if report.incomplete {
        writeln!(
            out,
            "{}",
            painter.paint("run was interrupted; results are incomplete", |s| s.yellow())
        )?;
    }
    Ok(())
}

// =============================================================================
// JSONL
// =============================================================================

/// One finding per line, flattened for line-oriented tools.
#[derive(Serialize)]
struct JsonlRecord<'a> {
    file: &'a str,
    line: usize,
    column: usize,
    end_line: usize,
    end_column: usize,
    severity: Severity,
    rule: &'a str,
    category: &'a str,
    message: &'a str,
}

impl<'a> From<&'a Finding> for JsonlRecord<'a> {
    fn from(f: &'a Finding) -> Self {
        Self {
            file: &f.file,
            line: f.span.start_line,
            column: f.span.start_col,
            end_line: f.span.end_line,
            end_column: f.span.end_col,
            severity: f.severity,
            rule: f.rule,
            category: f.category.as_str(),
            message: &f.message,
        }
    }
}

/// Write one JSON object per finding and nothing else.
pub fn write_jsonl(report: &Report, out: &mut dyn Write) -> anyhow::Result<()> {
    for finding in report.findings() {
        serde_json::to_writer(&mut *out, &JsonlRecord::from(finding))?;
        writeln!(out)?;
    }
    Ok(())
}

// =============================================================================
// JSON
// =============================================================================

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    #[serde(flatten)]
    report: &'a Report,
}

/// Write the whole report as a single JSON document.
pub fn write_json(report: &Report, out: &mut dyn Write) -> anyhow::Result<()> {
    let doc = JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        report,
    };
    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)?;
    Ok(())
}

// =============================================================================
// SARIF
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "conformcheck";

#[derive(Serialize)]
struct SarifReport {
    version: String,
    #[serde(rename = "$schema")]
    schema: String,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
struct SarifRun {
    tool: SarifTool,
    #[serde(rename = "columnKind")]
    column_kind: String,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
struct SarifDriver {
    name: String,
    version: String,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
struct SarifRule {
    id: String,
    name: String,
    #[serde(rename = "shortDescription")]
    short_description: SarifMessage,
    #[serde(rename = "defaultConfiguration")]
    default_config: SarifRuleConfig,
    properties: SarifRuleProperties,
}

#[derive(Serialize)]
struct SarifRuleConfig {
    level: String,
}

#[derive(Serialize)]
struct SarifRuleProperties {
    category: String,
}

#[derive(Serialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifact,
    region: SarifRegion,
}

#[derive(Serialize)]
struct SarifArtifact {
    uri: String,
}

#[derive(Serialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: usize,
    #[serde(rename = "startColumn")]
    start_column: usize,
    #[serde(rename = "endLine")]
    end_line: usize,
    #[serde(rename = "endColumn")]
    end_column: usize,
}

fn map_severity_to_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

/// `line_too_long` -> `LineTooLong`.
fn rule_display_name(id: &str) -> String {
    id.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Write the report as a SARIF 2.1.0 log.
pub fn write_sarif(report: &Report, out: &mut dyn Write) -> anyhow::Result<()> {
    let rule_ids: BTreeSet<&str> = report.findings().map(|f| f.rule).collect();

    let rules: Vec<SarifRule> = rule_ids
        .into_iter()
        .filter_map(rules::find_rule)
        .map(|rule| SarifRule {
            id: rule.id.to_string(),
            name: rule_display_name(rule.id),
            short_description: SarifMessage {
                text: rule.description.to_string(),
            },
            default_config: SarifRuleConfig {
                level: map_severity_to_level(rule.severity).to_string(),
            },
            properties: SarifRuleProperties {
                category: rule.category.as_str().to_string(),
            },
        })
        .collect();

    let results: Vec<SarifResult> = report
        .findings()
        .map(|f| SarifResult {
            rule_id: f.rule.to_string(),
            level: map_severity_to_level(f.severity).to_string(),
            message: SarifMessage {
                text: f.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifact {
                        uri: f.file.clone(),
                    },
                    region: SarifRegion {
                        start_line: f.span.start_line.max(1),
                        start_column: f.span.start_col.max(1),
                        end_line: f.span.end_line.max(1),
                        end_column: f.span.end_col.max(1),
                    },
                },
            }],
        })
        .collect();

    let sarif = SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules,
                },
            },
            column_kind: "unicodeCodePoints".to_string(),
            results,
        }],
    };

    serde_json::to_writer_pretty(&mut *out, &sarif)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Span;
    use crate::checks::{Suppression, SuppressedFinding};
    use crate::report::{aggregate, Skipped};
    use crate::rules::Category;

    fn sample() -> Report {
        let mut report = aggregate(vec![
            Finding {
                rule: "function_naming",
                category: Category::Naming,
                severity: Severity::Warning,
                file: "calc.py".to_string(),
                span: Span::new(1, 5, 1, 19),
                message: "function `CalculateTotal` should be snake_case (e.g. `calculate_total`)"
                    .to_string(),
            },
            Finding {
                rule: "parse_error",
                category: Category::Analysis,
                severity: Severity::Error,
                file: "broken.tf".to_string(),
                span: Span::new(3, 1, 3, 1),
                message: "could not analyze file: unclosed `{`".to_string(),
            },
        ]);
        report.set_files_checked(2);
        report
    }

    fn render_to_string(report: &Report, format: Format, options: TextOptions) -> String {
        let mut buf = Vec::new();
        render(report, format, options, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("SARIF".parse::<Format>().unwrap(), Format::Sarif);
        assert_eq!("pretty".parse::<Format>().unwrap(), Format::Text);
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_text_without_color_has_no_escapes() {
        let text = render_to_string(&sample(), Format::Text, TextOptions::default());
        assert!(!text.contains('\u{1b}'));
        assert!(text.contains("calc.py\n"));
        assert!(text.contains("1:5  warning  function_naming"));
        assert!(text.contains("1 error, 1 warning, 0 infos in 2 files"));
    }

    #[test]
    fn test_text_lists_skipped_and_incomplete() {
        let mut report = sample();
        report.set_skipped(vec![Skipped {
            path: "notes.txt".to_string(),
            reason: "unsupported language: .txt".to_string(),
        }]);
        report.mark_incomplete();
        let text = render_to_string(&report, Format::Text, TextOptions::default());
        assert!(text.contains("Skipped (1):"));
        assert!(text.contains("notes.txt"));
        assert!(text.contains("results are incomplete"));
    }

    #[test]
    fn test_text_suppressed_details() {
        let mut report = sample();
        let finding = report.files[0].findings[0].clone();
        report.set_suppressed(vec![SuppressedFinding {
            finding,
            suppression: Suppression {
                rules: vec!["*".to_string()],
                reason: "legacy".to_string(),
                line: 1,
                kind: SuppressionKind::File,
            },
        }]);

        let hidden = render_to_string(&report, Format::Text, TextOptions::default());
        assert!(hidden.contains("--show-suppressed"));

        let shown = render_to_string(
            &report,
            Format::Text,
            TextOptions {
                color: false,
                show_suppressed: true,
            },
        );
        assert!(shown.contains("(file)"));
        assert!(shown.contains("reason: \"legacy\""));
    }

    #[test]
    fn test_jsonl_one_record_per_finding() {
        let out = render_to_string(&sample(), Format::Jsonl, TextOptions::default());
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["file"], "broken.tf");
        assert_eq!(first["rule"], "parse_error");
        assert_eq!(first["severity"], "error");
        assert_eq!(first["category"], "analysis");
    }

    #[test]
    fn test_jsonl_empty_report_is_empty() {
        let out = render_to_string(&aggregate(Vec::new()), Format::Jsonl, TextOptions::default());
        assert!(out.is_empty());
    }

    #[test]
    fn test_json_document() {
        let out = render_to_string(&sample(), Format::Json, TextOptions::default());
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["summary"]["errors"], 1);
        assert_eq!(doc["files"][1]["path"], "calc.py");
        assert_eq!(doc["incomplete"], false);
    }

    #[test]
    fn test_sarif_structure() {
        let out = render_to_string(&sample(), Format::Sarif, TextOptions::default());
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["version"], "2.1.0");

        let run = &doc["runs"][0];
        assert_eq!(run["tool"]["driver"]["name"], "conformcheck");
        let rules = run["tool"]["driver"]["rules"].as_array().unwrap();
        let ids: Vec<_> = rules.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["function_naming", "parse_error"]);
        assert_eq!(rules[0]["name"], "FunctionNaming");

        let result = &run["results"][1];
        assert_eq!(result["level"], "warning");
        let region = &result["locations"][0]["physicalLocation"]["region"];
        assert_eq!(region["startLine"], 1);
        assert_eq!(region["startColumn"], 5);
        assert_eq!(region["endColumn"], 19);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        for format in [Format::Text, Format::Jsonl, Format::Json, Format::Sarif] {
            let a = render_to_string(&sample(), format, TextOptions::default());
            let b = render_to_string(&sample(), format, TextOptions::default());
            assert_eq!(a, b, "{} output differs", format);
        }
    }
}
