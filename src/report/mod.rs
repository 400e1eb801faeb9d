//! Aggregation of findings into a deterministic report.

mod render;

pub use render::{render, write_json, write_jsonl, write_sarif, write_text, Format, TextOptions};

use std::collections::BTreeMap;

use serde::Serialize;

use crate::checks::{Finding, SuppressedFinding};
use crate::rules::Severity;

/// Findings for one file, in report order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub findings: Vec<Finding>,
}

/// A file that was not analyzed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Skipped {
    pub path: String,
    pub reason: String,
}

/// Counts over the whole report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files_checked: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub suppressed: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos
    }
}

/// The result of one checker run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub files: Vec<FileReport>,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<Skipped>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<SuppressedFinding>,
    /// Set when the run was cancelled or timed out before every file was checked.
    pub incomplete: bool,
}

impl Report {
    /// All findings in report order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.files.iter().flat_map(|f| f.findings.iter())
    }

    pub fn is_clean(&self) -> bool {
        self.summary.total() == 0
    }

    /// `1` if any error-severity finding exists, else `0`.
    pub fn exit_status(&self) -> i32 {
        if self.findings().any(|f| f.severity.is_blocking()) {
            1
        } else {
            0
        }
    }

    pub fn set_files_checked(&mut self, count: usize) {
        self.summary.files_checked = count;
    }

    pub fn set_skipped(&mut self, mut skipped: Vec<Skipped>) {
        skipped.sort();
        skipped.dedup();
        self.summary.skipped = skipped.len();
        self.skipped = skipped;
    }

    pub fn set_suppressed(&mut self, mut suppressed: Vec<SuppressedFinding>) {
        suppressed.sort_by(|a, b| report_order(&a.finding, &b.finding));
        self.summary.suppressed = suppressed.len();
        self.suppressed = suppressed;
    }

    pub fn mark_incomplete(&mut self) {
        self.incomplete = true;
    }
}

/// Total order used for every finding list.
fn report_order(a: &Finding, b: &Finding) -> std::cmp::Ordering {
    a.file
        .cmp(&b.file)
        .then(a.span.start_line.cmp(&b.span.start_line))
        .then(a.severity.cmp(&b.severity))
        .then(a.rule.cmp(b.rule))
        .then(a.span.start_col.cmp(&b.span.start_col))
        .then((a.span.end_line, a.span.end_col).cmp(&(b.span.end_line, b.span.end_col)))
        .then(a.message.cmp(&b.message))
}

/// Deduplicate, order and group findings into a report.
///
/// The result does not depend on the order of `findings`, so parallel
/// evaluation yields the same report every time.
pub fn aggregate(mut findings: Vec<Finding>) -> Report {
    findings.sort_by(report_order);
    findings.dedup_by(|a, b| a.key() == b.key());

    let mut summary = Summary::default();
    let mut grouped: BTreeMap<String, Vec<Finding>> = BTreeMap::new();
    for finding in findings {
        match finding.severity {
            Severity::Error => summary.errors += 1,
            Severity::Warning => summary.warnings += 1,
            Severity::Info => summary.infos += 1,
        }
        grouped.entry(finding.file.clone()).or_default().push(finding);
    }
    summary.files_checked = grouped.len();

    let files = grouped
        .into_iter()
        .map(|(path, findings)| FileReport { path, findings })
        .collect();

    Report {
        files,
        summary,
        ..Report::default()
    }
}
