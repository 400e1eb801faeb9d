//! The per-invocation pipeline: parse files, evaluate rules, aggregate.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::analysis::{adapter_for, SourceUnit, Span, UnitCache};
use crate::error::CheckError;
use crate::language::Language;
use crate::report::{aggregate, Report, Skipped};
use crate::rules;

use super::{filter_suppressed, parse_suppressions, Evaluator, Finding, SuppressedFinding};

/// Pipeline stages of one run. Runs share no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Parsing,
    Evaluating,
    Reporting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Parsing => "parsing",
            Stage::Evaluating => "evaluating",
            Stage::Reporting => "reporting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Shared cancellation signal, checked at file boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of reading and parsing one file.
enum Parsed {
    Unit(SourceUnit),
    Failed(Finding),
    Skipped(Skipped),
    NotStarted,
}

/// Result of evaluating one file.
#[derive(Default)]
struct FileOutcome {
    findings: Vec<Finding>,
    suppressed: Vec<SuppressedFinding>,
}

/// Runs the checker over a set of files.
pub struct Runner {
    evaluator: Evaluator,
    cache: UnitCache,
    cancel: CancelFlag,
    timeout: Option<Duration>,
    progress: Option<ProgressBar>,
    stage: Mutex<Stage>,
}

impl Runner {
    pub fn new(evaluator: Evaluator) -> Self {
        Self {
            evaluator,
            cache: UnitCache::new(),
            cancel: CancelFlag::new(),
            timeout: None,
            progress: None,
            stage: Mutex::new(Stage::Idle),
        }
    }

    /// Use an externally owned cancellation flag (e.g. one set by Ctrl-C).
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stop starting new files once `timeout` has elapsed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn stage(&self) -> Stage {
        *self.stage.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, stage: Stage) {
        debug!(%stage, "pipeline stage");
        *self.stage.lock().unwrap_or_else(|e| e.into_inner()) = stage;
    }

    fn should_stop(&self, deadline: Option<Instant>) -> bool {
        if self.cancel.is_cancelled() {
            return true;
        }
        match deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Check every file and build the aggregated report.
    ///
    /// Per-file failures become findings or skipped entries; they never
    /// abort the run.
    pub fn run(&self, files: &[PathBuf]) -> anyhow::Result<Report> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        info!(files = files.len(), "checking files");

        self.enter(Stage::Parsing);
        let parsed: Vec<Parsed> = files
            .par_iter()
            .map(|path| self.parse_file(path, deadline))
            .collect();

        self.enter(Stage::Evaluating);
        let mut findings = Vec::new();
        let mut suppressed = Vec::new();
        let mut skipped = Vec::new();
        let mut checked = 0usize;
        let mut incomplete = false;

        let mut units = Vec::new();
        for item in parsed {
            match item {
                Parsed::Unit(unit) => units.push(unit),
                Parsed::Failed(finding) => {
                    checked += 1;
                    findings.push(finding);
                }
                Parsed::Skipped(entry) => skipped.push(entry),
                Parsed::NotStarted => incomplete = true,
            }
        }

        let outcomes: Vec<Option<FileOutcome>> = units
            .par_iter()
            .map(|unit| {
                if self.should_stop(deadline) {
                    return None;
                }
                let outcome = self.evaluate_unit(unit);
                if let Some(progress) = &self.progress {
                    progress.inc(1);
                }
                Some(outcome)
            })
            .collect();

        for outcome in outcomes {
            match outcome {
                Some(outcome) => {
                    checked += 1;
                    findings.extend(outcome.findings);
                    suppressed.extend(outcome.suppressed);
                }
                None => incomplete = true,
            }
        }

        if incomplete {
            warn!("run interrupted; report is incomplete");
        }
        let (hits, misses) = self.cache.stats();
        debug!(hits, misses, "source unit cache");

        self.enter(Stage::Reporting);
        let mut report = aggregate(findings);
        report.set_files_checked(checked);
        report.set_skipped(skipped);
        report.set_suppressed(suppressed);
        if incomplete {
            report.mark_incomplete();
        }

        self.enter(Stage::Done);
        Ok(report)
    }

    fn parse_file(&self, path: &Path, deadline: Option<Instant>) -> Parsed {
        if self.should_stop(deadline) {
            return Parsed::NotStarted;
        }
        let shown = display_path(path);

        let parsed = match Language::from_path(path) {
            Ok(language) => match self.read_and_parse(path, &shown, language) {
                Ok(unit) => Parsed::Unit(unit),
                Err(e) => Parsed::Failed(self.error_finding(&shown, e)),
            },
            Err(e) => {
                warn!(path = %shown, "skipping file: {}", e);
                Parsed::Skipped(Skipped {
                    path: shown,
                    reason: e.to_string(),
                })
            }
        };

        // Units are counted once evaluated.
        if !matches!(parsed, Parsed::Unit(_)) {
            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
        }
        parsed
    }

    fn read_and_parse(
        &self,
        path: &Path,
        shown: &str,
        language: Language,
    ) -> Result<SourceUnit, CheckError> {
        let bytes = std::fs::read(path).map_err(|source| CheckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source = String::from_utf8(bytes).map_err(|e| CheckError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.utf8_error()),
        })?;

        let adapter = adapter_for(language).map_err(|e| {
            CheckError::parse(shown, 1, 1, format!("no usable {} adapter: {}", language, e))
        })?;
        debug!(path = %shown, %language, "parsing");
        self.cache.parse(adapter, shown, &source)
    }

    /// Convert a per-file error into its meta finding.
    fn error_finding(&self, shown: &str, error: CheckError) -> Finding {
        match error {
            CheckError::Parse {
                line,
                column,
                message,
                ..
            } => {
                warn!(path = %shown, line, column, "could not parse: {}", message);
                self.evaluator.finding(
                    rules::parse_error_rule(),
                    shown,
                    Span::new(line, column, line, column),
                    format!("could not analyze file: {}", message),
                )
            }
            CheckError::Io { source, .. } => {
                warn!(path = %shown, "could not read: {}", source);
                self.evaluator.finding(
                    rules::io_error_rule(),
                    shown,
                    Span::new(1, 1, 1, 1),
                    format!("could not read file: {}", source),
                )
            }
            other => self.evaluator.finding(
                rules::parse_error_rule(),
                shown,
                Span::new(1, 1, 1, 1),
                format!("could not analyze file: {}", other),
            ),
        }
    }

    fn evaluate_unit(&self, unit: &SourceUnit) -> FileOutcome {
        let findings = self.evaluator.evaluate_unit(unit);
        let suppressions = parse_suppressions(&unit.text);
        let (findings, suppressed) = filter_suppressed(findings, &suppressions);
        FileOutcome {
            findings,
            suppressed,
        }
    }
}

/// Path as shown in findings: `/`-separated, without a leading `./`.
pub(crate) fn display_path(path: &Path) -> String {
    let shown = path.to_string_lossy().replace('\\', "/");
    match shown.strip_prefix("./") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => shown,
    }
}
