//! Command-line interface for conformcheck.

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::GlobSet;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::analysis::register_adapters;
use crate::checks::{CancelFlag, Runner};
use crate::config::{Config, DEFAULT_TEMPLATE};
use crate::fix;
use crate::language::Language;
use crate::report::{self, Format, TextOptions};
use crate::rules::{self, Rule};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Directory names never descended into.
const PRUNED_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    ".terraform",
    "venv",
    ".venv",
    "vendor",
    "dist",
    "build",
];

/// Standards conformance checker for Terraform, JavaScript and Python.
///
/// Conformcheck reports formatting, naming, documentation, error-handling,
/// security and performance deviations from a fixed rule catalog. It never
/// executes the code it checks.
#[derive(Parser)]
#[command(name = "conformcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check files against the conformance rules
    #[command(visible_alias = "lint")]
    Check(CheckArgs),
    /// List the rule catalog
    Rules(RulesArgs),
    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Files or directories to check (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: text, jsonl, json, or sarif
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the maximum line length
    #[arg(long)]
    pub max_line_length: Option<usize>,

    /// Exclude paths matching a glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Disable a rule or a whole category (repeatable)
    #[arg(long, value_name = "RULE|CATEGORY")]
    pub disable: Vec<String>,

    /// Run the language formatters on the files before checking
    #[arg(long)]
    pub fix: bool,

    /// Show suppressed findings in text output
    #[arg(long)]
    pub show_suppressed: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Stop starting new files after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of worker threads (default: one per CPU)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Arguments for the rules command.
#[derive(Parser)]
pub struct RulesArgs {
    /// Only rules for this language (terraform, javascript, python)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "conformcheck.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Whether a path matches the exclude globs, as given or relative to `root`.
fn is_excluded(excludes: &GlobSet, path: &Path, root: &Path) -> bool {
    if excludes.is_empty() {
        return false;
    }
    let shown = path.to_string_lossy().replace('\\', "/");
    let shown = shown.strip_prefix("./").unwrap_or(&shown);
    if excludes.is_match(shown) {
        return true;
    }
    path.strip_prefix(root)
        .map(|rel| excludes.is_match(rel))
        .unwrap_or(false)
}

/// Collect the files to check under `root`.
///
/// Explicit files are kept whatever their extension, so unsupported ones
/// show up as skipped; walked files are filtered to supported extensions.
/// Entries the walk cannot read are kept too, and fail when checked.
pub fn collect_files(root: &Path, excludes: &GlobSet) -> Vec<PathBuf> {
    if root.is_file() {
        if is_excluded(excludes, root, Path::new("")) {
            debug!(path = %root.display(), "excluded");
            return Vec::new();
        }
        return vec![root.to_path_buf()];
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !(name.starts_with('.') || PRUNED_DIRS.contains(&&*name))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("cannot walk {}: {}", root.display(), e);
                // Keep the path so the run reports it as unreadable.
                if let Some(path) = e.path() {
                    if !is_excluded(excludes, path, root) {
                        files.push(path.to_path_buf());
                    }
                }
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Language::from_extension)
            .is_some();
        if supported && !is_excluded(excludes, path, root) {
            files.push(path.to_path_buf());
        }
    }

    files
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} files ({elapsed})")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// Run the check command.
pub fn run_check(args: &CheckArgs, quiet: bool) -> anyhow::Result<i32> {
    register_adapters().context("cannot load language grammars")?;

    let format: Format = match args.format.parse() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let (mut config, config_path) = match Config::discover(args.config.as_deref(), &cwd) {
        Ok(found) => found,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if let Some(path) = &config_path {
        info!(path = %path.display(), "loaded configuration");
    }
    if let Err(e) = config.apply_overrides(args.max_line_length, &args.exclude, &args.disable) {
        eprintln!("Error: {}", e);
        return Ok(EXIT_ERROR);
    }
    let evaluator = config.to_evaluator()?;
    let excludes = config.exclude_set()?;

    let roots = if args.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        args.paths.clone()
    };

    let mut files = Vec::new();
    for root in &roots {
        if !root.exists() {
            eprintln!("Error: cannot access path {}: no such file or directory", root.display());
            return Ok(EXIT_ERROR);
        }
        files.extend(collect_files(root, &excludes));
    }
    files.sort();
    files.dedup();
    info!(files = files.len(), "discovered files");

    if args.fix {
        let outcomes = fix::format_files(&files);
        let formatted = outcomes
            .iter()
            .filter(|(_, o)| *o == fix::FixOutcome::Formatted)
            .count();
        info!(formatted, "formatter pass finished");
    }

    let cancel = CancelFlag::new();
    let interrupted = CancelFlag::new();
    {
        let cancel = cancel.clone();
        let interrupted = interrupted.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            interrupted.cancel();
            cancel.cancel();
        }) {
            debug!("cannot install Ctrl-C handler: {}", e);
        }
    }

    let mut runner = Runner::new(evaluator)
        .with_cancel_flag(cancel)
        .with_timeout(args.timeout.map(Duration::from_secs));

    let show_progress = !quiet
        && !format.is_machine_readable()
        && !files.is_empty()
        && io::stderr().is_terminal();
    let progress = show_progress.then(|| progress_bar(files.len()));
    if let Some(bar) = &progress {
        runner = runner.with_progress(bar.clone());
    }

    let report = match args.jobs {
        Some(jobs) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .context("cannot start worker threads")?;
            pool.install(|| runner.run(&files))?
        }
        None => runner.run(&files)?,
    };
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    let options = TextOptions {
        color: !args.no_color && args.output.is_none() && io::stdout().is_terminal(),
        show_suppressed: args.show_suppressed,
    };
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            report::render(&report, format, options, &mut out)?;
            out.flush()
                .with_context(|| format!("cannot write {}", path.display()))?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            report::render(&report, format, options, &mut out)?;
            out.flush()?;
        }
    }

    // A partial run never exits like a finished one.
    if interrupted.is_cancelled() || report.incomplete {
        error!(
            files_checked = report.summary.files_checked,
            total = files.len(),
            "run stopped early; results are incomplete"
        );
        return Ok(EXIT_INTERRUPTED);
    }
    Ok(report.exit_status())
}

fn languages_label(rule: &Rule) -> String {
    if rule.languages.len() == Language::ALL.len() {
        "all".to_string()
    } else {
        rule.languages
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Run the rules command.
pub fn run_rules(args: &RulesArgs) -> anyhow::Result<i32> {
    let selected: Vec<&'static Rule> = match &args.language {
        Some(language) => match rules::list_rules(language) {
            Ok(rules) => rules,
            Err(e) => {
                eprintln!("Error: {}", e);
                return Ok(EXIT_ERROR);
            }
        },
        None => rules::all_rules().iter().collect(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format.as_str() {
        "json" => {
            serde_json::to_writer_pretty(&mut out, &selected)?;
            writeln!(out)?;
        }
        "text" => {
            for rule in &selected {
                writeln!(
                    out,
                    "{:<22} {:<15} {:<8} {:<22} {}",
                    rule.id,
                    rule.category.as_str(),
                    rule.severity.as_str(),
                    languages_label(rule),
                    rule.description
                )?;
            }
        }
        other => {
            eprintln!("Error: invalid format {:?}, must be 'text' or 'json'", other);
            return Ok(EXIT_ERROR);
        }
    }
    out.flush()?;
    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Use --force to overwrite it or --output to pick another path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create directory {}", parent.display()))?;
        }
    }

    std::fs::write(&args.output, DEFAULT_TEMPLATE)
        .with_context(|| format!("cannot write {}", args.output.display()))?;

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize for your project", args.output.display());
    println!("  2. Run: conformcheck check . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}
