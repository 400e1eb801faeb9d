#![allow(deprecated)] // cargo_bin is deprecated but still works

use assert_cmd::Command;
use predicates::prelude::*;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

type TestResult<T = ()> = std::result::Result<T, Box<dyn Error>>;

/// A scratch working directory with no user configuration in reach.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> TestResult<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, rel: &str, content: &str) -> TestResult<PathBuf> {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    fn cmd(&self) -> TestResult<Command> {
        let mut cmd = Command::cargo_bin("conformcheck")?;
        cmd.current_dir(self.root())
            .env("HOME", self.root())
            .env("XDG_CONFIG_HOME", self.root().join(".config"))
            .env_remove("RUST_LOG");
        Ok(cmd)
    }
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name)
}

#[test]
fn check_reports_warnings_with_success_status() -> TestResult {
    let ws = Workspace::new()?;
    ws.cmd()?
        .args(["check", "--no-color"])
        .arg(fixture("calc.py"))
        .assert()
        .success()
        .stdout(predicate::str::contains("function_naming"))
        .stdout(predicate::str::contains("0 errors, 1 warning"));
    Ok(())
}

#[test]
fn lint_alias_runs_check() -> TestResult {
    let ws = Workspace::new()?;
    ws.cmd()?
        .args(["lint", "--format", "jsonl"])
        .arg(fixture("utils.js"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rule\":\"function_naming\""));
    Ok(())
}

#[test]
fn parse_error_fails_the_run_but_reports_other_files() -> TestResult {
    let ws = Workspace::new()?;
    ws.cmd()?
        .args(["check", "--format", "jsonl"])
        .arg(fixture("broken.py"))
        .arg(fixture("calc.py"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("parse_error"))
        .stdout(predicate::str::contains("function_naming"));
    Ok(())
}

#[test]
fn directory_walk_prunes_vendored_code() -> TestResult {
    let ws = Workspace::new()?;
    ws.write("src/app.py", "def main():\n    \"\"\"Entry point.\"\"\"\n    return 0\n")?;
    ws.write("node_modules/pkg/index.js", "function Bad_Name(){}\n")?;
    ws.write(".venv/lib/site.py", "def BadName():\n    pass\n")?;

    ws.cmd()?
        .args(["check", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"files_checked\": 1"))
        .stdout(predicate::str::contains("Bad_Name").not())
        .stdout(predicate::str::contains("BadName").not());
    Ok(())
}

#[test]
fn empty_directory_is_clean() -> TestResult {
    let ws = Workspace::new()?;
    ws.cmd()?
        .args(["check", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 errors, 0 warnings, 0 infos in 0 files"));
    Ok(())
}

#[test]
fn unsupported_explicit_file_is_skipped() -> TestResult {
    let ws = Workspace::new()?;
    let notes = ws.write("notes.txt", "hello\n")?;
    ws.cmd()?
        .args(["check", "--no-color"])
        .arg(&notes)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped (1):"))
        .stdout(predicate::str::contains("unsupported language: .txt"));
    Ok(())
}

#[test]
fn disable_flag_accepts_categories_and_rules() -> TestResult {
    let ws = Workspace::new()?;
    ws.cmd()?
        .args(["check", "--format", "jsonl", "--disable", "naming", "--disable", "missing_jsdoc"])
        .arg(fixture("utils.js"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    Ok(())
}

#[test]
fn config_file_is_discovered_and_applied() -> TestResult {
    let ws = Workspace::new()?;
    ws.write("conformcheck.yaml", "severity:\n  function_naming: error\n")?;
    ws.cmd()?
        .args(["check", "--format", "jsonl"])
        .arg(fixture("calc.py"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"severity\":\"error\""));
    Ok(())
}

#[test]
fn invalid_config_is_fatal() -> TestResult {
    let ws = Workspace::new()?;
    ws.write("conformcheck.yaml", "rules:\n  disable: [no_such_rule]\n")?;
    ws.cmd()?
        .arg("check")
        .arg(fixture("calc.py"))
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unknown rule"))
        .stderr(predicate::str::contains("conformcheck.yaml"));
    Ok(())
}

#[test]
fn invalid_format_is_a_usage_error() -> TestResult {
    let ws = Workspace::new()?;
    ws.cmd()?
        .args(["check", "--format", "xml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid format"));
    Ok(())
}

#[test]
fn missing_path_is_a_usage_error() -> TestResult {
    let ws = Workspace::new()?;
    ws.cmd()?
        .args(["check", "does/not/exist.py"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot access path"));
    Ok(())
}

#[test]
fn sarif_output_to_file() -> TestResult {
    let ws = Workspace::new()?;
    let out = ws.root().join("report.sarif");
    ws.cmd()?
        .args(["check", "--format", "sarif", "--output"])
        .arg(&out)
        .arg(fixture("config.py"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out)?)?;
    assert_eq!(doc["version"], "2.1.0");
    assert_eq!(doc["runs"][0]["results"][0]["ruleId"], "hardcoded_secret");
    Ok(())
}

#[test]
fn repeated_runs_are_byte_identical() -> TestResult {
    let ws = Workspace::new()?;
    let run = || -> TestResult<Vec<u8>> {
        let output = ws
            .cmd()?
            .args(["check", "--format", "json"])
            .arg(fixture("."))
            .output()?;
        Ok(output.stdout)
    };
    let first = run()?;
    assert!(!first.is_empty());
    assert_eq!(first, run()?);
    Ok(())
}

#[test]
fn rules_lists_catalog_for_a_language() -> TestResult {
    let ws = Workspace::new()?;
    ws.cmd()?
        .args(["rules", "--language", "python"])
        .assert()
        .success()
        .stdout(predicate::str::contains("broad_exception"))
        .stdout(predicate::str::contains("resource_naming").not());

    ws.cmd()?
        .args(["rules", "--language", "cobol"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unsupported language"));
    Ok(())
}

#[test]
fn rules_json_is_parseable() -> TestResult {
    let ws = Workspace::new()?;
    let output = ws.cmd()?.args(["rules", "--format", "json"]).output()?;
    assert!(output.status.success());
    let rules: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let ids: Vec<_> = rules
        .as_array()
        .ok_or("expected an array")?
        .iter()
        .filter_map(|r| r["id"].as_str())
        .collect();
    assert!(ids.contains(&"hardcoded_secret"));
    assert!(ids.contains(&"parse_error"));
    Ok(())
}

#[test]
fn init_writes_a_valid_config_once() -> TestResult {
    let ws = Workspace::new()?;
    ws.cmd()?
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created conformcheck.yaml"));
    assert!(ws.root().join("conformcheck.yaml").exists());

    ws.cmd()?
        .arg("init")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"));

    ws.cmd()?.args(["init", "--force"]).assert().success();

    // The written file is picked up by the next check.
    ws.cmd()?.args(["check", "-v"]).assert().success();
    Ok(())
}

#[test]
fn timed_out_run_exits_as_interrupted() -> TestResult {
    let ws = Workspace::new()?;
    ws.write("calc.py", "def CalculateTotal():\n    \"\"\"Sum all the items.\"\"\"\n    return 0\n")?;
    ws.cmd()?
        .args(["-q", "check", "--format", "jsonl", "--timeout", "0"])
        .assert()
        .code(130)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("incomplete"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn dangling_symlink_is_reported_as_io_error() -> TestResult {
    let ws = Workspace::new()?;
    ws.write("ok.py", "x = 1\n")?;
    std::os::unix::fs::symlink(ws.root().join("missing.py"), ws.root().join("dangling.py"))?;

    ws.cmd()?
        .args(["-q", "check", "--format", "jsonl"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"rule\":\"io_error\""))
        .stdout(predicate::str::contains("dangling.py"));
    Ok(())
}

#[test]
fn throwaway_names_are_not_naming_violations() -> TestResult {
    let ws = Workspace::new()?;
    ws.write("a.py", "_ = compute()\nfor __ in range(3):\n    pass\n")?;
    ws.write("b.js", "const $ = require('jquery');\nconst _ = require('lodash');\n")?;
    ws.cmd()?
        .args(["check", "--format", "jsonl", "--disable", "documentation"])
        .assert()
        .success()
        .stdout(predicate::str::contains("variable_naming").not())
        .stdout(predicate::str::contains("constant_naming").not());
    Ok(())
}
