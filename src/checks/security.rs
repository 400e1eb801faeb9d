//! Advisory security heuristics.
//!
//! These are pattern checks over extracted facts, not a security scanner:
//! they flag constructs worth a second look.

use lazy_static::lazy_static;
use phf::phf_map;
use regex::Regex;
use std::collections::HashMap;

use crate::analysis::{CallSite, SourceUnit};
use crate::language::Language;

use super::{Hit, Thresholds};

lazy_static! {
    static ref SECRET_NAME: Regex =
        Regex::new(r"(?i)(key|password|passwd|pwd|secret|token|credential)").unwrap();
    static ref PLACEHOLDER: Regex = Regex::new(
        r"(?i)^(changeme|change_me|change-me|replace_?me|example|dummy|placeholder|todo|none|null|test|x+|\*+|your[_-].*|<.*>|\$\{.*\}|\{\{.*\}\})$"
    )
    .unwrap();
    static ref SQL_KEYWORD: Regex =
        Regex::new(r"(?i)\b(select|insert|update|delete|drop|create|alter|union|where|from|into)\b")
            .unwrap();
}

/// Well-known credential prefixes and what they identify.
static CREDENTIAL_PREFIXES: phf::Map<&'static str, &'static str> = phf_map! {
    "sk_live_" => "Stripe live secret key",
    "rk_live_" => "Stripe restricted key",
    "AKIA" => "AWS access key",
    "ASIA" => "AWS temporary access key",
    "ghp_" => "GitHub personal access token",
    "gho_" => "GitHub OAuth token",
    "github_pat_" => "GitHub fine-grained token",
    "glpat-" => "GitLab personal access token",
    "xoxb-" => "Slack bot token",
    "xoxp-" => "Slack user token",
    "xoxa-" => "Slack app token",
    "AIza" => "Google API key",
};

/// Python calls that execute dynamic code or shell commands.
static PYTHON_DANGEROUS: phf::Map<&'static str, &'static str> = phf_map! {
    "eval" => "evaluates a string as code",
    "exec" => "executes a string as code",
    "os.system" => "runs a shell command",
    "os.popen" => "runs a shell command",
    "pickle.loads" => "deserializes untrusted data",
    "pickle.load" => "deserializes untrusted data",
    "marshal.loads" => "deserializes untrusted data",
};

/// `subprocess` entry points that are only dangerous with `shell=True`.
static PYTHON_SHELL_CALLS: phf::Set<&'static str> = phf::phf_set! {
    "subprocess.run",
    "subprocess.call",
    "subprocess.check_call",
    "subprocess.check_output",
    "subprocess.Popen",
};

/// JavaScript calls that execute dynamic code or shell commands.
static JAVASCRIPT_DANGEROUS: phf::Map<&'static str, &'static str> = phf_map! {
    "eval" => "evaluates a string as code",
    "window.eval" => "evaluates a string as code",
    "child_process.exec" => "runs a shell command",
    "child_process.execSync" => "runs a shell command",
    "document.write" => "writes raw HTML into the document",
    "document.writeln" => "writes raw HTML into the document",
};

/// Query entry points whose first argument is SQL.
const SQL_METHODS: &[&str] = &["execute", "executemany", "query", "raw"];

/// Shannon entropy of a string in bits per character.
pub fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in s.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .values()
        .map(|&n| {
            let p = n as f64 / total;
            -p * p.log2()
        })
        .sum()
}

fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || PLACEHOLDER.is_match(trimmed)
}

/// The credential kind for a literal carrying a well-known prefix.
fn credential_prefix(value: &str) -> Option<&'static str> {
    let mut matches: Vec<(&&str, &&str)> = CREDENTIAL_PREFIXES
        .entries()
        .filter(|(prefix, _)| value.starts_with(**prefix) && value.len() >= prefix.len() + 8)
        .collect();
    // Longest prefix wins when several match.
    matches.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));
    matches.first().map(|(_, kind)| **kind)
}

pub fn hardcoded_secret(unit: &SourceUnit, limits: &Thresholds) -> Vec<Hit> {
    let mut hits = Vec::new();

    for assignment in &unit.assignments {
        let value = assignment.value.as_str();
        if is_placeholder(value) || value.chars().any(char::is_whitespace) {
            continue;
        }

        if let Some(kind) = credential_prefix(value) {
            hits.push(Hit::new(
                assignment.span,
                format!(
                    "`{}` is assigned a hard-coded {}",
                    assignment.target, kind
                ),
            ));
            continue;
        }

        if SECRET_NAME.is_match(&assignment.target)
            && value.chars().count() >= limits.secret_min_length
            && shannon_entropy(value) >= limits.secret_min_entropy
        {
            hits.push(Hit::new(
                assignment.span,
                format!(
                    "`{}` is assigned a string that looks like a hard-coded secret",
                    assignment.target
                ),
            ));
        }
    }

    hits
}

fn dangerous_reason(language: Language, call: &CallSite) -> Option<String> {
    match language {
        Language::Python => {
            if let Some(reason) = PYTHON_DANGEROUS.get(call.callee.as_str()) {
                return Some(format!("call to `{}` {}", call.callee, reason));
            }
            if PYTHON_SHELL_CALLS.contains(call.callee.as_str())
                && call.keywords.iter().any(|k| k == "shell=True")
            {
                return Some(format!(
                    "`{}` with shell=True runs a shell command",
                    call.callee
                ));
            }
            None
        }
        Language::JavaScript => {
            if call.is_constructor {
                return (call.callee == "Function")
                    .then(|| "`new Function` evaluates a string as code".to_string());
            }
            if let Some(reason) = JAVASCRIPT_DANGEROUS.get(call.callee.as_str()) {
                return Some(format!("call to `{}` {}", call.callee, reason));
            }
            let timer = matches!(
                call.callee.as_str(),
                "setTimeout" | "setInterval" | "window.setTimeout" | "window.setInterval"
            );
            let string_arg = call
                .first_arg
                .as_ref()
                .map(|a| a.is_string || a.dynamic)
                .unwrap_or(false);
            if timer && string_arg {
                return Some(format!(
                    "`{}` with a string argument evaluates it as code",
                    call.callee
                ));
            }
            None
        }
        Language::Terraform => None,
    }
}

pub fn dangerous_call(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    unit.calls
        .iter()
        .filter_map(|call| {
            dangerous_reason(unit.language, call).map(|message| Hit::new(call.span, message))
        })
        .collect()
}

pub fn sql_string_building(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    unit.calls
        .iter()
        .filter(|call| SQL_METHODS.contains(&call.method_name()))
        .filter_map(|call| {
            let arg = call.first_arg.as_ref()?;
            (arg.dynamic && SQL_KEYWORD.is_match(&arg.text)).then(|| {
                Hit::new(
                    call.span,
                    format!(
                        "SQL passed to `{}` is built from strings; use query parameters",
                        call.callee
                    ),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Argument, LiteralAssignment, Span};

    fn assignment(target: &str, value: &str, line: usize) -> LiteralAssignment {
        LiteralAssignment {
            target: target.to_string(),
            value: value.to_string(),
            span: Span::on_line(line, 11, value.len() + 2),
        }
    }

    fn call(callee: &str, arg: Option<Argument>) -> CallSite {
        CallSite {
            callee: callee.to_string(),
            span: Span::new(1, 1, 1, 20),
            first_arg: arg,
            keywords: Vec::new(),
            is_constructor: false,
        }
    }

    fn arg(text: &str, is_string: bool, dynamic: bool) -> Option<Argument> {
        Some(Argument {
            text: text.to_string(),
            is_string,
            dynamic,
        })
    }

    #[test]
    fn test_entropy() {
        assert_eq!(shannon_entropy(""), 0.0);
        assert_eq!(shannon_entropy("aaaa"), 0.0);
        assert!((shannon_entropy("abcd") - 2.0).abs() < 1e-9);
        assert!(shannon_entropy("kX9$mQ2!vL7#") > 3.0);
    }

    #[test]
    fn test_known_prefix_flagged_once() {
        let mut unit = SourceUnit::empty("config.py", Language::Python, "");
        unit.assignments = vec![assignment("API_KEY", "sk_live_abcdef123456", 1)];
        let hits = hardcoded_secret(&unit, &Thresholds::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].message,
            "`API_KEY` is assigned a hard-coded Stripe live secret key"
        );
    }

    #[test]
    fn test_name_and_entropy() {
        let mut unit = SourceUnit::empty("a.js", Language::JavaScript, "");
        unit.assignments = vec![
            assignment("dbPassword", "Tr0ub4dor&3xQ", 1),
            assignment("password", "aaaaaaaaaaaa", 2),
            assignment("password", "changeme", 3),
            assignment("token", "short", 4),
            assignment("greeting", "Zx8#kLm2Qp9!", 5),
            assignment("token_help", "The token used to call the API", 6),
            assignment("secret", "${var.secret}", 7),
        ];
        let hits = hardcoded_secret(&unit, &Thresholds::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].span.start_line, 1);
    }

    #[test]
    fn test_python_dangerous_calls() {
        let mut unit = SourceUnit::empty("a.py", Language::Python, "");
        let mut shell = call("subprocess.run", arg("cmd", false, false));
        shell.keywords = vec!["shell=True".to_string()];
        unit.calls = vec![
            call("eval", arg("expr", false, false)),
            call("os.system", arg("\"ls\"", true, false)),
            shell,
            call("subprocess.run", arg("[\"ls\"]", false, false)),
            call("print", arg("x", false, false)),
        ];
        let hits = dangerous_call(&unit, &Thresholds::default());
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].message, "call to `eval` evaluates a string as code");
    }

    #[test]
    fn test_javascript_dangerous_calls() {
        let mut unit = SourceUnit::empty("a.js", Language::JavaScript, "");
        let mut ctor = call("Function", arg("\"a\"", true, false));
        ctor.is_constructor = true;
        let mut date = call("Date", None);
        date.is_constructor = true;
        unit.calls = vec![
            call("eval", arg("code", false, false)),
            ctor,
            date,
            call("setTimeout", arg("\"tick()\"", true, false)),
            call("setTimeout", arg("tick", false, false)),
            call("document.write", arg("html", false, false)),
        ];
        let hits = dangerous_call(&unit, &Thresholds::default());
        assert_eq!(hits.len(), 4);
    }

    #[test]
    fn test_sql_string_building() {
        let mut unit = SourceUnit::empty("a.py", Language::Python, "");
        unit.calls = vec![
            call(
                "cursor.execute",
                arg("\"SELECT * FROM users WHERE id = \" + uid", false, true),
            ),
            call("cursor.execute", arg("\"SELECT 1\"", true, false)),
            call("db.query", arg("f\"hello {name}\"", false, true)),
            call("run", arg("\"DELETE FROM t\" + x", false, true)),
        ];
        let hits = sql_string_building(&unit, &Thresholds::default());
        assert_eq!(hits.len(), 1);
        assert!(hits[0].message.contains("cursor.execute"));
    }
}
