//! Identifier casing checks.

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::{Declaration, DeclarationKind, SourceUnit};
use crate::language::Language;

use super::{Hit, Thresholds};

lazy_static! {
    static ref SNAKE_CASE: Regex = Regex::new(r"^_*[a-z][a-z0-9_]*$").unwrap();
    static ref UPPER_SNAKE_CASE: Regex = Regex::new(r"^_*[A-Z][A-Z0-9_]*$").unwrap();
    static ref PASCAL_CASE: Regex = Regex::new(r"^_*[A-Z][a-zA-Z0-9]*$").unwrap();
    static ref CAMEL_CASE: Regex = Regex::new(r"^[_$]*[a-z][a-zA-Z0-9$]*$").unwrap();
    static ref TERRAFORM_NAME: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
}

/// A casing convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    Snake,
    UpperSnake,
    Pascal,
    Camel,
}

impl Case {
    fn label(&self) -> &'static str {
        match self {
            Case::Snake => "snake_case",
            Case::UpperSnake => "UPPER_SNAKE_CASE",
            Case::Pascal => "PascalCase",
            Case::Camel => "camelCase",
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Case::Snake => SNAKE_CASE.is_match(name),
            Case::UpperSnake => UPPER_SNAKE_CASE.is_match(name),
            Case::Pascal => PASCAL_CASE.is_match(name),
            Case::Camel => CAMEL_CASE.is_match(name),
        }
    }

    fn convert(&self, name: &str) -> String {
        let words = split_words(name);
        match self {
            Case::Snake => words.join("_"),
            Case::UpperSnake => words.join("_").to_uppercase(),
            Case::Pascal => words.iter().map(|w| capitalize(w)).collect(),
            Case::Camel => {
                let mut out = String::new();
                for (i, word) in words.iter().enumerate() {
                    if i == 0 {
                        out.push_str(word);
                    } else {
                        out.push_str(&capitalize(word));
                    }
                }
                out
            }
        }
    }
}

/// Split an identifier into lowercase words at underscores, dashes and case changes.
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == '$' || c == '#' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev_lower = chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit();
            let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            let prev_upper = chars[i - 1].is_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Name with its privacy marker stripped (`#field` in JavaScript classes).
fn bare_name(decl: &Declaration) -> &str {
    decl.name.trim_start_matches('#')
}

/// `_`, `__` and JavaScript's `$` are conventional throwaway or library names.
fn is_placeholder(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c == '_' || c == '$')
}

fn check(decl: &Declaration, allowed: &[Case]) -> Option<Hit> {
    let name = bare_name(decl);
    if is_placeholder(name) {
        return None;
    }
    if allowed.iter().any(|case| case.matches(name)) {
        return None;
    }
    let expected = allowed[0];
    let suggestion = expected.convert(name);
    let alternatives: Vec<&str> = allowed.iter().map(|c| c.label()).collect();
    let mut message = format!(
        "{} `{}` should be {}",
        decl.kind,
        decl.name,
        alternatives.join(" or ")
    );
    if !suggestion.is_empty() && suggestion != name {
        message.push_str(&format!(" (e.g. `{}`)", suggestion));
    }
    Some(Hit::new(decl.name_span, message))
}

fn check_kind(unit: &SourceUnit, kind: DeclarationKind, allowed: &[Case]) -> Vec<Hit> {
    unit.declarations_by_kind(kind)
        .filter_map(|decl| check(decl, allowed))
        .collect()
}

pub fn function_naming(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    match unit.language {
        Language::Python => check_kind(unit, DeclarationKind::Function, &[Case::Snake]),
        // JSX components are PascalCase functions.
        Language::JavaScript if unit.is_jsx() => {
            check_kind(unit, DeclarationKind::Function, &[Case::Camel, Case::Pascal])
        }
        Language::JavaScript => check_kind(unit, DeclarationKind::Function, &[Case::Camel]),
        Language::Terraform => Vec::new(),
    }
}

pub fn class_naming(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    check_kind(unit, DeclarationKind::Class, &[Case::Pascal])
}

pub fn method_naming(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    match unit.language {
        Language::Python => check_kind(unit, DeclarationKind::Method, &[Case::Snake]),
        Language::JavaScript => check_kind(unit, DeclarationKind::Method, &[Case::Camel]),
        Language::Terraform => Vec::new(),
    }
}

pub fn variable_naming(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    match unit.language {
        Language::Python => check_kind(unit, DeclarationKind::Variable, &[Case::Snake]),
        Language::JavaScript => check_kind(unit, DeclarationKind::Variable, &[Case::Camel]),
        Language::Terraform => Vec::new(),
    }
}

pub fn constant_naming(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    match unit.language {
        Language::Python => check_kind(unit, DeclarationKind::Constant, &[Case::UpperSnake]),
        Language::JavaScript => {
            check_kind(unit, DeclarationKind::Constant, &[Case::UpperSnake, Case::Camel])
        }
        Language::Terraform => Vec::new(),
    }
}

pub fn resource_naming(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    unit.declarations
        .iter()
        .filter(|d| d.kind != DeclarationKind::Provider)
        .filter(|d| !TERRAFORM_NAME.is_match(&d.name))
        .map(|d| {
            let suggestion = Case::Snake.convert(&d.name);
            Hit::new(
                d.name_span,
                format!(
                    "{} name `{}` should be snake_case (e.g. `{}`)",
                    d.kind, d.name, suggestion
                ),
            )
        })
        .collect()
}
