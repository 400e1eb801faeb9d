//! The static rule catalog.

use super::{Category, Rule, Severity};
use crate::checks::{docs, formatting, handlers, naming, performance, security, size};
use crate::language::Language;

const ALL: &[Language] = &[Language::Terraform, Language::JavaScript, Language::Python];
const CODE: &[Language] = &[Language::JavaScript, Language::Python];
const TF: &[Language] = &[Language::Terraform];
const JS: &[Language] = &[Language::JavaScript];
const PY: &[Language] = &[Language::Python];

pub(super) const PARSE_ERROR: Rule = Rule {
    id: "parse_error",
    category: Category::Analysis,
    severity: Severity::Error,
    languages: ALL,
    description: "File could not be parsed and was not analyzed",
    check: None,
};

pub(super) const IO_ERROR: Rule = Rule {
    id: "io_error",
    category: Category::Analysis,
    severity: Severity::Error,
    languages: ALL,
    description: "File could not be read and was not analyzed",
    check: None,
};

/// Every rule, in registry order.
pub static RULES: &[Rule] = &[
    // Formatting
    Rule {
        id: "line_too_long",
        category: Category::Formatting,
        severity: Severity::Warning,
        languages: ALL,
        description: "Line exceeds the maximum line length",
        check: Some(formatting::line_too_long),
    },
    Rule {
        id: "trailing_whitespace",
        category: Category::Formatting,
        severity: Severity::Warning,
        languages: ALL,
        description: "Line ends with spaces or tabs",
        check: Some(formatting::trailing_whitespace),
    },
    Rule {
        id: "missing_final_newline",
        category: Category::Formatting,
        severity: Severity::Warning,
        languages: ALL,
        description: "Non-empty file does not end with a newline",
        check: Some(formatting::missing_final_newline),
    },
    Rule {
        id: "mixed_indentation",
        category: Category::Formatting,
        severity: Severity::Error,
        languages: ALL,
        description: "Indentation mixes tabs and spaces",
        check: Some(formatting::mixed_indentation),
    },
    // Naming
    Rule {
        id: "function_naming",
        category: Category::Naming,
        severity: Severity::Error,
        languages: CODE,
        description: "Function names follow the language casing convention",
        check: Some(naming::function_naming),
    },
    Rule {
        id: "class_naming",
        category: Category::Naming,
        severity: Severity::Error,
        languages: CODE,
        description: "Class names are PascalCase",
        check: Some(naming::class_naming),
    },
    Rule {
        id: "method_naming",
        category: Category::Naming,
        severity: Severity::Error,
        languages: CODE,
        description: "Method names follow the language casing convention",
        check: Some(naming::method_naming),
    },
    Rule {
        id: "variable_naming",
        category: Category::Naming,
        severity: Severity::Error,
        languages: CODE,
        description: "Variable names follow the language casing convention",
        check: Some(naming::variable_naming),
    },
    Rule {
        id: "constant_naming",
        category: Category::Naming,
        severity: Severity::Warning,
        languages: CODE,
        description: "Constants are UPPER_SNAKE_CASE",
        check: Some(naming::constant_naming),
    },
    Rule {
        id: "resource_naming",
        category: Category::Naming,
        severity: Severity::Error,
        languages: TF,
        description: "Terraform block labels and locals are snake_case",
        check: Some(naming::resource_naming),
    },
    // Documentation
    Rule {
        id: "missing_docstring",
        category: Category::Documentation,
        severity: Severity::Warning,
        languages: PY,
        description: "Public functions, classes and methods have a docstring",
        check: Some(docs::missing_docstring),
    },
    Rule {
        id: "missing_jsdoc",
        category: Category::Documentation,
        severity: Severity::Warning,
        languages: JS,
        description: "Public functions, classes and methods have a doc comment",
        check: Some(docs::missing_jsdoc),
    },
    Rule {
        id: "missing_description",
        category: Category::Documentation,
        severity: Severity::Warning,
        languages: TF,
        description: "Variables and outputs have a description",
        check: Some(docs::missing_description),
    },
    // Security
    Rule {
        id: "hardcoded_secret",
        category: Category::Security,
        severity: Severity::Warning,
        languages: ALL,
        description: "Credential-like string literal in source",
        check: Some(security::hardcoded_secret),
    },
    Rule {
        id: "dangerous_call",
        category: Category::Security,
        severity: Severity::Warning,
        languages: CODE,
        description: "Call that executes dynamic code or shell commands",
        check: Some(security::dangerous_call),
    },
    Rule {
        id: "sql_string_building",
        category: Category::Security,
        severity: Severity::Warning,
        languages: CODE,
        description: "SQL query built from strings at runtime",
        check: Some(security::sql_string_building),
    },
    // Error handling
    Rule {
        id: "broad_exception",
        category: Category::ErrorHandling,
        severity: Severity::Warning,
        languages: PY,
        description: "Bare except or except Exception",
        check: Some(handlers::broad_exception),
    },
    Rule {
        id: "empty_handler",
        category: Category::ErrorHandling,
        severity: Severity::Warning,
        languages: CODE,
        description: "Exception handler with an empty body",
        check: Some(handlers::empty_handler),
    },
    // Performance
    Rule {
        id: "await_in_loop",
        category: Category::Performance,
        severity: Severity::Info,
        languages: JS,
        description: "await inside a loop body serializes independent work",
        check: Some(performance::await_in_loop),
    },
    Rule {
        id: "string_concat_in_loop",
        category: Category::Performance,
        severity: Severity::Info,
        languages: PY,
        description: "String built with += inside a loop",
        check: Some(performance::string_concat_in_loop),
    },
    // Organization
    Rule {
        id: "file_too_long",
        category: Category::Organization,
        severity: Severity::Info,
        languages: ALL,
        description: "File exceeds the maximum number of lines",
        check: Some(size::file_too_long),
    },
    Rule {
        id: "function_too_long",
        category: Category::Organization,
        severity: Severity::Info,
        languages: CODE,
        description: "Function exceeds the maximum number of lines",
        check: Some(size::function_too_long),
    },
    // Analysis
    PARSE_ERROR,
    IO_ERROR,
];
