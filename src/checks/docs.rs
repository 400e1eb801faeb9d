//! Documentation presence checks.

use crate::analysis::{Declaration, DeclarationKind, SourceUnit};

use super::{Hit, Thresholds};

/// Whether a declaration is exempt from documentation requirements.
fn exempt(decl: &Declaration) -> bool {
    let dunder = decl.name.starts_with("__") && decl.name.ends_with("__");
    dunder || decl.name == "constructor" || !decl.is_public()
}

/// Length of doc content, ignoring surrounding whitespace.
fn doc_length(doc: &str) -> usize {
    doc.trim().chars().count()
}

fn check_documented(unit: &SourceUnit, limits: &Thresholds, what: &str) -> Vec<Hit> {
    let private_classes: Vec<&str> = unit
        .declarations_by_kind(DeclarationKind::Class)
        .filter(|c| !c.is_public())
        .map(|c| c.name.as_str())
        .collect();

    unit.declarations
        .iter()
        .filter(|d| {
            matches!(
                d.kind,
                DeclarationKind::Function | DeclarationKind::Method | DeclarationKind::Class
            )
        })
        .filter(|d| !exempt(d))
        .filter(|d| match &d.parent {
            Some(parent) => !private_classes.contains(&parent.as_str()),
            None => true,
        })
        .filter_map(|d| match d.doc.as_deref() {
            None => Some(Hit::new(
                d.name_span,
                format!("public {} `{}` has no {}", d.kind, d.qualified_name(), what),
            )),
            Some(doc) if doc_length(doc) < limits.min_doc_length => Some(Hit::new(
                d.name_span,
                format!(
                    "{} of `{}` is shorter than {} characters",
                    what,
                    d.qualified_name(),
                    limits.min_doc_length
                ),
            )),
            Some(_) => None,
        })
        .collect()
}

pub fn missing_docstring(unit: &SourceUnit, limits: &Thresholds) -> Vec<Hit> {
    check_documented(unit, limits, "docstring")
}

pub fn missing_jsdoc(unit: &SourceUnit, limits: &Thresholds) -> Vec<Hit> {
    check_documented(unit, limits, "doc comment")
}

pub fn missing_description(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    unit.declarations
        .iter()
        .filter(|d| matches!(d.kind, DeclarationKind::Input | DeclarationKind::Output))
        .filter(|d| d.doc.as_deref().map(doc_length).unwrap_or(0) == 0)
        .map(|d| {
            Hit::new(
                d.name_span,
                format!("{} `{}` has no description", d.kind, d.name),
            )
        })
        .collect()
}
