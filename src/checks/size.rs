//! File and function size limits.

use crate::analysis::{SourceUnit, Span};

use super::{Hit, Thresholds};

pub fn file_too_long(unit: &SourceUnit, limits: &Thresholds) -> Vec<Hit> {
    let lines = unit.line_count();
    if lines <= limits.max_file_lines {
        return Vec::new();
    }
    vec![Hit::new(
        Span::new(1, 1, 1, 1),
        format!(
            "file has {} lines (limit {}); consider splitting it",
            lines, limits.max_file_lines
        ),
    )]
}

pub fn function_too_long(unit: &SourceUnit, limits: &Thresholds) -> Vec<Hit> {
    unit.callables()
        .filter_map(|decl| {
            let lines = decl.span.line_count();
            (lines > limits.max_function_lines).then(|| {
                Hit::new(
                    decl.name_span,
                    format!(
                        "{} `{}` is {} lines long (limit {})",
                        decl.kind,
                        decl.qualified_name(),
                        lines,
                        limits.max_function_lines
                    ),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Declaration, DeclarationKind};
    use crate::language::Language;

    #[test]
    fn test_file_too_long() {
        let limits = Thresholds {
            max_file_lines: 3,
            ..Thresholds::default()
        };
        let short = SourceUnit::empty("a.py", Language::Python, "a\nb\nc\n");
        assert!(file_too_long(&short, &limits).is_empty());

        let long = SourceUnit::empty("a.py", Language::Python, "a\nb\nc\nd\n");
        let hits = file_too_long(&long, &limits);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message, "file has 4 lines (limit 3); consider splitting it");
    }

    #[test]
    fn test_function_too_long() {
        let limits = Thresholds {
            max_function_lines: 5,
            ..Thresholds::default()
        };
        let mut unit = SourceUnit::empty("a.py", Language::Python, "");
        let mut method = Declaration::new(
            "process",
            DeclarationKind::Method,
            Span::new(10, 5, 20, 1),
            Span::new(10, 9, 10, 16),
        );
        method.parent = Some("Job".to_string());
        unit.declarations = vec![
            Declaration::new("short", DeclarationKind::Function, Span::new(1, 1, 5, 1), Span::new(1, 5, 1, 10)),
            Declaration::new("Job", DeclarationKind::Class, Span::new(9, 1, 40, 1), Span::new(9, 7, 9, 10)),
            method,
        ];
        let hits = function_too_long(&unit, &limits);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message, "method `Job.process` is 11 lines long (limit 5)");
    }
}
