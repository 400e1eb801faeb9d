//! Exception handling checks.

use crate::analysis::SourceUnit;
use crate::language::Language;

use super::{Hit, Thresholds};

const BROAD_TYPES: &[&str] = &["Exception", "BaseException"];

pub fn broad_exception(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    unit.handlers
        .iter()
        .filter_map(|handler| {
            if handler.caught.is_empty() {
                return Some(Hit::new(
                    handler.span,
                    "bare `except:` catches every exception, including KeyboardInterrupt",
                ));
            }
            let broad = handler.caught.iter().find(|t| {
                let name = t.rsplit('.').next().unwrap_or(t);
                BROAD_TYPES.contains(&name)
            })?;
            Some(Hit::new(
                handler.span,
                format!("`except {}` is too broad; catch specific exceptions", broad),
            ))
        })
        .collect()
}

pub fn empty_handler(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    let message = match unit.language {
        Language::Python => "exception handler only contains `pass` and silently drops errors",
        _ => "empty `catch` block silently drops errors",
    };
    unit.handlers
        .iter()
        .filter(|h| h.is_empty)
        .map(|h| Hit::new(h.span, message))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Handler, Span};

    fn handler(caught: &[&str], is_empty: bool, line: usize) -> Handler {
        Handler {
            caught: caught.iter().map(|s| s.to_string()).collect(),
            binds_error: false,
            span: Span::new(line, 1, line + 1, 9),
            is_empty,
        }
    }

    #[test]
    fn test_broad_exception() {
        let mut unit = SourceUnit::empty("a.py", Language::Python, "");
        unit.handlers = vec![
            handler(&[], false, 1),
            handler(&["ValueError", "Exception"], false, 3),
            handler(&["builtins.BaseException"], false, 5),
            handler(&["KeyError"], true, 7),
        ];
        let hits = broad_exception(&unit, &Thresholds::default());
        assert_eq!(hits.len(), 3);
        assert!(hits[0].message.starts_with("bare `except:`"));
        assert_eq!(
            hits[1].message,
            "`except Exception` is too broad; catch specific exceptions"
        );
    }

    #[test]
    fn test_empty_handler() {
        let mut unit = SourceUnit::empty("a.js", Language::JavaScript, "");
        unit.handlers = vec![handler(&[], true, 1), handler(&[], false, 4)];
        let hits = empty_handler(&unit, &Thresholds::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].span.start_line, 1);
        assert!(hits[0].message.contains("catch"));
    }
}
