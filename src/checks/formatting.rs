//! Per-line formatting checks.
//!
//! These only look at raw text, so they apply to every language. Columns
//! count characters.

use crate::analysis::{SourceUnit, Span};

use super::{Hit, Thresholds};

pub fn line_too_long(unit: &SourceUnit, limits: &Thresholds) -> Vec<Hit> {
    let max = limits.max_line_length;
    unit.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let len = line.chars().count();
            (len > max).then(|| {
                Hit::new(
                    Span::new(i + 1, max + 1, i + 1, len + 1),
                    format!("line is {} characters long (limit {})", len, max),
                )
            })
        })
        .collect()
}

pub fn trailing_whitespace(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    unit.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let kept = line.trim_end_matches([' ', '\t']);
            if kept.len() == line.len() {
                return None;
            }
            let start = kept.chars().count() + 1;
            let end = line.chars().count() + 1;
            Some(Hit::new(
                Span::new(i + 1, start, i + 1, end),
                "trailing whitespace",
            ))
        })
        .collect()
}

pub fn missing_final_newline(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    if unit.text.is_empty() || unit.text.ends_with('\n') {
        return Vec::new();
    }
    let last = unit.line_count();
    let col = unit.line_len(last).unwrap_or(0) + 1;
    vec![Hit::new(
        Span::new(last, col, last, col),
        "file does not end with a newline",
    )]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Indent {
    Tabs,
    Spaces,
    Mixed,
}

/// Classify a line's leading whitespace. Blank lines have none.
fn indentation(line: &str) -> Option<(Indent, usize)> {
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    if width == 0 || width == line.len() {
        return None;
    }
    let leading = &line[..width];
    let rest = &line[width..];

    let has_tab = leading.contains('\t');
    let has_space = leading.contains(' ');
    let kind = match (has_tab, has_space) {
        (true, false) => Indent::Tabs,
        (false, true) => Indent::Spaces,
        // Block comment continuation (`\t * text`) aligns with one space.
        (true, true) if leading.ends_with("\t ") && rest.starts_with('*') => Indent::Tabs,
        _ => Indent::Mixed,
    };
    Some((kind, width))
}

pub fn mixed_indentation(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    let classified: Vec<(usize, Indent, usize)> = unit
        .lines()
        .enumerate()
        .filter_map(|(i, line)| indentation(line).map(|(kind, width)| (i + 1, kind, width)))
        .collect();

    let tabs = classified.iter().filter(|(_, k, _)| *k == Indent::Tabs).count();
    let spaces = classified.iter().filter(|(_, k, _)| *k == Indent::Spaces).count();
    // Ties go to whichever style appears first.
    let dominant = if tabs != spaces {
        if tabs > spaces {
            Indent::Tabs
        } else {
            Indent::Spaces
        }
    } else {
        classified
            .iter()
            .map(|(_, k, _)| *k)
            .find(|k| *k != Indent::Mixed)
            .unwrap_or(Indent::Spaces)
    };

    classified
        .into_iter()
        .filter_map(|(line, kind, width)| {
            let message = match kind {
                Indent::Mixed => "indentation mixes tabs and spaces",
                Indent::Tabs if dominant == Indent::Spaces => {
                    "tab indentation in a file indented with spaces"
                }
                Indent::Spaces if dominant == Indent::Tabs => {
                    "space indentation in a file indented with tabs"
                }
                _ => return None,
            };
            Some(Hit::new(Span::new(line, 1, line, width + 1), message))
        })
        .collect()
}
