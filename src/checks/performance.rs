//! Loop performance hints.

use crate::analysis::{LoopHazardKind, SourceUnit};

use super::{Hit, Thresholds};

fn hazards(unit: &SourceUnit, kind: LoopHazardKind, message: &str) -> Vec<Hit> {
    unit.loop_hazards
        .iter()
        .filter(|h| h.kind == kind)
        .map(|h| Hit::new(h.span, format!("{}: `{}`", message, first_line(&h.text))))
        .collect()
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

pub fn await_in_loop(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    hazards(
        unit,
        LoopHazardKind::AwaitInLoop,
        "await inside a loop runs iterations sequentially; consider Promise.all",
    )
}

pub fn string_concat_in_loop(unit: &SourceUnit, _limits: &Thresholds) -> Vec<Hit> {
    hazards(
        unit,
        LoopHazardKind::StringConcatInLoop,
        "string built with += inside a loop; collect parts and use str.join",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{LoopHazard, Span};
    use crate::language::Language;

    #[test]
    fn test_filters_by_kind() {
        let mut unit = SourceUnit::empty("a.js", Language::JavaScript, "");
        unit.loop_hazards = vec![
            LoopHazard {
                kind: LoopHazardKind::AwaitInLoop,
                span: Span::new(3, 5, 3, 20),
                text: "await save(id)".to_string(),
            },
            LoopHazard {
                kind: LoopHazardKind::StringConcatInLoop,
                span: Span::new(6, 5, 6, 20),
                text: "out += row".to_string(),
            },
        ];
        let limits = Thresholds::default();

        let hits = await_in_loop(&unit, &limits);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].message.ends_with("`await save(id)`"));
        assert_eq!(string_concat_in_loop(&unit, &limits)[0].span.start_line, 6);
    }
}
