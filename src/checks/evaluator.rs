//! Applies rules to source units.

use std::collections::{HashMap, HashSet};

use crate::analysis::{SourceUnit, Span};
use crate::language::Language;
use crate::rules::{self, Category, Rule, Severity};

use super::{Finding, Thresholds};

/// Rule evaluation with effective settings.
///
/// Predicates only return spans and messages; the evaluator attributes each
/// hit to the rule that produced it, so every finding carries a registered
/// rule id, its category and the severity after overrides.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    thresholds: Thresholds,
    overrides: HashMap<String, Severity>,
    disabled_rules: HashSet<String>,
    disabled_categories: HashSet<Category>,
}

impl Evaluator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    pub fn with_override(mut self, rule: impl Into<String>, severity: Severity) -> Self {
        self.overrides.insert(rule.into(), severity);
        self
    }

    pub fn disable_rule(mut self, rule: impl Into<String>) -> Self {
        self.disabled_rules.insert(rule.into());
        self
    }

    pub fn disable_category(mut self, category: Category) -> Self {
        self.disabled_categories.insert(category);
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Meta rules are always enabled.
    pub fn is_enabled(&self, rule: &Rule) -> bool {
        rule.is_meta()
            || !(self.disabled_rules.contains(rule.id)
                || self.disabled_categories.contains(&rule.category))
    }

    pub fn severity_of(&self, rule: &Rule) -> Severity {
        self.overrides.get(rule.id).copied().unwrap_or(rule.severity)
    }

    /// Enabled, evaluable rules for a language, in registry order.
    pub fn applicable(&self, language: Language) -> Vec<&'static Rule> {
        rules::rules_for(language)
            .into_iter()
            .filter(|r| !r.is_meta() && self.is_enabled(r))
            .collect()
    }

    /// Evaluate one rule against one unit.
    ///
    /// Rules that do not list the unit's language produce nothing. Spans are
    /// clamped into the file.
    pub fn evaluate(&self, rule: &'static Rule, unit: &SourceUnit) -> Vec<Finding> {
        let check = match rule.check {
            Some(check) if rule.applies_to(unit.language) => check,
            _ => return Vec::new(),
        };

        check(unit, &self.thresholds)
            .into_iter()
            .map(|hit| Finding {
                rule: rule.id,
                category: rule.category,
                severity: self.severity_of(rule),
                file: unit.path.clone(),
                span: unit.clamp(hit.span),
                message: hit.message,
            })
            .collect()
    }

    /// Evaluate every applicable rule against a unit.
    pub fn evaluate_unit(&self, unit: &SourceUnit) -> Vec<Finding> {
        self.applicable(unit.language)
            .into_iter()
            .flat_map(|rule| self.evaluate(rule, unit))
            .collect()
    }

    /// A finding raised outside predicate evaluation (parse and read failures).
    pub fn finding(
        &self,
        rule: &'static Rule,
        path: &str,
        span: Span,
        message: impl Into<String>,
    ) -> Finding {
        Finding {
            rule: rule.id,
            category: rule.category,
            severity: self.severity_of(rule),
            file: path.to_string(),
            span,
            message: message.into(),
        }
    }
}

/// Evaluate one rule against one unit with default settings.
pub fn evaluate(rule: &'static Rule, unit: &SourceUnit) -> Vec<Finding> {
    Evaluator::default().evaluate(rule, unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::adapter_for;
    use crate::rules::find_rule;

    fn parse(language: Language, path: &str, source: &str) -> SourceUnit {
        adapter_for(language).unwrap().parse(path, source).unwrap()
    }

    fn rule(id: &str) -> &'static Rule {
        find_rule(id).unwrap()
    }

    #[test]
    fn test_findings_are_attributed() {
        let unit = parse(Language::Python, "calc.py", "def CalculateTotal(items):\n    return 0\n");
        let findings = evaluate(rule("function_naming"), &unit);
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.rule, "function_naming");
        assert_eq!(f.category, Category::Naming);
        assert_eq!(f.severity, Severity::Error);
        assert_eq!(f.file, "calc.py");
        assert_eq!(f.span, Span::new(1, 5, 1, 19));
    }

    #[test]
    fn test_rule_for_other_language_is_silent() {
        let unit = parse(Language::Terraform, "main.tf", "locals {\n  a = 1\n}\n");
        assert!(evaluate(rule("broad_exception"), &unit).is_empty());
        assert!(evaluate(rule("function_naming"), &unit).is_empty());
        assert!(evaluate(rule("parse_error"), &unit).is_empty());
    }

    #[test]
    fn test_severity_override_and_disable() {
        let evaluator = Evaluator::new(Thresholds {
            max_line_length: 10,
            ..Thresholds::default()
        })
        .with_override("line_too_long", Severity::Error)
        .disable_category(Category::Documentation)
        .disable_rule("trailing_whitespace");

        let unit = parse(Language::Python, "a.py", "def f():\n    return 'a long line'   \n");
        let findings = evaluator.evaluate_unit(&unit);
        let ids: Vec<_> = findings.iter().map(|f| f.rule).collect();
        assert_eq!(ids, vec!["line_too_long"]);
        assert_eq!(findings[0].severity, Severity::Error);
        assert!(evaluator.is_enabled(rule("parse_error")));
    }

    #[test]
    fn test_javascript_scenario() {
        let unit = parse(Language::JavaScript, "utils.js", "function Add(a,b){return a+b}\n");
        let findings = Evaluator::default().evaluate_unit(&unit);
        let naming: Vec<_> = findings.iter().filter(|f| f.category == Category::Naming).collect();
        assert_eq!(naming.len(), 1);
        assert_eq!(naming[0].rule, "function_naming");
        assert!(findings.iter().all(|f| f.category != Category::Formatting));
    }
}
