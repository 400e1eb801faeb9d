//! Python language adapter using tree-sitter.

use std::collections::HashSet;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language as TsLanguage, Node, Query, QueryCursor};

use crate::analysis::treesitter::{
    collect_comments, leading_comment, named_children, node_text, parse_tree, walk,
};
use crate::analysis::{
    Argument, CallSite, Comment, Declaration, DeclarationKind, Handler, LanguageAdapter,
    LiteralAssignment, LoopHazard, LoopHazardKind, SourceUnit, Span,
};
use crate::error::CheckError;
use crate::language::Language;

/// Tree-sitter query for call sites.
const CALL_QUERY: &str = r#"
(call
  function: (_) @callee
  arguments: (argument_list) @args
) @call
"#;

/// Tree-sitter query for exception handlers.
const HANDLER_QUERY: &str = r#"
(except_clause) @handler
"#;

pub struct PythonAdapter {
    language: TsLanguage,
    call_query: Query,
    handler_query: Query,
}

impl PythonAdapter {
    pub fn new() -> anyhow::Result<Self> {
        let language: TsLanguage = tree_sitter_python::LANGUAGE.into();
        let call_query = Query::new(&language, CALL_QUERY)?;
        let handler_query = Query::new(&language, HANDLER_QUERY)?;
        Ok(Self {
            language,
            call_query,
            handler_query,
        })
    }

    fn extract_declarations(
        &self,
        root: Node,
        source: &str,
        comments: &[Comment],
    ) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        let mut seen_variables = HashSet::new();

        for child in named_children(root) {
            match child.kind() {
                "function_definition" | "decorated_definition" | "class_definition" => {
                    let (outer, def) = unwrap_decorated(child);
                    let def = match def {
                        Some(d) => d,
                        None => continue,
                    };
                    if def.kind() == "function_definition" {
                        if let Some(decl) =
                            self.function_declaration(outer, def, source, comments, None)
                        {
                            declarations.push(decl);
                        }
                    } else if def.kind() == "class_definition" {
                        self.class_declarations(outer, def, source, comments, &mut declarations);
                    }
                }
                "expression_statement" => {
                    for assignment in named_children(child) {
                        if assignment.kind() != "assignment" {
                            continue;
                        }
                        if let Some(decl) = variable_declaration(assignment, source, comments) {
                            if seen_variables.insert(decl.name.clone()) {
                                declarations.push(decl);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        declarations.sort_by_key(|d| (d.span.start_line, d.span.start_col, d.name.clone()));
        declarations
    }

    fn function_declaration(
        &self,
        outer: Node,
        def: Node,
        source: &str,
        comments: &[Comment],
        parent: Option<&str>,
    ) -> Option<Declaration> {
        let name_node = def.child_by_field_name("name")?;
        let name = node_text(name_node, source).to_string();
        let kind = if parent.is_some() {
            DeclarationKind::Method
        } else {
            DeclarationKind::Function
        };

        let mut decl = Declaration::new(
            name,
            kind,
            Span::from_node(outer, source),
            Span::from_node(name_node, source),
        );
        decl.annotation = def
            .child_by_field_name("return_type")
            .map(|n| node_text(n, source).to_string());
        decl.doc = docstring(def, source)
            .or_else(|| leading_comment(comments, outer.start_position().row + 1));
        decl.parent = parent.map(str::to_string);
        Some(decl)
    }

    fn class_declarations(
        &self,
        outer: Node,
        def: Node,
        source: &str,
        comments: &[Comment],
        out: &mut Vec<Declaration>,
    ) {
        let name_node = match def.child_by_field_name("name") {
            Some(n) => n,
            None => return,
        };
        let class_name = node_text(name_node, source).to_string();

        let mut decl = Declaration::new(
            class_name.clone(),
            DeclarationKind::Class,
            Span::from_node(outer, source),
            Span::from_node(name_node, source),
        );
        decl.annotation = def
            .child_by_field_name("superclasses")
            .map(|n| node_text(n, source).to_string());
        decl.doc = docstring(def, source)
            .or_else(|| leading_comment(comments, outer.start_position().row + 1));
        out.push(decl);

        let body = match def.child_by_field_name("body") {
            Some(b) => b,
            None => return,
        };
        for member in named_children(body) {
            let (member_outer, member_def) = unwrap_decorated(member);
            if let Some(method) = member_def.filter(|d| d.kind() == "function_definition") {
                if let Some(decl) =
                    self.function_declaration(member_outer, method, source, comments, Some(&class_name))
                {
                    out.push(decl);
                }
            }
        }
    }

    fn extract_calls(&self, root: Node, source: &str) -> Vec<CallSite> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.call_query, root, source.as_bytes());
        let names = self.call_query.capture_names();

        let mut calls = Vec::new();
        while let Some(m) = matches.next() {
            let mut call_node = None;
            let mut callee = None;
            let mut args = None;

            for capture in m.captures {
                match names[capture.index as usize] {
                    "call" => call_node = Some(capture.node),
                    "callee" => callee = Some(capture.node),
                    "args" => args = Some(capture.node),
                    _ => {}
                }
            }

            if let (Some(call), Some(callee), Some(args)) = (call_node, callee, args) {
                let mut first_arg = None;
                let mut keywords = Vec::new();
                for arg in named_children(args) {
                    match arg.kind() {
                        "keyword_argument" => keywords.push(
                            node_text(arg, source)
                                .chars()
                                .filter(|c| !c.is_whitespace())
                                .collect(),
                        ),
                        "comment" => {}
                        _ if first_arg.is_none() => first_arg = Some(argument(arg, source)),
                        _ => {}
                    }
                }

                calls.push(CallSite {
                    callee: node_text(callee, source).to_string(),
                    span: Span::from_node(call, source),
                    first_arg,
                    keywords,
                    is_constructor: false,
                });
            }
        }

        calls.sort_by_key(|c| c.span);
        calls
    }

    fn extract_handlers(&self, root: Node, source: &str) -> Vec<Handler> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.handler_query, root, source.as_bytes());

        let mut handlers = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                handlers.push(handler(capture.node, source));
            }
        }

        handlers.sort_by_key(|h| h.span);
        handlers
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn parse(&self, path: &str, source: &str) -> Result<SourceUnit, CheckError> {
        let tree = parse_tree(&self.language, path, source)?;
        let root = tree.root_node();
        if let Some(block) = empty_block(root) {
            let span = Span::from_node(block, source);
            return Err(CheckError::parse(
                path,
                span.start_line,
                span.start_col,
                "expected an indented block",
            ));
        }

        let mut unit = SourceUnit::empty(path, Language::Python, source);
        unit.comments = collect_comments(root, source);
        unit.declarations = self.extract_declarations(root, source, &unit.comments);
        unit.calls = self.extract_calls(root, source);
        unit.handlers = self.extract_handlers(root, source);

        walk(root, &mut |node| match node.kind() {
            "assignment" => {
                if let Some(a) = literal_assignment(node, "left", "right", source) {
                    unit.assignments.push(a);
                }
            }
            "keyword_argument" => {
                if let Some(a) = literal_assignment(node, "name", "value", source) {
                    unit.assignments.push(a);
                }
            }
            "pair" => {
                if let Some(a) = literal_assignment(node, "key", "value", source) {
                    unit.assignments.push(a);
                }
            }
            "augmented_assignment" => {
                if let Some(h) = string_append_in_loop(node, source) {
                    unit.loop_hazards.push(h);
                }
            }
            _ => {}
        });

        Ok(unit)
    }
}

/// Return (outer node, definition) for plain or decorated definitions.
fn unwrap_decorated(node: Node) -> (Node, Option<Node>) {
    match node.kind() {
        "decorated_definition" => (node, node.child_by_field_name("definition")),
        "function_definition" | "class_definition" => (node, Some(node)),
        _ => (node, None),
    }
}

fn variable_declaration(assignment: Node, source: &str, comments: &[Comment]) -> Option<Declaration> {
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let name = node_text(left, source).to_string();
    let annotation = assignment
        .child_by_field_name("type")
        .map(|n| node_text(n, source).to_string());

    let is_final = annotation
        .as_deref()
        .map(|a| a.starts_with("Final") || a.contains(".Final"))
        .unwrap_or(false);
    let has_lower = name.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = name.chars().any(|c| c.is_ascii_uppercase());
    let kind = if is_final || (has_upper && !has_lower) {
        DeclarationKind::Constant
    } else {
        DeclarationKind::Variable
    };

    let mut decl = Declaration::new(
        name,
        kind,
        Span::from_node(assignment, source),
        Span::from_node(left, source),
    );
    decl.annotation = annotation;
    decl.doc = leading_comment(comments, assignment.start_position().row + 1);
    Some(decl)
}

/// Extract the docstring of a function or class definition.
fn docstring(def: Node, source: &str) -> Option<String> {
    let body = def.child_by_field_name("body")?;
    let first = named_children(body)
        .into_iter()
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = named_children(first).into_iter().next()?;
    if expr.kind() != "string" {
        return None;
    }
    string_value(expr, source)
}

/// The content of a string node, or None when it interpolates.
fn string_value(node: Node, source: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let children = named_children(node);
    if children.iter().any(|c| c.kind() == "interpolation") {
        return None;
    }
    let start = children.iter().find(|c| c.kind() == "string_start")?;
    let end = children.iter().rfind(|c| c.kind() == "string_end")?;
    let raw = source.get(start.end_byte()..end.start_byte())?;

    let prefix = node_text(*start, source);
    if prefix.contains(['r', 'R']) {
        return Some(raw.to_string());
    }
    let value = unescape(raw);
    if prefix.contains(['f', 'F']) {
        return Some(value.replace("{{", "{").replace("}}", "}"));
    }
    Some(value)
}

/// Decode backslash escapes. Unknown escapes are kept as written.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = (0..width)
                    .filter_map(|_| chars.next_if(char::is_ascii_hexdigit))
                    .collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if digits.len() == width => out.push(decoded),
                    _ => {
                        out.push('\\');
                        out.push(kind);
                        out.push_str(&digits);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// The first block with no statements, which Python rejects.
fn empty_block(root: Node) -> Option<Node> {
    let mut found = None;
    walk(root, &mut |node| {
        if found.is_none()
            && node.kind() == "block"
            && named_children(node).iter().all(|c| c.kind() == "comment")
        {
            found = Some(node);
        }
    });
    found
}

fn literal_assignment(node: Node, target_field: &str, value_field: &str, source: &str) -> Option<LiteralAssignment> {
    let target = node.child_by_field_name(target_field)?;
    let value = node.child_by_field_name(value_field)?;
    let literal = string_value(value, source)?;

    let target_name = match target.kind() {
        "identifier" => node_text(target, source).to_string(),
        "attribute" => target
            .child_by_field_name("attribute")
            .map(|a| node_text(a, source).to_string())?,
        "string" => string_value(target, source)?,
        _ => return None,
    };

    Some(LiteralAssignment {
        target: target_name,
        value: literal,
        span: Span::from_node(value, source),
    })
}

fn argument(node: Node, source: &str) -> Argument {
    let text = node_text(node, source).to_string();
    let (is_string, dynamic) = match node.kind() {
        "string" => {
            let plain = string_value(node, source).is_some();
            (plain, !plain)
        }
        "concatenated_string" => (false, true),
        "binary_operator" => (false, contains_kind(node, "string")),
        "call" => {
            let formats = node
                .child_by_field_name("function")
                .filter(|f| f.kind() == "attribute")
                .map(|f| {
                    let attr = f
                        .child_by_field_name("attribute")
                        .map(|a| node_text(a, source))
                        .unwrap_or("");
                    let object_is_string = f
                        .child_by_field_name("object")
                        .map(|o| o.kind() == "string")
                        .unwrap_or(false);
                    attr == "format" && object_is_string
                })
                .unwrap_or(false);
            (false, formats)
        }
        _ => (false, false),
    };
    Argument {
        text,
        is_string,
        dynamic,
    }
}

fn contains_kind(node: Node, kind: &str) -> bool {
    let mut found = false;
    walk(node, &mut |n| {
        if n.kind() == kind {
            found = true;
        }
    });
    found
}

fn handler(node: Node, source: &str) -> Handler {
    let mut caught = Vec::new();
    let mut is_empty = true;

    for child in named_children(node) {
        match child.kind() {
            "block" => {
                is_empty = named_children(child).iter().all(|stmt| match stmt.kind() {
                    "comment" | "pass_statement" => true,
                    "expression_statement" => node_text(*stmt, source).trim() == "...",
                    _ => false,
                });
            }
            "comment" => {}
            _ if caught.is_empty() => {
                let text = node_text(child, source);
                let types = text.split(" as ").next().unwrap_or(text);
                caught = types
                    .trim()
                    .trim_start_matches('(')
                    .trim_end_matches(')')
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
            _ => {}
        }
    }

    Handler {
        caught,
        binds_error: node_text(node, source).contains(" as "),
        span: Span::from_node(node, source),
        is_empty,
    }
}

/// `x += "..."` inside a for/while loop of the same function.
fn string_append_in_loop(node: Node, source: &str) -> Option<LoopHazard> {
    let is_plus = {
        let mut cursor = node.walk();
        let has_plus = node.children(&mut cursor).any(|c| c.kind() == "+=");
        has_plus
    };
    if !is_plus {
        return None;
    }
    let right = node.child_by_field_name("right")?;
    let appends_string = match right.kind() {
        "string" | "concatenated_string" => true,
        "binary_operator" => contains_kind(right, "string"),
        _ => false,
    };
    if !appends_string || !inside_loop(node) {
        return None;
    }
    Some(LoopHazard {
        kind: LoopHazardKind::StringConcatInLoop,
        span: Span::from_node(node, source),
        text: node_text(node, source).to_string(),
    })
}

fn inside_loop(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(n) = current {
        match n.kind() {
            "for_statement" | "while_statement" => return true,
            "function_definition" | "class_definition" | "lambda" => return false,
            _ => {}
        }
        current = n.parent();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_python(source: &str) -> SourceUnit {
        PythonAdapter::new()
            .unwrap()
            .parse("test.py", source)
            .unwrap()
    }

    #[test]
    fn test_extract_declarations() {
        let source = r#"
MAX_RETRIES = 3
default_timeout: float = 2.5

def calculate_total(items):
    """Sum the prices of all items."""
    return sum(i.price for i in items)

# Stores orders in memory.
class OrderStore:
    def __init__(self):
        self.orders = []

    @property
    def count(self):
        return len(self.orders)
"#;
        let unit = parse_python(source);
        let names: Vec<_> = unit
            .declarations
            .iter()
            .map(|d| (d.name.as_str(), d.kind))
            .collect();

        assert!(names.contains(&("MAX_RETRIES", DeclarationKind::Constant)));
        assert!(names.contains(&("default_timeout", DeclarationKind::Variable)));
        assert!(names.contains(&("calculate_total", DeclarationKind::Function)));
        assert!(names.contains(&("OrderStore", DeclarationKind::Class)));
        assert!(names.contains(&("__init__", DeclarationKind::Method)));
        assert!(names.contains(&("count", DeclarationKind::Method)));

        let total = unit.declarations.iter().find(|d| d.name == "calculate_total").unwrap();
        assert_eq!(total.doc.as_deref(), Some("Sum the prices of all items."));
        assert_eq!(total.name_span.start_line, 5);
        assert_eq!(total.name_span.start_col, 5);

        let store = unit.declarations.iter().find(|d| d.name == "OrderStore").unwrap();
        assert_eq!(store.doc.as_deref(), Some("Stores orders in memory."));

        let timeout = unit.declarations.iter().find(|d| d.name == "default_timeout").unwrap();
        assert_eq!(timeout.annotation.as_deref(), Some("float"));

        let count = unit.declarations.iter().find(|d| d.name == "count").unwrap();
        assert_eq!(count.parent.as_deref(), Some("OrderStore"));
    }

    #[test]
    fn test_final_annotation_is_constant() {
        let unit = parse_python("from typing import Final\nmax_size: Final = 10\n");
        let decl = unit.declarations.iter().find(|d| d.name == "max_size").unwrap();
        assert_eq!(decl.kind, DeclarationKind::Constant);
    }

    #[test]
    fn test_reassignment_declared_once() {
        let unit = parse_python("counter = 0\ncounter = 1\n");
        assert_eq!(unit.declarations.len(), 1);
    }

    #[test]
    fn test_literal_assignments() {
        let source = r#"
API_KEY = "sk_live_abcdef123456"
greeting = f"hello {name}"
connect(password="hunter2")
settings = {"token": "abc"}
"#;
        let unit = parse_python(source);
        let targets: Vec<_> = unit.assignments.iter().map(|a| a.target.as_str()).collect();
        assert_eq!(targets, vec!["API_KEY", "password", "token"]);
        assert_eq!(unit.assignments[0].value, "sk_live_abcdef123456");
        assert_eq!(unit.assignments[0].span.start_line, 2);
        assert_eq!(unit.assignments[0].span.start_col, 11);
    }

    #[test]
    fn test_calls_and_arguments() {
        let source = r#"
cursor.execute("SELECT * FROM users WHERE id = " + user_id)
cursor.execute(f"DELETE FROM t WHERE id = {x}")
cursor.execute("SELECT 1")
subprocess.run(cmd, shell=True)
"#;
        let unit = parse_python(source);
        assert_eq!(unit.calls.len(), 4);
        assert_eq!(unit.calls[0].method_name(), "execute");
        assert!(unit.calls[0].first_arg.as_ref().unwrap().dynamic);
        assert!(unit.calls[1].first_arg.as_ref().unwrap().dynamic);
        assert!(unit.calls[2].first_arg.as_ref().unwrap().is_string);
        assert!(!unit.calls[2].first_arg.as_ref().unwrap().dynamic);
        assert_eq!(unit.calls[3].keywords, vec!["shell=True".to_string()]);
    }

    #[test]
    fn test_handlers() {
        let source = r#"
try:
    risky()
except:
    pass

try:
    risky()
except (ValueError, Exception) as err:
    log(err)

try:
    risky()
except KeyError:
    ...
"#;
        let unit = parse_python(source);
        assert_eq!(unit.handlers.len(), 3);
        assert!(unit.handlers[0].caught.is_empty());
        assert!(unit.handlers[0].is_empty);
        assert_eq!(unit.handlers[1].caught, vec!["ValueError", "Exception"]);
        assert!(!unit.handlers[1].is_empty);
        assert!(unit.handlers[1].binds_error);
        assert_eq!(unit.handlers[2].caught, vec!["KeyError"]);
        assert!(unit.handlers[2].is_empty);
    }

    #[test]
    fn test_string_append_in_loop() {
        let source = r#"
def render(rows):
    out = ""
    out += "header"
    for row in rows:
        out += f"{row}\n"
    return out
"#;
        let unit = parse_python(source);
        assert_eq!(unit.loop_hazards.len(), 1);
        assert_eq!(unit.loop_hazards[0].span.start_line, 6);
    }

    #[test]
    fn test_string_escapes_are_decoded() {
        let source = r#"
token = "a\nb\x41\u00e9"
raw_token = r"a\nb"
fmt_token = f"{{literal}}"
"#;
        let unit = parse_python(source);
        let values: Vec<_> = unit.assignments.iter().map(|a| a.value.as_str()).collect();
        assert_eq!(values, vec!["a\nbAé", "a\\nb", "{literal}"]);
    }

    #[test]
    fn test_unescape_keeps_unknown_escapes() {
        assert_eq!(unescape(r"\d+\.\x4"), r"\d+\.\x4");
        assert_eq!(unescape(r#"say \"hi\""#), "say \"hi\"");
    }

    #[test]
    fn test_missing_block_body_is_parse_error() {
        let adapter = PythonAdapter::new().unwrap();
        for source in ["def f():\n", "class A:\n    # nothing yet\n"] {
            match adapter.parse("b.py", source) {
                Err(CheckError::Parse { message, .. }) => {
                    assert!(message.contains("indented block"), "{}", message)
                }
                other => panic!("expected parse error, got {:?}", other.map(|_| ())),
            }
        }
        assert!(adapter.parse("ok.py", "def f(): pass\n").is_ok());
    }

    #[test]
    fn test_syntax_error_location() {
        let err = PythonAdapter::new()
            .unwrap()
            .parse("broken.py", "def ok():\n    return 1\n\ndef broken(:\n    pass\n")
            .unwrap_err();
        match err {
            CheckError::Parse { path, line, .. } => {
                assert_eq!(path, "broken.py");
                assert_eq!(line, 4);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
