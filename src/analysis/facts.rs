//! Normalized facts extracted from one source file.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::language::Language;

/// Source location span with 1-indexed line/column positions.
///
/// Columns count characters, not bytes. The end position is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    pub fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A span covering `len` characters of a single line.
    pub fn on_line(line: usize, start_col: usize, len: usize) -> Self {
        Self::new(line, start_col, line, start_col + len)
    }

    /// Create a span from a tree-sitter node, converting byte columns to characters.
    pub fn from_node(node: tree_sitter::Node, source: &str) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_line: start.row + 1,
            start_col: char_column(source, node.start_byte(), start.column),
            end_line: end.row + 1,
            end_col: char_column(source, node.end_byte(), end.column),
        }
    }

    /// Number of physical lines covered.
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Convert a tree-sitter byte column into a 1-indexed character column.
fn char_column(source: &str, byte: usize, byte_col: usize) -> usize {
    let row_start = byte.saturating_sub(byte_col);
    source
        .get(row_start..byte)
        .map(|s| s.chars().count())
        .unwrap_or(byte_col)
        + 1
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Kind of top-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Function,
    Method,
    Class,
    Variable,
    Constant,
    // Terraform blocks
    Resource,
    DataSource,
    Input,
    Output,
    Module,
    Provider,
    Local,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Function => "function",
            DeclarationKind::Method => "method",
            DeclarationKind::Class => "class",
            DeclarationKind::Variable => "variable",
            DeclarationKind::Constant => "constant",
            DeclarationKind::Resource => "resource",
            DeclarationKind::DataSource => "data source",
            DeclarationKind::Input => "input variable",
            DeclarationKind::Output => "output",
            DeclarationKind::Module => "module",
            DeclarationKind::Provider => "provider",
            DeclarationKind::Local => "local value",
        }
    }

    /// Check if this is a callable (function or method).
    pub fn is_callable(&self) -> bool {
        matches!(self, DeclarationKind::Function | DeclarationKind::Method)
    }

    /// Check if this is a Terraform block kind.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            DeclarationKind::Resource
                | DeclarationKind::DataSource
                | DeclarationKind::Input
                | DeclarationKind::Output
                | DeclarationKind::Module
                | DeclarationKind::Provider
                | DeclarationKind::Local
        )
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A declaration extracted from source code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    /// Span of the whole declaration.
    pub span: Span,
    /// Span of the declared name.
    pub name_span: Span,
    /// Declared type, return annotation, or Terraform resource type.
    pub annotation: Option<String>,
    /// Leading comment, docstring, or Terraform `description`.
    pub doc: Option<String>,
    /// Whether the declaration is exported from its module (JavaScript).
    pub exported: bool,
    /// Enclosing class for methods.
    pub parent: Option<String>,
}

impl Declaration {
    pub fn new(name: impl Into<String>, kind: DeclarationKind, span: Span, name_span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            span,
            name_span,
            annotation: None,
            doc: None,
            exported: false,
            parent: None,
        }
    }

    /// Get the qualified name (parent.name for methods).
    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}.{}", parent, self.name),
            None => self.name.clone(),
        }
    }

    /// Public means exported, or not underscore/hash prefixed.
    pub fn is_public(&self) -> bool {
        self.exported || !(self.name.starts_with('_') || self.name.starts_with('#'))
    }
}

/// A source comment, with its markers stripped from `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub span: Span,
}

/// A string literal bound to a name (`name = "literal"`), at any depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralAssignment {
    pub target: String,
    /// The literal's content without quotes.
    pub value: String,
    /// Span of the literal.
    pub span: Span,
}

/// Shape of the first positional argument of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub text: String,
    /// Plain string literal with no interpolation.
    pub is_string: bool,
    /// Built at runtime: concatenation, interpolation, `%` or `.format`.
    pub dynamic: bool,
}

/// A call or constructor invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSite {
    /// Dotted callee text, e.g. `os.system` or `cursor.execute`.
    pub callee: String,
    pub span: Span,
    pub first_arg: Option<Argument>,
    /// Keyword arguments as written, whitespace removed (e.g. `shell=True`).
    pub keywords: Vec<String>,
    /// `new Callee(...)`.
    pub is_constructor: bool,
}

impl CallSite {
    /// Last segment of the callee (`execute` for `cursor.execute`).
    pub fn method_name(&self) -> &str {
        self.callee.rsplit('.').next().unwrap_or(&self.callee)
    }
}

/// An exception handler (`except` / `catch`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handler {
    /// Caught type names; empty means everything is caught.
    pub caught: Vec<String>,
    /// Whether a catch binding exists (JavaScript `catch (e)`).
    pub binds_error: bool,
    pub span: Span,
    /// Body holds no statements beyond `pass`/`...`.
    pub is_empty: bool,
}

/// Constructs inside loop bodies that are costly per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopHazardKind {
    AwaitInLoop,
    StringConcatInLoop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopHazard {
    pub kind: LoopHazardKind,
    pub span: Span,
    /// Source text of the offending expression.
    pub text: String,
}

/// One file's normalized representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub path: String,
    pub language: Language,
    /// Raw text, used by per-line checks.
    pub text: String,
    pub declarations: Vec<Declaration>,
    pub comments: Vec<Comment>,
    pub assignments: Vec<LiteralAssignment>,
    pub calls: Vec<CallSite>,
    pub handlers: Vec<Handler>,
    pub loop_hazards: Vec<LoopHazard>,
}

impl SourceUnit {
    /// Create an empty unit for a file.
    pub fn empty(path: &str, language: Language, text: &str) -> Self {
        Self {
            path: path.to_string(),
            language,
            text: text.to_string(),
            declarations: Vec::new(),
            comments: Vec::new(),
            assignments: Vec::new(),
            calls: Vec::new(),
            handlers: Vec::new(),
            loop_hazards: Vec::new(),
        }
    }

    /// Physical lines, without terminators (a trailing `\r` is stripped).
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .take(self.line_count())
    }

    /// Number of physical lines. A final newline does not start a new line.
    pub fn line_count(&self) -> usize {
        if self.text.is_empty() {
            return 0;
        }
        let newlines = self.text.matches('\n').count();
        if self.text.ends_with('\n') {
            newlines
        } else {
            newlines + 1
        }
    }

    /// Character length of a 1-indexed line, if it exists.
    pub fn line_len(&self, line: usize) -> Option<usize> {
        if line == 0 {
            return None;
        }
        self.lines().nth(line - 1).map(|l| l.chars().count())
    }

    /// Clamp a span so that it lies within the file.
    pub fn clamp(&self, span: Span) -> Span {
        let last = self.line_count().max(1);
        let start_line = span.start_line.clamp(1, last);
        let end_line = span.end_line.clamp(start_line, last);
        let start_max = self.line_len(start_line).unwrap_or(0) + 1;
        let end_max = self.line_len(end_line).unwrap_or(0) + 1;
        let start_col = span.start_col.clamp(1, start_max);
        let mut end_col = span.end_col.clamp(1, end_max);
        if end_line == start_line && end_col < start_col {
            end_col = start_col;
        }
        Span::new(start_line, start_col, end_line, end_col)
    }

    /// Whether a span lies within the file bounds.
    pub fn contains(&self, span: &Span) -> bool {
        self.clamp(*span) == *span
    }

    /// Declarations of a given kind.
    pub fn declarations_by_kind(&self, kind: DeclarationKind) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(move |d| d.kind == kind)
    }

    /// Get all functions and methods.
    pub fn callables(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(|d| d.kind.is_callable())
    }

    /// Whether this is a JSX file, where PascalCase component functions are allowed.
    pub fn is_jsx(&self) -> bool {
        self.path.ends_with(".jsx")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(text: &str) -> SourceUnit {
        SourceUnit::empty("a.py", Language::Python, text)
    }

    #[test]
    fn test_line_count() {
        assert_eq!(unit("").line_count(), 0);
        assert_eq!(unit("a").line_count(), 1);
        assert_eq!(unit("a\n").line_count(), 1);
        assert_eq!(unit("a\nb").line_count(), 2);
        assert_eq!(unit("a\n\n").line_count(), 2);
    }

    #[test]
    fn test_lines_strip_carriage_return() {
        let u = unit("one\r\ntwo\r\n");
        let lines: Vec<_> = u.lines().collect();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_clamp_keeps_span_in_bounds() {
        let u = unit("abc\nde\n");
        let clamped = u.clamp(Span::new(5, 9, 7, 20));
        assert_eq!(clamped, Span::new(2, 3, 2, 3));
        assert!(u.contains(&Span::on_line(1, 1, 3)));
        assert!(!u.contains(&Span::on_line(3, 1, 1)));
    }

    #[test]
    fn test_declaration_visibility() {
        let span = Span::on_line(1, 1, 3);
        let mut decl = Declaration::new("_helper", DeclarationKind::Function, span, span);
        assert!(!decl.is_public());
        decl.exported = true;
        assert!(decl.is_public());

        let mut method = Declaration::new("save", DeclarationKind::Method, span, span);
        method.parent = Some("Repo".to_string());
        assert_eq!(method.qualified_name(), "Repo.save");
    }
}
