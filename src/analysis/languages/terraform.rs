//! Terraform (HCL) language adapter.
//!
//! Parsing is done by `hcl-edit`. Its spans are byte ranges, so they are
//! mapped to line/column positions here. Comments live in the whitespace
//! between structures and are read from those gaps.

use std::ops::Range;

use hcl_edit::expr::{Expression, ObjectKey};
use hcl_edit::structure::{Attribute, Block, BlockLabel, Body, Structure};
use hcl_edit::template::Element;
use hcl_edit::Span as _;

use crate::analysis::treesitter::{leading_comment, strip_comment_markers};
use crate::analysis::{
    Comment, Declaration, DeclarationKind, LanguageAdapter, LiteralAssignment, SourceUnit, Span,
};
use crate::error::CheckError;
use crate::language::Language;

pub struct TerraformAdapter;

impl TerraformAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerraformAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAdapter for TerraformAdapter {
    fn language(&self) -> Language {
        Language::Terraform
    }

    fn parse(&self, path: &str, source: &str) -> Result<SourceUnit, CheckError> {
        let body = hcl_edit::parser::parse_body(source).map_err(|e| {
            let location = e.location();
            CheckError::parse(path, location.line(), location.column(), e.message())
        })?;

        let index = LineIndex::new(source);
        let mut comments = Vec::new();
        collect_comments(&body, 0..source.len(), source, &index, &mut comments);
        comments.sort_by_key(|c| (c.span.start_line, c.span.start_col));

        let mut unit = SourceUnit::empty(path, Language::Terraform, source);
        unit.declarations = declarations(&body, source, &index, &comments);
        collect_assignments(&body, None, source, &index, &mut unit.assignments);
        unit.comments = comments;
        Ok(unit)
    }
}

/// Maps byte offsets to 1-indexed line and character columns.
struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            source,
            line_starts,
        }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts[line - 1];
        let col = self
            .source
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        (line, col + 1)
    }

    /// Span of a byte range, ignoring trailing whitespace.
    fn span(&self, range: &Range<usize>) -> Span {
        let text = self.source.get(range.clone()).unwrap_or("");
        let end = range.start + text.trim_end().len();
        let (start_line, start_col) = self.position(range.start);
        let (end_line, end_col) = self.position(end);
        Span::new(start_line, start_col, end_line, end_col)
    }

    fn span_of(&self, item: &impl hcl_edit::Span) -> Span {
        match item.span() {
            Some(range) => self.span(&range),
            None => Span::on_line(1, 1, 0),
        }
    }
}

fn text_of<'s>(source: &'s str, item: &impl hcl_edit::Span) -> &'s str {
    item.span()
        .and_then(|range| source.get(range))
        .map(str::trim)
        .unwrap_or("")
}

fn structure_range(structure: &Structure) -> Option<Range<usize>> {
    match structure {
        Structure::Attribute(attr) => attr.span(),
        Structure::Block(block) => block.span(),
    }
}

/// Read comments out of the gaps between the structures of `body`,
/// descending into block bodies.
fn collect_comments(
    body: &Body,
    region: Range<usize>,
    source: &str,
    index: &LineIndex,
    out: &mut Vec<Comment>,
) {
    let mut cursor = region.start;
    for structure in body.iter() {
        let Some(range) = structure_range(structure) else {
            continue;
        };
        scan_gap(source, cursor..range.start, index, out);
        cursor = range.end;

        if let Structure::Block(block) = structure {
            if let Some(inner) = block_interior(block, &range, source) {
                collect_comments(&block.body, inner, source, index, out);
            }
        }
    }
    scan_gap(source, cursor..region.end, index, out);
}

/// The byte range between a block's braces.
fn block_interior(block: &Block, range: &Range<usize>, source: &str) -> Option<Range<usize>> {
    let header_end = block
        .labels
        .last()
        .and_then(label_range)
        .or_else(|| block.ident.span())
        .map(|r| r.end)
        .unwrap_or(range.start);
    let open = source.get(header_end..range.end)?.find('{')? + header_end + 1;
    let close = source.get(..range.end)?.rfind('}')?;
    (open <= close).then_some(open..close)
}

fn label_range(label: &BlockLabel) -> Option<Range<usize>> {
    match label {
        BlockLabel::String(s) => s.span(),
        BlockLabel::Ident(ident) => ident.span(),
    }
}

/// Collect comments from text that holds only whitespace and comments.
fn scan_gap(source: &str, gap: Range<usize>, index: &LineIndex, out: &mut Vec<Comment>) {
    let Some(text) = source.get(gap.clone()) else {
        return;
    };
    let mut pos = 0;
    while pos < text.len() {
        let rest = &text[pos..];
        let len = if rest.starts_with('#') || rest.starts_with("//") {
            rest.find('\n').unwrap_or(rest.len())
        } else if rest.starts_with("/*") {
            rest.find("*/").map(|i| i + 2).unwrap_or(rest.len())
        } else {
            pos += rest.chars().next().map(char::len_utf8).unwrap_or(1);
            continue;
        };

        let start = gap.start + pos;
        let raw = &rest[..len];
        out.push(Comment {
            text: strip_comment_markers(raw),
            span: index.span(&(start..start + len)),
        });
        pos += len;
    }
}

fn label_text(label: &BlockLabel) -> String {
    match label {
        BlockLabel::String(s) => s.value().to_string(),
        BlockLabel::Ident(ident) => ident.as_str().to_string(),
    }
}

/// Span of a label's text, inside the quotes when quoted.
fn label_span(label: &BlockLabel, source: &str, index: &LineIndex) -> Span {
    let Some(range) = label_range(label) else {
        return Span::on_line(1, 1, 0);
    };
    let quoted = source
        .get(range.clone())
        .map(|t| t.len() >= 2 && t.starts_with('"') && t.ends_with('"'))
        .unwrap_or(false);
    if quoted {
        index.span(&(range.start + 1..range.end - 1))
    } else {
        index.span(&range)
    }
}

/// Literal content of a string, or of a template with no interpolation.
fn literal_value(expr: &Expression) -> Option<String> {
    match expr {
        Expression::String(s) => Some(s.value().to_string()),
        Expression::StringTemplate(template) => template_literal(template.iter()),
        Expression::HeredocTemplate(heredoc) => template_literal(heredoc.template.iter()),
        _ => None,
    }
}

fn template_literal<'t>(elements: impl Iterator<Item = &'t Element>) -> Option<String> {
    let mut value = String::new();
    for element in elements {
        match element {
            Element::Literal(lit) => value.push_str(lit.value()),
            Element::Interpolation(_) | Element::Directive(_) => return None,
        }
    }
    Some(value)
}

fn string_attribute(block: &Block, name: &str) -> Option<String> {
    block
        .body
        .get_attribute(name)
        .and_then(|attr| literal_value(&attr.value))
}

fn declarations(
    body: &Body,
    source: &str,
    index: &LineIndex,
    comments: &[Comment],
) -> Vec<Declaration> {
    let mut out = Vec::new();

    for block in body.blocks() {
        let span = index.span_of(block);
        let doc = leading_comment(comments, span.start_line);

        let (kind, label) = match (block.ident.as_str(), block.labels.as_slice()) {
            ("resource", [_, name, ..]) => (DeclarationKind::Resource, name),
            ("data", [_, name, ..]) => (DeclarationKind::DataSource, name),
            ("variable", [name, ..]) => (DeclarationKind::Input, name),
            ("output", [name, ..]) => (DeclarationKind::Output, name),
            ("module", [name, ..]) => (DeclarationKind::Module, name),
            ("provider", [name, ..]) => (DeclarationKind::Provider, name),
            ("locals", []) => {
                for attr in block.body.attributes() {
                    out.push(local_declaration(attr, index, comments));
                }
                continue;
            }
            _ => continue,
        };

        let mut decl = Declaration::new(
            label_text(label),
            kind,
            span,
            label_span(label, source, index),
        );
        match kind {
            DeclarationKind::Resource | DeclarationKind::DataSource => {
                decl.annotation = block.labels.first().map(label_text);
                decl.doc = doc;
            }
            DeclarationKind::Input => {
                decl.annotation = block
                    .body
                    .get_attribute("type")
                    .map(|attr| text_of(source, &attr.value).to_string());
                decl.doc = string_attribute(block, "description");
            }
            DeclarationKind::Output => decl.doc = string_attribute(block, "description"),
            _ => decl.doc = doc,
        }
        out.push(decl);
    }

    out
}

fn local_declaration(attr: &Attribute, index: &LineIndex, comments: &[Comment]) -> Declaration {
    let span = index.span_of(attr);
    let mut decl = Declaration::new(
        attr.key.as_str().to_string(),
        DeclarationKind::Local,
        span,
        index.span_of(&attr.key),
    );
    decl.doc = leading_comment(comments, span.start_line);
    decl
}

/// Collect literal attributes at any depth. Attributes directly inside a
/// `variable` block are qualified with the variable name.
fn collect_assignments(
    body: &Body,
    variable: Option<&str>,
    source: &str,
    index: &LineIndex,
    out: &mut Vec<LiteralAssignment>,
) {
    for structure in body.iter() {
        match structure {
            Structure::Attribute(attr) => {
                if let Some(value) = literal_value(&attr.value) {
                    let target = match variable {
                        Some(var) => format!("{}.{}", var, attr.key.as_str()),
                        None => attr.key.as_str().to_string(),
                    };
                    out.push(LiteralAssignment {
                        target,
                        value,
                        span: index.span_of(&attr.value),
                    });
                }
                object_entries(&attr.value, index, out);
            }
            Structure::Block(block) => {
                let label = match (block.ident.as_str(), block.labels.first()) {
                    ("variable", Some(label)) => Some(label_text(label)),
                    _ => None,
                };
                collect_assignments(&block.body, label.as_deref(), source, index, out);
            }
        }
    }
}

/// Find `key = "literal"` entries of object constructors inside an expression.
fn object_entries(expr: &Expression, index: &LineIndex, out: &mut Vec<LiteralAssignment>) {
    match expr {
        Expression::Object(object) => {
            for (key, value) in object.iter() {
                let target = match key {
                    ObjectKey::Ident(ident) => Some(ident.as_str().to_string()),
                    ObjectKey::Expression(Expression::String(s)) => Some(s.value().to_string()),
                    ObjectKey::Expression(_) => None,
                };
                let value = value.expr();
                if let (Some(target), Some(literal)) = (target, literal_value(value)) {
                    out.push(LiteralAssignment {
                        target,
                        value: literal,
                        span: index.span_of(value),
                    });
                }
                object_entries(value, index, out);
            }
        }
        Expression::Array(elements) => {
            for element in elements.iter() {
                object_entries(element, index, out);
            }
        }
        Expression::FuncCall(call) => {
            for arg in call.args.iter() {
                object_entries(arg, index, out);
            }
        }
        Expression::Parenthesis(inner) => object_entries(inner.inner(), index, out),
        Expression::Conditional(cond) => {
            object_entries(&cond.true_expr, index, out);
            object_entries(&cond.false_expr, index, out);
        }
        _ => {}
    }
}
