//! Shared tree-sitter plumbing for the grammar-backed adapters.

use tree_sitter::{Language as TsLanguage, Node, Parser, Tree};

use crate::error::CheckError;

use super::{Comment, Span};

/// Parse source with a grammar, rejecting trees that contain syntax errors.
pub fn parse_tree(language: &TsLanguage, path: &str, source: &str) -> Result<Tree, CheckError> {
    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| CheckError::parse(path, 1, 1, format!("grammar unavailable: {}", e)))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| CheckError::parse(path, 1, 1, "parser produced no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        let (span, message) = match first_error(root) {
            Some(node) if node.is_missing() => (
                Span::from_node(node, source),
                format!("missing {}", node.kind()),
            ),
            Some(node) => (
                Span::from_node(node, source),
                format!("unexpected {}", describe(node, source)),
            ),
            None => (Span::on_line(1, 1, 0), "syntax error".to_string()),
        };
        return Err(CheckError::parse(path, span.start_line, span.start_col, message));
    }

    Ok(tree)
}

/// Find the first ERROR or MISSING node in document order.
pub fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn describe(node: Node, source: &str) -> String {
    let text = node_text(node, source);
    let first_line = text.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        "end of input".to_string()
    } else {
        let snippet: String = first_line.chars().take(24).collect();
        format!("{:?}", snippet)
    }
}

/// Get text for a tree-sitter node.
pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Named children of a node, collected so callers can iterate freely.
pub fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Visit every descendant of `node` (including itself) in document order.
pub fn walk<'a>(node: Node<'a>, visit: &mut dyn FnMut(Node<'a>)) {
    visit(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, visit);
    }
}

/// Collect every comment node as a `Comment`, markers stripped.
pub fn collect_comments(root: Node, source: &str) -> Vec<Comment> {
    let mut comments = Vec::new();
    walk(root, &mut |node| {
        if node.kind() == "comment" {
            comments.push(Comment {
                text: strip_comment_markers(node_text(node, source)),
                span: Span::from_node(node, source),
            });
        }
    });
    comments
}

/// Strip `#`, `//`, `/* */` and leading `*` decorations from comment text.
pub fn strip_comment_markers(raw: &str) -> String {
    let trimmed = raw.trim();
    let body = if let Some(inner) = trimmed.strip_prefix("/*") {
        inner.strip_suffix("*/").unwrap_or(inner)
    } else {
        trimmed
    };

    body.lines()
        .map(|line| {
            let line = line.trim();
            let line = line.strip_prefix("//").unwrap_or(line);
            let line = line.strip_prefix('#').unwrap_or(line);
            let line = line.trim_start_matches('*');
            line.trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join the comments that end on the lines directly above `line`.
///
/// Walks upwards while each comment ends on the line before the previous
/// one, so a blank line breaks the association.
pub fn leading_comment(comments: &[Comment], line: usize) -> Option<String> {
    let mut expected = line.checked_sub(1)?;
    let mut parts: Vec<&str> = Vec::new();

    for comment in comments.iter().rev() {
        if comment.span.end_line > expected {
            continue;
        }
        if comment.span.end_line < expected {
            break;
        }
        parts.push(&comment.text);
        expected = match comment.span.start_line.checked_sub(1) {
            Some(l) => l,
            None => break,
        };
    }

    if parts.is_empty() {
        return None;
    }
    parts.reverse();
    let joined = parts.join("\n");
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(text: &str, start: usize, end: usize) -> Comment {
        Comment {
            text: text.to_string(),
            span: Span::new(start, 1, end, 10),
        }
    }

    #[test]
    fn test_strip_comment_markers() {
        assert_eq!(strip_comment_markers("# hello"), "hello");
        assert_eq!(strip_comment_markers("// hello"), "hello");
        assert_eq!(
            strip_comment_markers("/**\n * Adds two numbers.\n * @param a\n */"),
            "Adds two numbers.\n@param a"
        );
    }

    #[test]
    fn test_leading_comment_contiguous() {
        let comments = vec![
            comment("unrelated", 1, 1),
            comment("first", 3, 3),
            comment("second", 4, 4),
        ];
        assert_eq!(leading_comment(&comments, 5).as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn test_leading_comment_blank_line_breaks() {
        let comments = vec![comment("far away", 1, 1)];
        assert_eq!(leading_comment(&comments, 3), None);
    }

    #[test]
    fn test_leading_comment_block() {
        let comments = vec![comment("Adds numbers.", 2, 4)];
        assert_eq!(leading_comment(&comments, 5).as_deref(), Some("Adds numbers."));
        assert_eq!(leading_comment(&comments, 1), None);
    }
}
