//! Tree-sitter based parsing utilities shared across syntax-tree extractors.

use tree_sitter::{Language, Node, Parser as TSParser, Tree};

use crate::error::ExtractError;

/// Base tree-sitter parser with shared functionality.
pub struct TreeSitterParser {
    language: Language,
    language_name: &'static str,
}

impl TreeSitterParser {
    pub fn new(language: Language, language_name: &'static str) -> Self {
        Self {
            language,
            language_name,
        }
    }

    /// Parse source code into a tree-sitter tree.
    ///
    /// A tree containing error or missing nodes is rejected with the first
    /// offending line, so callers only ever walk well-formed trees.
    pub fn parse_tree(&self, content: &str) -> Result<Tree, ExtractError> {
        let mut parser = TSParser::new();
        parser.set_language(&self.language).map_err(|e| {
            ExtractError::Grammar(format!("failed to load {} grammar: {}", self.language_name, e))
        })?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ExtractError::Grammar("parser produced no tree".to_string()))?;

        if let Some(bad) = first_error(tree.root_node()) {
            return Err(ExtractError::Syntax {
                line: node_line(&bad),
                message: describe_error(&bad, content),
            });
        }

        Ok(tree)
    }
}

/// Get text for a node from source content.
pub fn node_text<'a>(node: &Node, content: &'a str) -> &'a str {
    &content[node.byte_range()]
}

/// Node text with runs of whitespace collapsed to single spaces.
pub fn compact_text(node: &Node, content: &str) -> String {
    collapse_whitespace(node_text(node, content))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the named field, or an empty string.
pub fn field_text(node: &Node, field: &str, content: &str) -> String {
    node.child_by_field_name(field)
        .map(|n| node_text(&n, content).to_string())
        .unwrap_or_default()
}

/// Get line number (1-based) for a node.
pub fn node_line(node: &Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// Get end line number (1-based) for a node.
///
/// A node ending at column 0 ends on the previous line.
pub fn node_end_line(node: &Node) -> u32 {
    let start = node.start_position();
    let end = node.end_position();
    if end.column == 0 && end.row > start.row {
        end.row as u32
    } else {
        end.row as u32 + 1
    }
}

/// Whether `node` has a direct (possibly anonymous) child of `kind`.
pub fn has_token(node: &Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == kind);
    found
}

/// Depth-first search for the first error or missing node.
pub fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}

fn describe_error(node: &Node, content: &str) -> String {
    if node.is_missing() {
        return format!("missing `{}`", node.kind());
    }
    let text = node_text(node, content);
    let snippet: String = text.lines().next().unwrap_or("").chars().take(40).collect();
    if snippet.trim().is_empty() {
        "unexpected input".to_string()
    } else {
        format!("unexpected `{}`", snippet.trim())
    }
}

/// Split on `separator` at nesting depth zero (ignoring `<>`, `()`, `[]`, `{}`).
pub fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    let mut prev = ' ';

    for ch in text.chars() {
        match ch {
            '<' | '(' | '[' | '{' => depth += 1,
            // `=>` in function types is not a closing bracket
            '>' if prev == '=' => {}
            '>' | ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        prev = ch;
        if ch == separator && depth == 0 {
            parts.push(collapse_whitespace(&current));
            current.clear();
        } else {
            current.push(ch);
        }
    }
    parts.push(collapse_whitespace(&current));
    parts.retain(|p| !p.is_empty());
    parts
}
