//! Source normalization: comment and docstring removal.
//!
//! Comments are located with the grammar itself, so nothing that merely looks
//! like a comment inside a string literal is touched. Multi-line string
//! literals also keep their inner whitespace and blank lines.

use crate::languages::Language;
use crate::source::ParseError;
use crate::treesitter::{for_each_node, parse_source};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Whether `node` is a Python-style docstring: a statement holding nothing but
/// a string literal.
fn is_docstring(node: tree_sitter::Node<'_>) -> bool {
    if node.kind() != "expression_statement" {
        return false;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.len() == 1 && children[0].kind() == "string"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanKind {
    /// Comment or docstring, replaced by a single space.
    Strip,
    /// Multi-line string literal, copied verbatim and exempt from line cleanup.
    Verbatim,
}

/// A single literal; concatenations may hold comments between their parts.
fn is_string_literal(kind: &str) -> bool {
    (kind.contains("string") && !kind.starts_with("concatenated")) || kind.starts_with("heredoc")
}

/// Byte spans of comments (and docstrings where the language has them) plus
/// multi-line string literals, sorted and non-overlapping.
fn normalize_spans(tree: &tree_sitter::Tree, language: Language, code: &str) -> Vec<(usize, usize, SpanKind)> {
    let mut spans = Vec::new();
    for_each_node(tree, |node| {
        let (start, end) = (node.start_byte(), node.end_byte());
        let kind = if node.kind().ends_with("comment") || (language.has_docstrings() && is_docstring(node)) {
            SpanKind::Strip
        } else if is_string_literal(node.kind()) && code.get(start..end).is_some_and(|text| text.contains('\n')) {
            SpanKind::Verbatim
        } else {
            return true;
        };
        spans.push((start, end, kind));
        false
    });
    spans.sort_unstable_by_key(|&(start, end, _)| (start, end));
    spans
}

/// Remove comments and docstrings from `code`.
///
/// Each removed span becomes a single space so neighbouring tokens never fuse.
/// Trailing whitespace is trimmed and lines left blank are dropped, except for
/// lines that end inside a multi-line string literal.
pub fn strip_comments(parser: &mut tree_sitter::Parser, language: Language, code: &str) -> Result<String, ParseError> {
    let tree = parse_source(parser, language, code)?;
    let spans = normalize_spans(&tree, language, code);

    let mut out = String::with_capacity(code.len());
    // output offsets of verbatim literals
    let mut literals = Vec::new();
    let mut cursor = 0;
    let mut removed = 0usize;
    for &(start, end, kind) in &spans {
        if start < cursor {
            continue;
        }
        out.push_str(&code[cursor..start]);
        match kind {
            SpanKind::Strip => {
                out.push(' ');
                removed += 1;
            }
            SpanKind::Verbatim => {
                literals.push((out.len(), out.len() + (end - start)));
                out.push_str(&code[start..end]);
            }
        }
        cursor = end;
    }
    out.push_str(&code[cursor..]);

    static TRAILING_WS: OnceLock<Regex> = OnceLock::new();
    let trailing_ws = TRAILING_WS.get_or_init(|| Regex::new(r"[ \t\r]+$").unwrap());

    let mut lines: Vec<Cow<'_, str>> = Vec::new();
    let mut offset = 0;
    for line in out.split('\n') {
        let line_end = offset + line.len();
        offset = line_end + 1;
        if literals.iter().any(|&(s, e)| s < line_end && line_end < e) {
            lines.push(Cow::Borrowed(line));
            continue;
        }
        let trimmed = trailing_ws.replace(line, "");
        if !trimmed.is_empty() {
            lines.push(trimmed);
        }
    }
    let normalized = lines.join("\n");

    tracing::debug!(%language, removed, "stripped comments");
    Ok(normalized)
}
