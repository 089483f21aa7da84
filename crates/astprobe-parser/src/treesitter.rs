//! Tree-sitter integration: parser setup and the adapter that feeds
//! tree-sitter nodes to the constituency builder.

use crate::languages::Language;
use crate::source::ParseError;
use astprobe_core::SyntaxNode;

/// A parser with `language`'s grammar loaded.
pub fn new_parser(language: Language) -> Result<tree_sitter::Parser, ParseError> {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&language.ts_language())?;
    Ok(parser)
}

/// Parse source code and return the tree-sitter tree.
pub fn parse_source(
    parser: &mut tree_sitter::Parser,
    language: Language,
    source: &str,
) -> Result<tree_sitter::Tree, ParseError> {
    parser
        .parse(source, None)
        .ok_or(ParseError::NoTree { language })
}

/// Borrowed tree-sitter node. Children include anonymous nodes, so
/// punctuation and keywords become terminals.
#[derive(Debug, Clone, Copy)]
pub struct TsNode<'tree>(pub tree_sitter::Node<'tree>);

impl SyntaxNode for TsNode<'_> {
    fn kind(&self) -> &str {
        self.0.kind()
    }

    fn start_byte(&self) -> usize {
        self.0.start_byte()
    }

    fn end_byte(&self) -> usize {
        self.0.end_byte()
    }

    fn children(&self) -> Vec<Self> {
        let mut cursor = self.0.walk();
        self.0.children(&mut cursor).map(TsNode).collect()
    }
}

/// Pre-order walk over every node of `tree`.
pub fn for_each_node<'tree>(tree: &'tree tree_sitter::Tree, mut visit: impl FnMut(tree_sitter::Node<'tree>) -> bool) {
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if !visit(node) {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}
