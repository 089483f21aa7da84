//! Constituency graph builder: walks a foreign parser's primitive tree into a
//! [`ConstituencyTree`].

use crate::tree::{ConstituencyTree, TreeEdge, TreeNode};
use petgraph::stable_graph::NodeIndex;

/// A node of the primitive parse tree produced by an external grammar.
///
/// Implemented by the parser adapter for tree-sitter nodes, and by test
/// fixtures. Children must be returned in source order.
pub trait SyntaxNode: Sized {
    fn kind(&self) -> &str;
    fn start_byte(&self) -> usize;
    fn end_byte(&self) -> usize;
    fn children(&self) -> Vec<Self>;
}

/// Build a constituency tree from the root of a primitive parse tree.
///
/// Ids are handed out in pre-order, so the root is 0 and every child gets the
/// next unused id when it is first visited. A node is terminal when it has no
/// children. The build never fails: callers check [`ConstituencyTree::has_error`]
/// before trusting the result.
pub fn build<N: SyntaxNode>(root: &N) -> ConstituencyTree {
    let mut tree = ConstituencyTree::new();
    // The root is a non-terminal even for empty input, like every parse root.
    let root_id = tree.add_node(TreeNode::new(
        root.kind(),
        false,
        root.start_byte(),
        root.end_byte(),
    ));

    let mut stack: Vec<(N, NodeIndex)> = root
        .children()
        .into_iter()
        .rev()
        .map(|child| (child, root_id))
        .collect();
    while let Some((node, parent)) = stack.pop() {
        let children = node.children();
        let id = tree.add_node(TreeNode::new(
            node.kind(),
            children.is_empty(),
            node.start_byte(),
            node.end_byte(),
        ));
        tree.add_edge(parent, id, TreeEdge::default());
        stack.extend(children.into_iter().rev().map(|child| (child, id)));
    }

    tracing::debug!(
        nodes = tree.node_count(),
        terminals = tree.terminals().len(),
        "built constituency tree"
    );
    tree
}

/// Owned primitive tree, used to feed the builder without a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainNode {
    pub kind: String,
    pub start_byte: usize,
    pub end_byte: usize,
    pub children: Vec<PlainNode>,
}

impl PlainNode {
    pub fn leaf(kind: &str, start_byte: usize, end_byte: usize) -> Self {
        Self {
            kind: kind.to_string(),
            start_byte,
            end_byte,
            children: Vec::new(),
        }
    }

    /// An inner node spanning its children.
    pub fn inner(kind: &str, children: Vec<PlainNode>) -> Self {
        let start_byte = children.first().map_or(0, |c| c.start_byte);
        let end_byte = children.last().map_or(start_byte, |c| c.end_byte);
        Self {
            kind: kind.to_string(),
            start_byte,
            end_byte,
            children,
        }
    }
}

impl<'a> SyntaxNode for &'a PlainNode {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn start_byte(&self) -> usize {
        self.start_byte
    }

    fn end_byte(&self) -> usize {
        self.end_byte
    }

    fn children(&self) -> Vec<Self> {
        let node: &'a PlainNode = *self;
        node.children.iter().collect()
    }
}
