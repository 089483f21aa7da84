//! Constituency tree model shared by every pipeline stage.

use crate::error::TreeError;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

/// Edge label for head → dependent edges of a dependency tree.
pub const DEPENDENCY_LABEL: &str = "dependency";

/// Node type the grammars use for unparseable regions.
pub const ERROR_NODE_TYPE: &str = "ERROR";

/// Attributes of a tree node. Spans are half-open byte ranges into the
/// normalized source the tree was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub node_type: String,
    pub is_terminal: bool,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl TreeNode {
    pub fn new(node_type: impl Into<String>, is_terminal: bool, start_byte: usize, end_byte: usize) -> Self {
        Self {
            node_type: node_type.into(),
            is_terminal,
            start_byte,
            end_byte,
        }
    }
}

/// Attributes of a parent → child edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeEdge {
    /// Set only by the dependency and simplification stages.
    pub label: Option<String>,
}

impl TreeEdge {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

/// Graph view over tree nodes, implemented by every tree flavour so the
/// distance codec can treat them uniformly.
pub trait TokenGraph {
    fn graph(&self) -> &StableDiGraph<TreeNode, TreeEdge>;
}

/// A rooted phrase-structure tree. Node ids are the petgraph indices, assigned
/// densely from 0 (the root) while building; later rewrites only remove nodes
/// and add edges.
#[derive(Debug, Clone, Default)]
pub struct ConstituencyTree {
    graph: StableDiGraph<TreeNode, TreeEdge>,
}

impl TokenGraph for ConstituencyTree {
    fn graph(&self) -> &StableDiGraph<TreeNode, TreeEdge> {
        &self.graph
    }
}

impl ConstituencyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its id. Ids count up from 0 until a node is
    /// removed; after that a vacant id may be handed out again.
    pub fn add_node(&mut self, node: TreeNode) -> NodeIndex {
        self.graph.add_node(node)
    }

    pub fn add_edge(&mut self, parent: NodeIndex, child: NodeIndex, edge: TreeEdge) {
        self.graph.update_edge(parent, child, edge);
    }

    pub fn node(&self, id: NodeIndex) -> Option<&TreeNode> {
        self.graph.node_weight(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeIndex) -> Option<&mut TreeNode> {
        self.graph.node_weight_mut(id)
    }

    pub fn contains(&self, id: NodeIndex) -> bool {
        self.graph.contains_node(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Node ids in ascending order.
    pub fn node_ids(&self) -> Vec<NodeIndex> {
        let mut ids: Vec<NodeIndex> = self.graph.node_indices().collect();
        ids.sort_unstable();
        ids
    }

    /// The unique node without a parent.
    pub fn root(&self) -> Result<NodeIndex, TreeError> {
        let mut roots = self
            .graph
            .node_indices()
            .filter(|&n| self.parent(n).is_none());
        let Some(root) = roots.next() else {
            return Err(TreeError::EmptyInput("tree has no nodes"));
        };
        if let Some(other) = roots.next() {
            return Err(TreeError::invariant(format!(
                "tree has more than one root ({} and {})",
                root.index(),
                other.index()
            )));
        }
        Ok(root)
    }

    pub fn parent(&self, id: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(id, Direction::Incoming).next()
    }

    /// Children ordered by `start_byte`, ties broken by id.
    pub fn children(&self, id: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self.graph.neighbors_directed(id, Direction::Outgoing).collect();
        self.sort_by_start(&mut children);
        children
    }

    /// Label of the edge `parent → child`, if the edge exists and carries one.
    pub fn edge_label(&self, parent: NodeIndex, child: NodeIndex) -> Option<&str> {
        self.graph
            .find_edge(parent, child)
            .and_then(|e| self.graph[e].label.as_deref())
    }

    pub(crate) fn edge_data(&self, parent: NodeIndex, child: NodeIndex) -> TreeEdge {
        self.graph
            .find_edge(parent, child)
            .map(|e| self.graph[e].clone())
            .unwrap_or_default()
    }

    /// All edges as `(parent, child, label)`, sorted by ids.
    pub fn edge_list(&self) -> Vec<(usize, usize, Option<String>)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), e.weight().label.clone()))
            .collect();
        edges.sort();
        edges
    }

    /// Whether the grammar reported an error node anywhere in the tree.
    pub fn has_error(&self) -> bool {
        self.graph
            .node_indices()
            .any(|n| self.graph[n].node_type == ERROR_NODE_TYPE)
    }

    /// Terminal nodes ordered by `start_byte`, ties broken by id.
    pub fn terminals(&self) -> Vec<NodeIndex> {
        let mut terminals: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&n| self.graph[n].is_terminal)
            .collect();
        self.sort_by_start(&mut terminals);
        terminals
    }

    /// Every node strictly below `id`, in depth-first pre-order.
    pub fn descendants(&self, id: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeIndex> = self.children(id).into_iter().rev().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).into_iter().rev());
        }
        out
    }

    /// Ancestors of `id` from the root down to its parent.
    pub fn ancestors(&self, id: NodeIndex) -> Vec<NodeIndex> {
        let mut path = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            path.push(p);
            current = self.parent(p);
        }
        path.reverse();
        path
    }

    /// Number of edges between the root and `id`.
    pub fn depth(&self, id: NodeIndex) -> Result<usize, TreeError> {
        if !self.contains(id) {
            return Err(TreeError::UnknownNode(id.index()));
        }
        Ok(self.ancestors(id).len())
    }

    /// Remove a node together with its edges.
    pub fn remove_node(&mut self, id: NodeIndex) -> Option<TreeNode> {
        self.graph.remove_node(id)
    }

    /// Token text of every terminal, left to right.
    pub fn tokens(&self, code: &str) -> Result<Vec<String>, TreeError> {
        let terminals = self.terminals();
        if terminals.is_empty() {
            return Err(TreeError::EmptyInput("tree has no terminals"));
        }
        token_texts(&self.graph, &terminals, code)
    }

    /// Depth of every terminal, aligned with [`Self::tokens`].
    pub fn depths_and_tokens(&self, code: &str) -> Result<(Vec<usize>, Vec<String>), TreeError> {
        let terminals = self.terminals();
        if terminals.is_empty() {
            return Err(TreeError::EmptyInput("tree has no terminals"));
        }
        let depths = terminals
            .iter()
            .map(|&t| self.depth(t))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((depths, token_texts(&self.graph, &terminals, code)?))
    }

    fn sort_by_start(&self, ids: &mut [NodeIndex]) {
        ids.sort_by_key(|&n| (self.graph[n].start_byte, n.index()));
    }
}

/// Decode the `[start, end)` byte slice of `code`.
pub fn span_text(code: &str, start: usize, end: usize) -> Result<String, TreeError> {
    code.as_bytes()
        .get(start..end)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .map(str::to_string)
        .ok_or(TreeError::InvalidSpan { start, end })
}

pub(crate) fn token_texts(
    graph: &StableDiGraph<TreeNode, TreeEdge>,
    ids: &[NodeIndex],
    code: &str,
) -> Result<Vec<String>, TreeError> {
    ids.iter()
        .map(|&n| span_text(code, graph[n].start_byte, graph[n].end_byte))
        .collect()
}
