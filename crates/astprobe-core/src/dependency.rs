//! Dependency-tree extraction from a constituency tree.
//!
//! Every terminal except the leftmost one is attached to a head: the leftmost
//! terminal that precedes it under the nearest ancestor that dominates any
//! preceding terminal at all.

use crate::error::TreeError;
use crate::tree::{
    ConstituencyTree, DEPENDENCY_LABEL, TokenGraph, TreeEdge, TreeNode, token_texts,
};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use std::collections::HashMap;

/// A tree over the terminals of a constituency tree. Node ids are the ids the
/// terminals had in the constituency tree; every non-root terminal has one
/// incoming edge labeled [`DEPENDENCY_LABEL`] from its head.
#[derive(Debug, Clone)]
pub struct DependencyTree {
    graph: StableDiGraph<TreeNode, TreeEdge>,
    root: NodeIndex,
}

impl TokenGraph for DependencyTree {
    fn graph(&self) -> &StableDiGraph<TreeNode, TreeEdge> {
        &self.graph
    }
}

impl DependencyTree {
    /// Compute the head of every terminal of `tree`.
    pub fn extract(tree: &ConstituencyTree) -> Result<Self, TreeError> {
        let terminals = tree.terminals();
        let Some(&root) = terminals.first() else {
            return Err(TreeError::EmptyInput("tree has no terminals"));
        };
        for pair in terminals.windows(2) {
            let (a, b) = (start_of(tree, pair[0]), start_of(tree, pair[1]));
            if a == b {
                return Err(TreeError::invariant(format!(
                    "terminals {} and {} share start byte {}",
                    pair[0].index(),
                    pair[1].index(),
                    a
                )));
            }
        }

        let leftmost = leftmost_terminals(tree)?;
        let mut graph = tree.graph().clone();
        graph.retain_nodes(|g, n| g[n].is_terminal);
        graph.clear_edges();

        for &n in &terminals[1..] {
            let head = select_head(tree, &leftmost, n)?;
            graph.add_edge(head, n, TreeEdge::labeled(DEPENDENCY_LABEL));
        }

        tracing::debug!(
            terminals = terminals.len(),
            root = root.index(),
            "extracted dependency tree"
        );
        Ok(Self { graph, root })
    }

    /// The leftmost terminal, which has no head.
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn node(&self, id: NodeIndex) -> Option<&TreeNode> {
        self.graph.node_weight(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Head of `dependent`, `None` for the root or unknown nodes.
    pub fn head_of(&self, dependent: NodeIndex) -> Option<NodeIndex> {
        if !self.graph.contains_node(dependent) {
            return None;
        }
        self.graph
            .neighbors_directed(dependent, Direction::Incoming)
            .next()
    }

    /// Terminals ordered by `start_byte`.
    pub fn terminals(&self) -> Vec<NodeIndex> {
        let mut ids: Vec<NodeIndex> = self.graph.node_indices().collect();
        ids.sort_by_key(|&n| (self.graph[n].start_byte, n.index()));
        ids
    }

    /// `(head, dependent)` pairs ordered by the dependent's position.
    pub fn arcs(&self) -> Vec<(NodeIndex, NodeIndex)> {
        self.terminals()
            .into_iter()
            .filter_map(|n| self.head_of(n).map(|h| (h, n)))
            .collect()
    }

    /// For every token position, the position of its head (`None` for the root).
    pub fn head_positions(&self) -> Vec<Option<usize>> {
        let terminals = self.terminals();
        let position: HashMap<NodeIndex, usize> =
            terminals.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        terminals
            .iter()
            .map(|&n| self.head_of(n).and_then(|h| position.get(&h).copied()))
            .collect()
    }

    pub fn tokens(&self, code: &str) -> Result<Vec<String>, TreeError> {
        token_texts(&self.graph, &self.terminals(), code)
    }
}

fn start_of(tree: &ConstituencyTree, n: NodeIndex) -> usize {
    tree.node(n).map_or(usize::MAX, |node| node.start_byte)
}

/// Leftmost terminal dominated by every node (inclusive), keyed by node id.
fn leftmost_terminals(tree: &ConstituencyTree) -> Result<HashMap<NodeIndex, NodeIndex>, TreeError> {
    let root = tree.root()?;
    let mut order = vec![root];
    order.extend(tree.descendants(root));
    if order.len() != tree.node_count() {
        return Err(TreeError::invariant(format!(
            "only {} of {} nodes are reachable from the root",
            order.len(),
            tree.node_count()
        )));
    }

    let mut leftmost: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    for &n in order.iter().rev() {
        let own = tree.node(n).filter(|node| node.is_terminal).map(|_| n);
        let best = tree
            .children(n)
            .into_iter()
            .filter_map(|c| leftmost.get(&c).copied())
            .chain(own)
            .min_by_key(|&t| (start_of(tree, t), t.index()));
        if let Some(best) = best {
            leftmost.insert(n, best);
        }
    }
    Ok(leftmost)
}

/// Walk up from the parent of `n` until an ancestor dominates a terminal that
/// starts before `n`; that ancestor's leftmost terminal is the head.
fn select_head(
    tree: &ConstituencyTree,
    leftmost: &HashMap<NodeIndex, NodeIndex>,
    n: NodeIndex,
) -> Result<NodeIndex, TreeError> {
    let start = start_of(tree, n);
    let mut candidate = tree.parent(n);
    while let Some(ancestor) = candidate {
        if let Some(&t) = leftmost.get(&ancestor)
            && start_of(tree, t) < start
        {
            return Ok(t);
        }
        candidate = tree.parent(ancestor);
    }
    Err(TreeError::invariant(format!(
        "no head found for terminal {} starting at byte {}",
        n.index(),
        start
    )))
}
