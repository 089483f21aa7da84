//! Distance-matrix codec: trees to hop-count matrices and back.

use crate::config::DistanceConfig;
use crate::error::TreeError;
use crate::tree::{TokenGraph, token_texts};
use petgraph::graph::{NodeIndex as GraphIndex, UnGraph};
use petgraph::stable_graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// All-pairs hop distances between the tokens of a tree, ordered by
/// `start_byte`. Symmetric with a zero diagonal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistanceMatrix {
    pub tokens: Vec<String>,
    pub distances: Vec<Vec<u32>>,
}

impl DistanceMatrix {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> Option<u32> {
        self.distances.get(i).and_then(|row| row.get(j)).copied()
    }

    /// Reconstruct the tree these distances were measured on.
    pub fn to_tree(&self) -> Result<ReconstructedTree, TreeError> {
        from_distance_matrix(&self.distances, &self.tokens)
    }
}

/// Encodes trees as distance matrices, warning above a soft token limit.
#[derive(Debug, Clone, Default)]
pub struct DistanceCodec {
    config: DistanceConfig,
}

impl DistanceCodec {
    pub fn new(config: DistanceConfig) -> Self {
        Self { config }
    }

    /// Hop distances between the terminals of `tree`, treating its edges as
    /// undirected. Non-terminals count as intermediate hops.
    pub fn encode<G: TokenGraph>(&self, tree: &G, code: &str) -> Result<DistanceMatrix, TreeError> {
        let graph = tree.graph();
        let mut terminals: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|&n| graph[n].is_terminal)
            .collect();
        if terminals.is_empty() {
            return Err(TreeError::EmptyInput("tree has no terminals"));
        }
        terminals.sort_by_key(|&n| (graph[n].start_byte, n.index()));
        if terminals.len() > self.config.max_tokens {
            tracing::warn!(
                tokens = terminals.len(),
                limit = self.config.max_tokens,
                "distance matrix above the configured token limit"
            );
        }

        let position: HashMap<NodeIndex, usize> =
            terminals.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let mut distances = vec![vec![0u32; terminals.len()]; terminals.len()];
        for (i, &source) in terminals.iter().enumerate() {
            let mut seen = 0usize;
            let mut hops: HashMap<NodeIndex, u32> = HashMap::from([(source, 0)]);
            let mut queue = VecDeque::from([source]);
            while let Some(n) = queue.pop_front() {
                let d = hops[&n];
                if let Some(&j) = position.get(&n) {
                    distances[i][j] = d;
                    seen += 1;
                }
                for next in graph.neighbors_undirected(n) {
                    if !hops.contains_key(&next) {
                        hops.insert(next, d + 1);
                        queue.push_back(next);
                    }
                }
            }
            if seen != terminals.len() {
                return Err(TreeError::invariant(format!(
                    "terminal {} reaches only {} of {} terminals",
                    source.index(),
                    seen,
                    terminals.len()
                )));
            }
        }

        Ok(DistanceMatrix {
            tokens: token_texts(graph, &terminals, code)?,
            distances,
        })
    }
}

/// Encode with the default codec settings.
pub fn to_distance_matrix<G: TokenGraph>(tree: &G, code: &str) -> Result<DistanceMatrix, TreeError> {
    DistanceCodec::default().encode(tree, code)
}

/// An undirected tree over token positions `0..n`, as recovered from a
/// distance matrix. Edge weights are the matrix entries.
#[derive(Debug, Clone)]
pub struct ReconstructedTree {
    graph: UnGraph<String, f64>,
}

impl ReconstructedTree {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn tokens(&self) -> Vec<&str> {
        self.graph
            .raw_nodes()
            .iter()
            .map(|node| node.weight.as_str())
            .collect()
    }

    pub fn has_edge(&self, i: usize, j: usize) -> bool {
        i < self.graph.node_count()
            && j < self.graph.node_count()
            && self
                .graph
                .find_edge(GraphIndex::new(i), GraphIndex::new(j))
                .is_some()
    }

    /// Edges as `(i, j)` with `i < j`, in the order they were selected.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| {
                let (a, b) = (e.source().index(), e.target().index());
                (a.min(b), a.max(b))
            })
            .collect()
    }

    pub fn total_weight(&self) -> f64 {
        self.graph.raw_edges().iter().map(|e| e.weight).sum()
    }
}

/// Minimum spanning tree of the complete graph on `tokens` weighted by
/// `matrix`.
///
/// Kruskal over pairs `i < j` ordered by `(weight, i, j)`, so equal weights
/// always resolve to the lexicographically smallest pair. The weight of a pair
/// is read from the lower triangle (`matrix[j][i]`).
pub fn from_distance_matrix<T>(matrix: &[Vec<T>], tokens: &[String]) -> Result<ReconstructedTree, TreeError>
where
    T: Copy + Into<f64>,
{
    let n = tokens.len();
    if matrix.len() != n {
        return Err(TreeError::AlignmentMismatch {
            what: "distance matrix rows",
            expected: n,
            found: matrix.len(),
        });
    }
    if let Some(row) = matrix.iter().find(|row| row.len() != n) {
        return Err(TreeError::AlignmentMismatch {
            what: "distance matrix columns",
            expected: n,
            found: row.len(),
        });
    }

    let mut graph = UnGraph::<String, f64>::with_capacity(n, n.saturating_sub(1));
    for token in tokens {
        graph.add_node(token.clone());
    }

    let mut candidates: Vec<(f64, usize, usize)> = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for (j, row) in matrix.iter().enumerate() {
        for (i, &w) in row.iter().enumerate().take(j) {
            candidates.push((w.into(), i, j));
        }
    }
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut components = UnionFind::<usize>::new(n);
    for (w, i, j) in candidates {
        if components.union(i, j) {
            graph.add_edge(GraphIndex::new(i), GraphIndex::new(j), w);
        }
    }

    if n > 0 && graph.edge_count() != n - 1 {
        return Err(TreeError::invariant(format!(
            "spanning tree over {} tokens has {} edges",
            n,
            graph.edge_count()
        )));
    }
    Ok(ReconstructedTree { graph })
}
