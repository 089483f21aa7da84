//! Tree simplification and binarization.
//!
//! All passes work on a private copy and return the rewritten tree. Removed
//! non-terminals leave their type behind in the labels of the edges that
//! replace them, joined with `-`.

use crate::config::{BinarizeConfig, HeadChoice};
use crate::error::TreeError;
use crate::tree::{ConstituencyTree, TreeEdge};
use petgraph::stable_graph::NodeIndex;
use std::collections::HashMap;
use std::fmt;

/// Picks the child a pure non-terminal is replaced by.
pub type PromotionRule = Box<dyn Fn(&ConstituencyTree, NodeIndex) -> NodeIndex + Send + Sync>;

/// Promotion rules keyed by non-terminal type. Types without a rule promote
/// their leftmost child.
#[derive(Default)]
pub struct PromotionRules {
    rules: HashMap<String, PromotionRule>,
}

impl fmt::Debug for PromotionRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&String> = self.rules.keys().collect();
        types.sort();
        f.debug_struct("PromotionRules").field("types", &types).finish()
    }
}

impl PromotionRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node_type: impl Into<String>, rule: PromotionRule) {
        self.rules.insert(node_type.into(), rule);
    }

    /// Rules for the leftmost/rightmost choices listed in the config.
    pub fn from_config(config: &BinarizeConfig) -> Self {
        let mut rules = Self::new();
        for (node_type, choice) in &config.head_rules {
            let rule: PromotionRule = match choice {
                HeadChoice::Leftmost => Box::new(leftmost_child),
                HeadChoice::Rightmost => Box::new(rightmost_child),
            };
            rules.insert(node_type.clone(), rule);
        }
        rules
    }

    fn choose(&self, tree: &ConstituencyTree, n: NodeIndex, node_type: &str) -> NodeIndex {
        match self.rules.get(node_type) {
            Some(rule) => rule(tree, n),
            None => leftmost_child(tree, n),
        }
    }
}

/// Child with the smallest `start_byte`. Falls back to `n` for leaves.
pub fn leftmost_child(tree: &ConstituencyTree, n: NodeIndex) -> NodeIndex {
    tree.children(n).first().copied().unwrap_or(n)
}

/// Child with the largest `start_byte`. Falls back to `n` for leaves.
pub fn rightmost_child(tree: &ConstituencyTree, n: NodeIndex) -> NodeIndex {
    tree.children(n).last().copied().unwrap_or(n)
}

fn join_labels(parts: &[Option<&str>]) -> String {
    parts.iter().flatten().copied().collect::<Vec<_>>().join("-")
}

/// Remove `n`, attaching each of its children to its parent with the label
/// `parent-label - type(n) - child-label`.
fn splice_out(tree: &mut ConstituencyTree, n: NodeIndex) {
    let Some(node_type) = tree.node(n).map(|node| node.node_type.clone()) else {
        return;
    };
    if let Some(parent) = tree.parent(n) {
        let parent_label = tree.edge_label(parent, n).map(str::to_string);
        for child in tree.children(n) {
            let label = join_labels(&[
                parent_label.as_deref(),
                Some(&node_type),
                tree.edge_label(n, child),
            ]);
            tree.add_edge(parent, child, TreeEdge::labeled(label));
        }
    }
    tree.remove_node(n);
}

/// Terminal-descendant flag for every node, computed bottom-up.
fn dominates_terminal(tree: &ConstituencyTree) -> HashMap<NodeIndex, bool> {
    let mut order = tree.node_ids();
    // Deepest first; ids stop following depth once edges are rewired.
    order.sort_by_key(|&n| std::cmp::Reverse(tree.ancestors(n).len()));
    let mut flags: HashMap<NodeIndex, bool> = HashMap::with_capacity(order.len());
    for n in order {
        let own = tree.node(n).is_some_and(|node| node.is_terminal);
        let below = tree
            .children(n)
            .iter()
            .any(|c| flags.get(c).copied().unwrap_or(false));
        flags.insert(n, own || below);
    }
    flags
}

/// Remove non-terminals with no terminal anywhere below them, one per
/// iteration, until none is left. Children are re-wired to the removed node's
/// parent.
pub fn remove_empty_nonterminals(tree: &ConstituencyTree) -> ConstituencyTree {
    let mut g = tree.clone();
    let mut removed = 0usize;
    loop {
        let flags = dominates_terminal(&g);
        let next = g.node_ids().into_iter().find(|&n| {
            g.node(n).is_some_and(|node| !node.is_terminal) && !flags.get(&n).copied().unwrap_or(false)
        });
        let Some(n) = next else { break };
        splice_out(&mut g, n);
        removed += 1;
    }
    tracing::debug!(removed, "removed empty non-terminals");
    g
}

/// Remove every non-root non-terminal that has no terminal among its immediate
/// children, one per iteration. Afterwards each non-terminal below the root
/// directly holds at least one terminal, the precondition for promotion.
pub fn collapse_unanchored_nonterminals(tree: &ConstituencyTree) -> Result<ConstituencyTree, TreeError> {
    let mut g = tree.clone();
    let root = g.root()?;
    loop {
        let next = g.node_ids().into_iter().find(|&n| {
            n != root
                && g.node(n).is_some_and(|node| !node.is_terminal)
                && !g
                    .children(n)
                    .iter()
                    .any(|&c| g.node(c).is_some_and(|child| child.is_terminal))
        });
        let Some(n) = next else { break };
        splice_out(&mut g, n);
    }
    Ok(g)
}

/// Replace every pure non-terminal (all children terminal) by one of its
/// children until no non-terminal remains.
///
/// Each round promotes all pure non-terminals found at its start. The promoted
/// child takes over the parent edge; its former siblings hang from it with the
/// label `type(n)` or `type(n)-old-label`.
pub fn promote_pure_nonterminals(
    tree: &ConstituencyTree,
    rules: Option<&PromotionRules>,
) -> Result<ConstituencyTree, TreeError> {
    let default_rules = PromotionRules::new();
    let rules = rules.unwrap_or(&default_rules);
    let mut g = tree.clone();
    let mut rounds = 0usize;

    loop {
        let nonterminals: Vec<NodeIndex> = g
            .node_ids()
            .into_iter()
            .filter(|&n| g.node(n).is_some_and(|node| !node.is_terminal))
            .collect();
        if nonterminals.is_empty() {
            break;
        }
        let pure: Vec<NodeIndex> = nonterminals
            .into_iter()
            .filter(|&n| {
                let children = g.children(n);
                !children.is_empty()
                    && children
                        .iter()
                        .all(|&c| g.node(c).is_some_and(|child| child.is_terminal))
            })
            .collect();
        if pure.is_empty() {
            return Err(TreeError::invariant(
                "non-terminals remain but none has only terminal children",
            ));
        }

        // Rules see the tree as it was at the start of the round.
        let mut choices = Vec::with_capacity(pure.len());
        for n in pure {
            let node_type = g.node(n).map(|node| node.node_type.clone()).unwrap_or_default();
            let children = g.children(n);
            let m = rules.choose(&g, n, &node_type);
            if !children.contains(&m) {
                return Err(TreeError::invariant(format!(
                    "promotion rule for `{}` chose {}, which is not a child of {}",
                    node_type,
                    m.index(),
                    n.index()
                )));
            }
            choices.push((n, node_type, children, m));
        }

        let promoted = choices.len();
        for (n, node_type, children, m) in choices {
            if let Some(parent) = g.parent(n) {
                let edge = g.edge_data(parent, n);
                g.add_edge(parent, m, edge);
            }
            for v in children.into_iter().filter(|&v| v != m) {
                let label = join_labels(&[Some(&node_type), g.edge_label(n, v)]);
                g.add_edge(m, v, TreeEdge::labeled(label));
            }
            g.remove_node(n);
        }
        rounds += 1;
        tracing::trace!(round = rounds, promoted, "promotion round");
    }

    tracing::debug!(rounds, nodes = g.node_count(), "binarized tree");
    Ok(g)
}

/// Collapse unanchored non-terminals, then promote until only terminals are left.
pub fn binarize(tree: &ConstituencyTree, rules: Option<&PromotionRules>) -> Result<ConstituencyTree, TreeError> {
    let anchored = collapse_unanchored_nonterminals(tree)?;
    promote_pure_nonterminals(&anchored, rules)
}

/// Non-terminal types along a root path, with a cut point: everything after
/// `special_index` is folded into one suffix label and the node at
/// `special_index` is where a collapsed node gets re-attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexEdgeLabels {
    pub non_terminals: Vec<String>,
    pub depths: Vec<usize>,
    pub special_index: usize,
}

impl ComplexEdgeLabels {
    pub fn new(non_terminals: Vec<String>, depths: Vec<usize>, special_index: usize) -> Self {
        Self {
            non_terminals,
            depths,
            special_index,
        }
    }

    /// Labels for the ancestors of `node` (root first), cut at `special_index`.
    pub fn for_node(tree: &ConstituencyTree, node: NodeIndex, special_index: usize) -> Result<Self, TreeError> {
        if !tree.contains(node) {
            return Err(TreeError::UnknownNode(node.index()));
        }
        let path = tree.ancestors(node);
        if special_index >= path.len() {
            return Err(TreeError::AlignmentMismatch {
                what: "edge label cut index",
                expected: path.len(),
                found: special_index,
            });
        }
        let non_terminals = path
            .iter()
            .filter_map(|&a| tree.node(a).map(|n| n.node_type.clone()))
            .collect();
        let depths = (0..path.len()).collect();
        Ok(Self::new(non_terminals, depths, special_index))
    }

    /// Labels folded into the suffix.
    pub fn suffix(&self) -> &[String] {
        self.special_index
            .checked_add(1)
            .and_then(|start| self.non_terminals.get(start..))
            .unwrap_or(&[])
    }

    /// Node of `path` to re-attach to, and the trailing labels to append.
    pub fn node_to_append<T: Copy>(&self, path: &[T]) -> Option<(T, &[String])> {
        path.get(self.special_index).map(|&n| (n, self.suffix()))
    }
}

impl fmt::Display for ComplexEdgeLabels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.special_index, self.suffix().join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{PlainNode, build};
    use crate::tree::TreeNode;

    /// `x = f ( y )`:
    /// module → expression_statement → assignment → {x, =, call → {f, argument_list → {(, y, )}}}
    fn assignment() -> ConstituencyTree {
        build(&&PlainNode::inner(
            "module",
            vec![PlainNode::inner(
                "expression_statement",
                vec![PlainNode::inner(
                    "assignment",
                    vec![
                        PlainNode::leaf("identifier", 0, 1),
                        PlainNode::leaf("=", 2, 3),
                        PlainNode::inner(
                            "call",
                            vec![
                                PlainNode::leaf("identifier", 4, 5),
                                PlainNode::inner(
                                    "argument_list",
                                    vec![
                                        PlainNode::leaf("(", 6, 7),
                                        PlainNode::leaf("identifier", 8, 9),
                                        PlainNode::leaf(")", 10, 11),
                                    ],
                                ),
                            ],
                        ),
                    ],
                )],
            )],
        ))
    }

    #[test]
    fn test_remove_empty_nonterminals_keeps_trees_with_terminals() {
        let tree = assignment();
        let simplified = remove_empty_nonterminals(&tree);
        assert_eq!(simplified.node_count(), tree.node_count());
        assert_eq!(simplified.edge_list(), tree.edge_list());
    }

    #[test]
    fn test_remove_empty_nonterminals_drops_terminal_free_chain() {
        // a, then block → statement with nothing under it
        let mut tree = build(&&PlainNode::inner(
            "module",
            vec![
                PlainNode::leaf("identifier", 0, 1),
                PlainNode::inner("block", vec![PlainNode::leaf("\n", 1, 2)]),
            ],
        ));
        crate::collapse::remove_phantom_tokens(&mut tree, "\n");
        let simplified = remove_empty_nonterminals(&tree);
        assert_eq!(simplified.node_count(), 2);
        assert_eq!(simplified.edge_list(), vec![(0, 1, None)]);
    }

    /// module → {decorators → empty, identifier}, with both wrappers
    /// non-terminal and nothing under `empty`.
    fn tree_with_empty_chain() -> ConstituencyTree {
        let mut tree = ConstituencyTree::new();
        let module = tree.add_node(TreeNode::new("module", false, 0, 1));
        let decorators = tree.add_node(TreeNode::new("decorators", false, 0, 0));
        let empty = tree.add_node(TreeNode::new("empty", false, 0, 0));
        let ident = tree.add_node(TreeNode::new("identifier", true, 0, 1));
        tree.add_edge(module, decorators, TreeEdge::default());
        tree.add_edge(decorators, empty, TreeEdge::default());
        tree.add_edge(module, ident, TreeEdge::default());
        tree
    }

    #[test]
    fn test_remove_empty_nonterminals_is_idempotent() {
        let tree = tree_with_empty_chain();
        let once = remove_empty_nonterminals(&tree);
        let twice = remove_empty_nonterminals(&once);
        assert_eq!(once.node_ids(), twice.node_ids());
        assert_eq!(once.edge_list(), twice.edge_list());
        assert_eq!(once.node_count(), 2);
        assert_eq!(once.edge_list(), vec![(0, 3, None)]);
    }

    #[test]
    fn test_splice_labels() {
        // root → a → b → leaf: removing a then b labels root → leaf "a-b"
        let mut tree = build(&&PlainNode::inner(
            "root",
            vec![PlainNode::inner(
                "a",
                vec![PlainNode::inner("b", vec![PlainNode::leaf("leaf", 0, 1)])],
            )],
        ));
        splice_out(&mut tree, NodeIndex::new(1));
        splice_out(&mut tree, NodeIndex::new(2));
        assert_eq!(tree.edge_list(), vec![(0, 3, Some("a-b".to_string()))]);
    }

    #[test]
    fn test_collapse_unanchored_keeps_root() {
        let tree = assignment();
        let anchored = collapse_unanchored_nonterminals(&tree).unwrap();
        // expression_statement has no terminal child and goes away
        assert!(
            anchored
                .node_ids()
                .iter()
                .all(|&n| anchored.node(n).unwrap().node_type != "expression_statement")
        );
        assert_eq!(anchored.root().unwrap(), NodeIndex::new(0));
        assert_eq!(
            anchored.edge_label(NodeIndex::new(0), NodeIndex::new(2)),
            Some("expression_statement")
        );
    }

    #[test]
    fn test_binarize_leaves_only_terminals() {
        let tree = assignment();
        let binary = binarize(&tree, None).unwrap();
        assert_eq!(binary.node_count(), tree.terminals().len());
        assert_eq!(binary.edge_count(), binary.node_count() - 1);
        assert!(
            binary
                .node_ids()
                .iter()
                .all(|&n| binary.node(n).unwrap().is_terminal)
        );
        // x heads the whole statement
        let root = binary.root().unwrap();
        assert_eq!(binary.node(root).unwrap().start_byte, 0);
    }

    #[test]
    fn test_promotion_labels_siblings() {
        let tree = assignment();
        let binary = binarize(&tree, None).unwrap();
        // `(` was promoted for argument_list and owns `y` and `)`
        let open = NodeIndex::new(8);
        assert_eq!(binary.node(open).unwrap().node_type, "(");
        assert_eq!(binary.edge_label(open, NodeIndex::new(9)), Some("argument_list"));
        assert_eq!(binary.edge_label(open, NodeIndex::new(10)), Some("argument_list"));
        // `f` was promoted for call and owns `(`
        assert_eq!(binary.edge_label(NodeIndex::new(6), open), Some("call"));
        // `x` was promoted for assignment and keeps the collapsed statement label
        assert_eq!(binary.edge_label(NodeIndex::new(3), NodeIndex::new(6)), Some("assignment"));
    }

    #[test]
    fn test_rightmost_rule_from_config() {
        let mut config = BinarizeConfig::default();
        config
            .head_rules
            .insert("argument_list".to_string(), HeadChoice::Rightmost);
        let rules = PromotionRules::from_config(&config);
        let binary = binarize(&assignment(), Some(&rules)).unwrap();
        let close = NodeIndex::new(10);
        assert_eq!(binary.edge_label(close, NodeIndex::new(8)), Some("argument_list"));
        assert_eq!(binary.parent(close), Some(NodeIndex::new(6)));
    }

    #[test]
    fn test_rule_choosing_non_child_is_rejected() {
        let mut rules = PromotionRules::new();
        rules.insert(
            "argument_list",
            Box::new(|_: &ConstituencyTree, _: NodeIndex| NodeIndex::new(0)),
        );
        assert!(matches!(
            binarize(&assignment(), Some(&rules)),
            Err(TreeError::StructuralInvariant(_))
        ));
    }

    #[test]
    fn test_childless_nonterminal_blocks_promotion() {
        let mut tree = ConstituencyTree::new();
        let module = tree.add_node(TreeNode::new("module", false, 0, 1));
        let a = tree.add_node(TreeNode::new("a", true, 0, 1));
        let empty = tree.add_node(TreeNode::new("empty", false, 1, 1));
        tree.add_edge(module, a, TreeEdge::default());
        tree.add_edge(module, empty, TreeEdge::default());
        assert!(matches!(
            promote_pure_nonterminals(&tree, None),
            Err(TreeError::StructuralInvariant(_))
        ));
    }

    #[test]
    fn test_rules_see_the_round_snapshot() {
        // Both pairs are pure in the first round. The rule records how many
        // pairs it can see each time it runs.
        let tree = build(&&PlainNode::inner(
            "module",
            vec![
                PlainNode::inner(
                    "pair",
                    vec![PlainNode::leaf("a", 0, 1), PlainNode::leaf("b", 2, 3)],
                ),
                PlainNode::inner(
                    "pair",
                    vec![PlainNode::leaf("c", 4, 5), PlainNode::leaf("d", 6, 7)],
                ),
            ],
        ));
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let record = std::sync::Arc::clone(&seen);
        let mut rules = PromotionRules::new();
        rules.insert(
            "pair",
            Box::new(move |t: &ConstituencyTree, n: NodeIndex| {
                let pairs = t
                    .node_ids()
                    .into_iter()
                    .filter(|&id| t.node(id).unwrap().node_type == "pair")
                    .count();
                record.lock().unwrap().push(pairs);
                leftmost_child(t, n)
            }),
        );
        let binary = promote_pure_nonterminals(&tree, Some(&rules)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![2, 2]);
        assert_eq!(binary.node_count(), 4);
    }

    #[test]
    fn test_suffix_with_out_of_range_cut() {
        let labels = ComplexEdgeLabels::new(vec!["module".to_string()], vec![0], usize::MAX);
        assert!(labels.suffix().is_empty());
        assert_eq!(labels.node_to_append(&[0usize]), None);
    }

    #[test]
    fn test_complex_edge_labels() {
        let tree = assignment();
        // `y` sits under module / expression_statement / assignment / call / argument_list
        let labels = ComplexEdgeLabels::for_node(&tree, NodeIndex::new(9), 2).unwrap();
        assert_eq!(labels.non_terminals.len(), 5);
        assert_eq!(labels.to_string(), "2-call|argument_list");
        let path = tree.ancestors(NodeIndex::new(9));
        let (node, suffix) = labels.node_to_append(&path).unwrap();
        assert_eq!(tree.node(node).unwrap().node_type, "assignment");
        assert_eq!(suffix, ["call".to_string(), "argument_list".to_string()]);

        assert!(ComplexEdgeLabels::for_node(&tree, NodeIndex::new(9), 5).is_err());
    }
}
