//! Terminal collapser: destructive cleanups applied once after building.

use crate::tree::ConstituencyTree;
use petgraph::stable_graph::NodeIndex;

/// Whether a node type denotes a string literal in any of the grammars.
pub fn is_string_type(node_type: &str) -> bool {
    node_type == "string" || node_type.contains("string_literal")
}

/// Turn every non-terminal string literal into one opaque terminal spanning
/// its original bytes. Returns how many literals were collapsed.
///
/// Nested literals (interpolations, raw delimiters) are swallowed by the
/// outermost one, since removed nodes are skipped when their turn comes.
pub fn collapse_strings(tree: &mut ConstituencyTree) -> usize {
    let candidates: Vec<NodeIndex> = tree
        .node_ids()
        .into_iter()
        .filter(|&n| {
            tree.node(n)
                .is_some_and(|node| !node.is_terminal && is_string_type(&node.node_type))
        })
        .collect();

    let mut collapsed = 0;
    for n in candidates {
        if !tree.contains(n) {
            continue;
        }
        for d in tree.descendants(n) {
            tree.remove_node(d);
        }
        if let Some(node) = tree.node_mut(n) {
            node.is_terminal = true;
        }
        collapsed += 1;
    }
    if collapsed > 0 {
        tracing::debug!(collapsed, "collapsed string literals");
    }
    collapsed
}

/// Remove every node of `node_type` (and anything below it). Used for
/// grammar artifacts such as Go's newline tokens. Returns the number of
/// nodes matched.
pub fn remove_phantom_tokens(tree: &mut ConstituencyTree, node_type: &str) -> usize {
    let matched: Vec<NodeIndex> = tree
        .node_ids()
        .into_iter()
        .filter(|&n| tree.node(n).is_some_and(|node| node.node_type == node_type))
        .collect();
    for &n in &matched {
        if !tree.contains(n) {
            continue;
        }
        for d in tree.descendants(n) {
            tree.remove_node(d);
        }
        tree.remove_node(n);
    }
    matched.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{PlainNode, build};

    /// `x = "a{b}c"` with the literal at bytes [4, 14).
    fn assignment_with_literal() -> PlainNode {
        PlainNode::inner(
            "module",
            vec![PlainNode::inner(
                "assignment",
                vec![
                    PlainNode::leaf("identifier", 0, 1),
                    PlainNode::leaf("=", 2, 3),
                    PlainNode::inner(
                        "string",
                        vec![
                            PlainNode::leaf("string_start", 4, 5),
                            PlainNode::inner(
                                "interpolation",
                                vec![
                                    PlainNode::leaf("{", 6, 7),
                                    PlainNode::inner(
                                        "string",
                                        vec![
                                            PlainNode::leaf("string_start", 7, 8),
                                            PlainNode::leaf("string_end", 9, 10),
                                        ],
                                    ),
                                    PlainNode::leaf("}", 10, 11),
                                ],
                            ),
                            PlainNode::leaf("string_end", 13, 14),
                        ],
                    ),
                ],
            )],
        )
    }

    #[test]
    fn test_literal_becomes_single_terminal() {
        let mut tree = build(&&assignment_with_literal());
        let collapsed = collapse_strings(&mut tree);
        assert_eq!(collapsed, 1);

        let string_nodes: Vec<NodeIndex> = tree
            .node_ids()
            .into_iter()
            .filter(|&n| tree.node(n).unwrap().node_type == "string")
            .collect();
        assert_eq!(string_nodes.len(), 1);
        let literal = tree.node(string_nodes[0]).unwrap();
        assert!(literal.is_terminal);
        assert_eq!((literal.start_byte, literal.end_byte), (4, 14));
        assert!(tree.descendants(string_nodes[0]).is_empty());
        assert_eq!(tree.terminals().len(), 3);
    }

    #[test]
    fn test_string_literal_suffix_types() {
        let source = PlainNode::inner(
            "program",
            vec![PlainNode::inner(
                "interpreted_string_literal",
                vec![PlainNode::leaf("\"", 0, 1), PlainNode::leaf("\"", 4, 5)],
            )],
        );
        let mut tree = build(&&source);
        assert_eq!(collapse_strings(&mut tree), 1);
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn test_remove_newline_tokens() {
        let source = PlainNode::inner(
            "source_file",
            vec![
                PlainNode::leaf("identifier", 0, 1),
                PlainNode::leaf("\n", 1, 2),
                PlainNode::leaf("identifier", 2, 3),
                PlainNode::leaf("\n", 3, 4),
            ],
        );
        let mut tree = build(&&source);
        assert_eq!(remove_phantom_tokens(&mut tree, "\n"), 2);
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.tokens("a\nb\n").unwrap(), vec!["a", "b"]);
    }
}
