//! Tree comparison metrics: unlabeled attachment score and per-token
//! Spearman correlation between distance matrices.

use crate::dependency::DependencyTree;
use crate::distance::ReconstructedTree;
use crate::error::TreeError;
use std::collections::HashSet;

/// A tree whose nodes are token positions `0..len`, so two trees over the same
/// sentence can be compared edge by edge.
pub trait AlignedTree {
    fn aligned_len(&self) -> usize;
    /// Undirected edges between token positions.
    fn aligned_edges(&self) -> Vec<(usize, usize)>;
}

impl AlignedTree for ReconstructedTree {
    fn aligned_len(&self) -> usize {
        self.node_count()
    }

    fn aligned_edges(&self) -> Vec<(usize, usize)> {
        self.edges()
    }
}

impl AlignedTree for DependencyTree {
    fn aligned_len(&self) -> usize {
        self.node_count()
    }

    fn aligned_edges(&self) -> Vec<(usize, usize)> {
        self.head_positions()
            .into_iter()
            .enumerate()
            .filter_map(|(dependent, head)| head.map(|h| (h, dependent)))
            .collect()
    }
}

fn unordered(edge: (usize, usize)) -> (usize, usize) {
    (edge.0.min(edge.1), edge.0.max(edge.1))
}

/// Fraction of predicted edges that also appear, in either direction, in the
/// gold tree. Both trees must have the same node and edge counts.
pub fn uas<G: AlignedTree + ?Sized, P: AlignedTree + ?Sized>(true_tree: &G, pred_tree: &P) -> Result<f64, TreeError> {
    if true_tree.aligned_len() != pred_tree.aligned_len() {
        return Err(TreeError::AlignmentMismatch {
            what: "tree node count",
            expected: true_tree.aligned_len(),
            found: pred_tree.aligned_len(),
        });
    }
    let gold: HashSet<(usize, usize)> = true_tree.aligned_edges().into_iter().map(unordered).collect();
    let predicted = pred_tree.aligned_edges();
    if gold.len() != predicted.len() {
        return Err(TreeError::AlignmentMismatch {
            what: "tree edge count",
            expected: gold.len(),
            found: predicted.len(),
        });
    }
    if predicted.is_empty() {
        return Err(TreeError::EmptyInput("trees have no edges to score"));
    }
    let hits = predicted
        .iter()
        .filter(|&&e| gold.contains(&unordered(e)))
        .count();
    Ok(hits as f64 / predicted.len() as f64)
}

/// Ranks starting at 1, ties sharing the average of their positions.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = rank;
        }
        i = j + 1;
    }
    ranks
}

fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some(cov / (var_a * var_b).sqrt())
}

/// Spearman rank correlation of two equally long series. `None` when either
/// series is constant, has fewer than two values, or contains NaN.
pub fn spearman(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 || a.iter().chain(b).any(|v| v.is_nan()) {
        return None;
    }
    pearson(&average_ranks(a), &average_ranks(b))
}

/// Row-wise Spearman correlation between a gold and a predicted distance
/// matrix, one coefficient per token.
pub fn spearman_rows<T, U>(true_matrix: &[Vec<T>], pred_matrix: &[Vec<U>]) -> Result<Vec<Option<f64>>, TreeError>
where
    T: Copy + Into<f64>,
    U: Copy + Into<f64>,
{
    if true_matrix.len() != pred_matrix.len() {
        return Err(TreeError::AlignmentMismatch {
            what: "distance matrix rows",
            expected: true_matrix.len(),
            found: pred_matrix.len(),
        });
    }
    let mut coefficients = Vec::with_capacity(true_matrix.len());
    for (gold, pred) in true_matrix.iter().zip(pred_matrix) {
        if gold.len() != pred.len() {
            return Err(TreeError::AlignmentMismatch {
                what: "distance matrix columns",
                expected: gold.len(),
                found: pred.len(),
            });
        }
        let gold: Vec<f64> = gold.iter().map(|&v| v.into()).collect();
        let pred: Vec<f64> = pred.iter().map(|&v| v.into()).collect();
        coefficients.push(spearman(&gold, &pred));
    }
    let undefined = coefficients.iter().filter(|c| c.is_none()).count();
    if undefined > 0 {
        tracing::debug!(undefined, rows = coefficients.len(), "constant rows in Spearman comparison");
    }
    Ok(coefficients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::from_distance_matrix;

    fn tokens(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("t{i}")).collect()
    }

    fn chain() -> ReconstructedTree {
        let m = vec![vec![0u32, 1, 2, 3], vec![1, 0, 1, 2], vec![2, 1, 0, 1], vec![3, 2, 1, 0]];
        from_distance_matrix(&m, &tokens(4)).unwrap()
    }

    fn star() -> ReconstructedTree {
        let m = vec![vec![0u32, 1, 1, 1], vec![1, 0, 2, 2], vec![1, 2, 0, 2], vec![1, 2, 2, 0]];
        from_distance_matrix(&m, &tokens(4)).unwrap()
    }

    #[test]
    fn test_uas_identity() {
        assert_eq!(uas(&chain(), &chain()).unwrap(), 1.0);
        assert_eq!(uas(&star(), &star()).unwrap(), 1.0);
    }

    #[test]
    fn test_uas_partial_overlap() {
        // chain: 01 12 23, star: 01 02 03 -> only 01 shared
        let score = uas(&chain(), &star()).unwrap();
        assert!((score - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_uas_size_mismatch() {
        let small = from_distance_matrix(&[vec![0u32, 1], vec![1, 0]], &tokens(2)).unwrap();
        assert!(matches!(
            uas(&chain(), &small),
            Err(TreeError::AlignmentMismatch { .. })
        ));
    }

    #[test]
    fn test_uas_single_token() {
        let single = from_distance_matrix(&[vec![0u32]], &tokens(1)).unwrap();
        assert!(matches!(uas(&single, &single), Err(TreeError::EmptyInput(_))));
    }

    #[test]
    fn test_average_ranks_with_ties() {
        assert_eq!(average_ranks(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);
    }

    #[test]
    fn test_spearman_monotone_and_reversed() {
        let a = [1.0, 2.0, 3.0, 4.0];
        assert!((spearman(&a, &[2.0, 4.0, 8.0, 16.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((spearman(&a, &[4.0, 3.0, 2.0, 1.0]).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(spearman(&a, &[1.0, 1.0, 1.0, 1.0]), None);
    }

    #[test]
    fn test_spearman_rows() {
        let gold = vec![vec![0u32, 1, 2], vec![1, 0, 1], vec![2, 1, 0]];
        let pred = vec![vec![0.0f32, 0.5, 3.0], vec![2.0, 2.0, 2.0], vec![3.0, 0.0, 0.2]];
        let rows = spearman_rows(&gold, &pred).unwrap();
        assert_eq!(rows.len(), 3);
        assert!((rows[0].unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(rows[1], None);
        assert!((rows[2].unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_spearman_rows_mismatch() {
        let gold = vec![vec![0u32, 1], vec![1, 0]];
        let pred = vec![vec![0.0f64, 1.0]];
        assert!(matches!(
            spearman_rows(&gold, &pred),
            Err(TreeError::AlignmentMismatch { .. })
        ));
    }
}
