//! Core data model and graph algorithms for syntactic probing of source code.
//!
//! A parse from any grammar is turned into a [`tree::ConstituencyTree`], from which
//! this crate derives a [`dependency::DependencyTree`], hop-count
//! [`distance::DistanceMatrix`] encodings, simplified binarized trees, and the
//! comparison metrics used to score reconstructed trees.

pub mod builder;
pub mod collapse;
pub mod compare;
pub mod config;
pub mod dependency;
pub mod distance;
pub mod error;
pub mod simplify;
pub mod tree;

pub use builder::{SyntaxNode, build};
pub use compare::{AlignedTree, spearman_rows, uas};
pub use config::ProbeConfig;
pub use dependency::DependencyTree;
pub use distance::{DistanceMatrix, ReconstructedTree, from_distance_matrix, to_distance_matrix};
pub use error::TreeError;
pub use tree::{ConstituencyTree, TreeEdge, TreeNode};
