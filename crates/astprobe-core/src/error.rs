//! Error taxonomy for tree construction, encoding and comparison.

/// Errors raised by the tree algorithms.
///
/// `StructuralInvariant` means the input was not a well-formed tree (a bug
/// upstream), the other variants are usage errors the caller can act on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("structural invariant violated: {0}")]
    StructuralInvariant(String),
    #[error("alignment mismatch in {what}: expected {expected}, found {found}")]
    AlignmentMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("empty input: {0}")]
    EmptyInput(&'static str),
    #[error("token span {start}..{end} is not valid UTF-8 text in the source")]
    InvalidSpan { start: usize, end: usize },
    #[error("node {0} is not part of the tree")]
    UnknownNode(usize),
}

impl TreeError {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::StructuralInvariant(msg.into())
    }
}
