//! Tree-sitter front end for astprobe.
//!
//! Supports Python, JavaScript, Go, PHP, Java, Ruby, C and C#. Source code is
//! normalized (comments and docstrings removed), parsed with the language's
//! grammar and turned into an [`astprobe_core::ConstituencyTree`] with string
//! literals collapsed to single tokens.

pub mod languages;
pub mod normalize;
pub mod source;
pub mod treesitter;

pub use languages::Language;
pub use source::{ParseError, ParsedSource, SourceParser, parse_batch};
