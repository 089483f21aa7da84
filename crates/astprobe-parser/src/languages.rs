//! Supported languages, their grammars and source preprocessing.

use crate::source::ParseError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Languages with a bundled tree-sitter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Go,
    Php,
    Java,
    Ruby,
    C,
    #[serde(alias = "c_sharp", alias = "c#")]
    CSharp,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::Python,
        Language::JavaScript,
        Language::Go,
        Language::Php,
        Language::Java,
        Language::Ruby,
        Language::C,
        Language::CSharp,
    ];

    /// Canonical tag, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Go => "go",
            Language::Php => "php",
            Language::Java => "java",
            Language::Ruby => "ruby",
            Language::C => "c",
            Language::CSharp => "csharp",
        }
    }

    pub fn ts_language(self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::Php => tree_sitter_php::LANGUAGE_PHP.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::Ruby => tree_sitter_ruby::LANGUAGE.into(),
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
        }
    }

    /// Make a snippet parseable on its own: Java method bodies need an
    /// enclosing class, PHP needs its open and close tags.
    pub fn wrap(self, code: &str) -> Cow<'_, str> {
        match self {
            Language::Java => Cow::Owned(format!("public class Main {{\n{code}\n}}")),
            Language::Php => {
                let mut wrapped = String::with_capacity(code.len() + 9);
                if !code.starts_with("<?php") {
                    wrapped.push_str("<?php\n");
                }
                wrapped.push_str(code);
                if !code.ends_with("?>") {
                    wrapped.push_str("\n?>");
                }
                if wrapped.len() == code.len() {
                    Cow::Borrowed(code)
                } else {
                    Cow::Owned(wrapped)
                }
            }
            _ => Cow::Borrowed(code),
        }
    }

    /// Node type the grammar emits for tokens that have no text of their own
    /// and must be dropped from the tree.
    pub fn phantom_token(self) -> Option<&'static str> {
        match self {
            Language::Go => Some("\n"),
            _ => None,
        }
    }

    /// Whether bare string statements act as documentation and are stripped
    /// along with comments.
    pub fn has_docstrings(self) -> bool {
        matches!(self, Language::Python)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" => Ok(Language::Python),
            "javascript" => Ok(Language::JavaScript),
            "go" => Ok(Language::Go),
            "php" => Ok(Language::Php),
            "java" => Ok(Language::Java),
            "ruby" => Ok(Language::Ruby),
            "c" => Ok(Language::C),
            "csharp" | "c_sharp" | "c#" => Ok(Language::CSharp),
            _ => Err(ParseError::UnknownLanguage(s.to_string())),
        }
    }
}
