//! Source-to-tree pipeline: wrap, normalize, parse, build, clean up.

use crate::languages::Language;
use crate::normalize::strip_comments;
use crate::treesitter::{TsNode, new_parser, parse_source};
use astprobe_core::collapse::{collapse_strings, remove_phantom_tokens};
use astprobe_core::config::ParsingConfig;
use astprobe_core::tree::ERROR_NODE_TYPE;
use astprobe_core::{ConstituencyTree, DependencyTree, TreeError, build};
use rayon::prelude::*;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{language} source has {error_nodes} syntax error node(s)")]
    SyntaxError { language: Language, error_nodes: usize },
    #[error("failed to load tree-sitter grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
    #[error("tree-sitter returned no tree for {language} source")]
    NoTree { language: Language },
    #[error("unknown language tag `{0}`")]
    UnknownLanguage(String),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// A constituency tree together with the exact text its byte offsets refer
/// to (after wrapping and comment removal).
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub language: Language,
    pub code: String,
    pub tree: ConstituencyTree,
}

impl ParsedSource {
    pub fn tokens(&self) -> Result<Vec<String>, TreeError> {
        self.tree.tokens(&self.code)
    }

    pub fn depths_and_tokens(&self) -> Result<(Vec<usize>, Vec<String>), TreeError> {
        self.tree.depths_and_tokens(&self.code)
    }

    pub fn dependency_tree(&self) -> Result<DependencyTree, TreeError> {
        DependencyTree::extract(&self.tree)
    }
}

/// One tree-sitter parser bound to a language. Not shareable across threads;
/// give each worker its own.
pub struct SourceParser {
    language: Language,
    parser: tree_sitter::Parser,
    config: ParsingConfig,
}

impl std::fmt::Debug for SourceParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceParser")
            .field("language", &self.language)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SourceParser {
    pub fn new(language: Language, config: ParsingConfig) -> Result<Self, ParseError> {
        Ok(Self {
            language,
            parser: new_parser(language)?,
            config,
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Parse `code` into a constituency tree.
    ///
    /// Trees containing `ERROR` nodes are returned with a warning unless the
    /// parser is configured to reject them.
    pub fn parse(&mut self, code: &str) -> Result<ParsedSource, ParseError> {
        let language = self.language;
        let wrapped = language.wrap(code);
        let text = if self.config.strip_comments {
            strip_comments(&mut self.parser, language, &wrapped)?
        } else {
            wrapped.into_owned()
        };

        let ts_tree = parse_source(&mut self.parser, language, &text)?;
        let mut tree = build(&TsNode(ts_tree.root_node()));
        if let Some(phantom) = language.phantom_token() {
            let removed = remove_phantom_tokens(&mut tree, phantom);
            tracing::debug!(%language, removed, "removed phantom tokens");
        }
        collapse_strings(&mut tree);

        if tree.has_error() {
            let error_nodes = tree
                .node_ids()
                .into_iter()
                .filter(|&n| tree.node(n).is_some_and(|node| node.node_type == ERROR_NODE_TYPE))
                .count();
            if self.config.reject_error_trees {
                return Err(ParseError::SyntaxError { language, error_nodes });
            }
            tracing::warn!(%language, error_nodes, "parse tree contains syntax errors");
        }

        Ok(ParsedSource { language, code: text, tree })
    }
}

/// Parse many source units in parallel, one tree-sitter parser per worker.
/// Results keep the order of `codes`.
pub fn parse_batch<S>(
    language: Language,
    config: &ParsingConfig,
    codes: &[S],
) -> Result<Vec<Result<ParsedSource, ParseError>>, ParseError>
where
    S: AsRef<str> + Sync,
{
    // Fail once up front if the grammar cannot be loaded.
    SourceParser::new(language, config.clone())?;

    let results: Vec<Result<ParsedSource, ParseError>> = codes
        .par_iter()
        .map_init(
            || SourceParser::new(language, config.clone()).ok(),
            |parser, code| match parser.as_mut() {
                Some(parser) => parser.parse(code.as_ref()),
                None => Err(ParseError::NoTree { language }),
            },
        )
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    tracing::info!(%language, total = codes.len(), failed, "parsed batch");
    Ok(results)
}
