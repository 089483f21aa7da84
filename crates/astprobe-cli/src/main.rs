//! CLI binary for astprobe: tokens, dependency trees, distance matrices and
//! tree comparison for source code.

use anyhow::{Context, Result};
use astprobe_core::compare::{spearman_rows, uas};
use astprobe_core::config::ProbeConfig;
use astprobe_core::distance::DistanceCodec;
use astprobe_core::simplify::{PromotionRules, binarize};
use astprobe_core::{DependencyTree, from_distance_matrix};
use astprobe_parser::{Language, ParsedSource, SourceParser};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "astprobe", about = "Syntax trees and tree distances for source code")]
struct Cli {
    /// Project root holding .astprobe/config.toml (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tokens of a source unit with their constituency depths
    Tokens {
        /// Language tag: python, javascript, go, php, java, ruby, c, csharp
        #[arg(short, long)]
        lang: String,

        /// Source file, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,
    },

    /// Print the head of every token in the dependency tree
    Deps {
        #[arg(short, long)]
        lang: String,

        #[arg(default_value = "-")]
        input: String,
    },

    /// Print the token distance matrix of a tree
    Distance {
        #[arg(short, long)]
        lang: String,

        /// Which tree to measure distances on
        #[arg(short, long, value_enum, default_value = "dependency")]
        tree: TreeKind,

        #[arg(default_value = "-")]
        input: String,
    },

    /// Print the edges of the binarized constituency tree
    Binarize {
        #[arg(short, long)]
        lang: String,

        #[arg(default_value = "-")]
        input: String,
    },

    /// Score a predicted distance matrix against the gold dependency tree
    Compare {
        #[arg(short, long)]
        lang: String,

        /// JSON file with a square matrix of predicted distances
        /// (defaults to the gold distances)
        #[arg(long)]
        predicted: Option<PathBuf>,

        #[arg(default_value = "-")]
        input: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TreeKind {
    Constituency,
    Dependency,
}

#[derive(Serialize)]
struct TokensReport {
    language: Language,
    tokens: Vec<String>,
    depths: Vec<usize>,
}

#[derive(Serialize)]
struct DepsReport {
    language: Language,
    tokens: Vec<String>,
    heads: Vec<Option<usize>>,
}

#[derive(Serialize)]
struct BinaryEdge {
    head: usize,
    dependent: usize,
    label: Option<String>,
}

#[derive(Serialize)]
struct BinarizeReport {
    language: Language,
    tokens: Vec<String>,
    root: usize,
    edges: Vec<BinaryEdge>,
}

#[derive(Serialize)]
struct CompareReport {
    language: Language,
    tokens: usize,
    uas: f64,
    spearman: Vec<Option<f64>>,
    mean_spearman: Option<f64>,
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.project {
        Some(p) => Ok(p.clone()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_root = get_project_root(&cli)?;
    let config = ProbeConfig::load(&project_root)
        .with_context(|| format!("failed to load config under {}", project_root.display()))?;

    match cli.command {
        Commands::Tokens { lang, input } => cmd_tokens(&config, &lang, &input),
        Commands::Deps { lang, input } => cmd_deps(&config, &lang, &input),
        Commands::Distance { lang, tree, input } => cmd_distance(&config, &lang, tree, &input),
        Commands::Binarize { lang, input } => cmd_binarize(&config, &lang, &input),
        Commands::Compare {
            lang,
            predicted,
            input,
        } => cmd_compare(&config, &lang, predicted.as_deref(), &input),
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {}", input))
    }
}

fn parse_input(config: &ProbeConfig, lang: &str, input: &str) -> Result<ParsedSource> {
    let language: Language = lang.parse()?;
    let code = read_input(input)?;
    let mut parser = SourceParser::new(language, config.parsing.clone())?;
    let parsed = parser
        .parse(&code)
        .with_context(|| format!("failed to parse {} as {}", input, language))?;
    Ok(parsed)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_tokens(config: &ProbeConfig, lang: &str, input: &str) -> Result<()> {
    let parsed = parse_input(config, lang, input)?;
    let (depths, tokens) = parsed.depths_and_tokens()?;
    print_json(&TokensReport {
        language: parsed.language,
        tokens,
        depths,
    })
}

fn cmd_deps(config: &ProbeConfig, lang: &str, input: &str) -> Result<()> {
    let parsed = parse_input(config, lang, input)?;
    let deps = parsed.dependency_tree()?;
    print_json(&DepsReport {
        language: parsed.language,
        tokens: deps.tokens(&parsed.code)?,
        heads: deps.head_positions(),
    })
}

fn cmd_distance(config: &ProbeConfig, lang: &str, tree: TreeKind, input: &str) -> Result<()> {
    let parsed = parse_input(config, lang, input)?;
    let codec = DistanceCodec::new(config.distance.clone());
    let matrix = match tree {
        TreeKind::Constituency => codec.encode(&parsed.tree, &parsed.code)?,
        TreeKind::Dependency => codec.encode(&parsed.dependency_tree()?, &parsed.code)?,
    };
    print_json(&matrix)
}

fn cmd_binarize(config: &ProbeConfig, lang: &str, input: &str) -> Result<()> {
    let parsed = parse_input(config, lang, input)?;
    let rules = PromotionRules::from_config(&config.binarize);
    let binary = binarize(&parsed.tree, Some(&rules))?;

    let position: HashMap<usize, usize> = binary
        .terminals()
        .iter()
        .enumerate()
        .map(|(i, n)| (n.index(), i))
        .collect();
    let edges = binary
        .edge_list()
        .into_iter()
        .filter_map(|(head, dependent, label)| {
            Some(BinaryEdge {
                head: *position.get(&head)?,
                dependent: *position.get(&dependent)?,
                label,
            })
        })
        .collect();
    let root = position
        .get(&binary.root()?.index())
        .copied()
        .context("binarized root is not a token")?;

    print_json(&BinarizeReport {
        language: parsed.language,
        tokens: binary.tokens(&parsed.code)?,
        root,
        edges,
    })
}

fn load_predicted(path: &Path) -> Result<Vec<Vec<f64>>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON matrix of numbers", path.display()))
}

fn cmd_compare(config: &ProbeConfig, lang: &str, predicted: Option<&Path>, input: &str) -> Result<()> {
    let parsed = parse_input(config, lang, input)?;
    let deps: DependencyTree = parsed.dependency_tree()?;
    let gold = DistanceCodec::new(config.distance.clone()).encode(&deps, &parsed.code)?;

    let predicted = match predicted {
        Some(path) => load_predicted(path)?,
        None => gold
            .distances
            .iter()
            .map(|row| row.iter().map(|&d| f64::from(d)).collect())
            .collect(),
    };
    let reconstructed = from_distance_matrix(&predicted, &gold.tokens)?;
    let score = uas(&deps, &reconstructed)?;
    let spearman = spearman_rows(&gold.distances, &predicted)?;
    let defined: Vec<f64> = spearman.iter().flatten().copied().collect();
    let mean_spearman = if defined.is_empty() {
        None
    } else {
        Some(defined.iter().sum::<f64>() / defined.len() as f64)
    };

    tracing::info!(uas = score, tokens = gold.len(), "compared trees");
    print_json(&CompareReport {
        language: parsed.language,
        tokens: gold.len(),
        uas: score,
        spearman,
        mean_spearman,
    })
}
