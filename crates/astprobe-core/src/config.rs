//! Configuration for parsing, encoding and binarization.
//!
//! Load order: `.astprobe/config.toml` → environment variables → defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub parsing: ParsingConfig,
    pub distance: DistanceConfig,
    pub binarize: BinarizeConfig,
}

/// Source normalization and parse-error policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Strip comments (and Python docstrings) before parsing.
    pub strip_comments: bool,
    /// Treat trees containing `ERROR` nodes as failures instead of returning them.
    pub reject_error_trees: bool,
}

/// Distance-matrix encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Soft limit on tokens per matrix; larger inputs are encoded with a warning.
    pub max_tokens: usize,
}

/// Which child a pure non-terminal promotes when binarizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadChoice {
    Leftmost,
    Rightmost,
}

/// Binarization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarizeConfig {
    /// Non-terminal type -> promoted child. Types not listed promote the leftmost child.
    ///
    /// Example:
    /// [binarize.head_rules]
    /// assignment = "rightmost"
    pub head_rules: BTreeMap<String, HeadChoice>,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            strip_comments: true,
            reject_error_trees: false,
        }
    }
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self { max_tokens: 512 }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl ProbeConfig {
    /// Load config from `.astprobe/config.toml` in the project root, with env var overrides.
    /// Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".astprobe").join("config.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        env_override(
            "ASTPROBE_STRIP_COMMENTS",
            &mut config.parsing.strip_comments,
        );
        env_override(
            "ASTPROBE_REJECT_ERRORS",
            &mut config.parsing.reject_error_trees,
        );
        env_override("ASTPROBE_MAX_TOKENS", &mut config.distance.max_tokens);

        if config.distance.max_tokens == 0 {
            anyhow::bail!("distance.max_tokens must be greater than zero");
        }

        Ok(config)
    }
}
