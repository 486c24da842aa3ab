//! TOML configuration.
//!
//! Every section and field has a default, so an empty file (or a missing
//! section) is valid. [`load_config`] parses and then validates ranges.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use analyst_copilot_core::profile::InferenceConfig;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub profiling: ProfilingConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeConfig {
    #[serde(default = "default_knowledge_path")]
    pub path: PathBuf,
    #[serde(default = "default_min_confidence", alias = "minConfidence")]
    pub min_confidence: f64,
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: default_knowledge_path(),
            min_confidence: default_min_confidence(),
            max_query_chars: default_max_query_chars(),
        }
    }
}

fn default_knowledge_path() -> PathBuf {
    PathBuf::from("data/knowledge_base.json")
}
fn default_min_confidence() -> f64 {
    analyst_copilot_core::matcher::DEFAULT_MIN_CONFIDENCE
}
fn default_max_query_chars() -> usize {
    analyst_copilot_core::router::DEFAULT_MAX_QUERY_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfilingConfig {
    #[serde(default = "default_type_success_fraction")]
    pub type_success_fraction: f64,
    #[serde(default = "default_categorical_max_distinct")]
    pub categorical_max_distinct: usize,
    #[serde(default = "default_categorical_max_ratio")]
    pub categorical_max_ratio: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            type_success_fraction: default_type_success_fraction(),
            categorical_max_distinct: default_categorical_max_distinct(),
            categorical_max_ratio: default_categorical_max_ratio(),
            top_k: default_top_k(),
        }
    }
}

fn default_type_success_fraction() -> f64 {
    0.95
}
fn default_categorical_max_distinct() -> usize {
    20
}
fn default_categorical_max_ratio() -> f64 {
    0.05
}
fn default_top_k() -> usize {
    10
}

impl ProfilingConfig {
    pub fn inference(&self) -> InferenceConfig {
        InferenceConfig {
            success_fraction: self.type_success_fraction,
            categorical_max_distinct: self.categorical_max_distinct,
            categorical_max_ratio: self.categorical_max_ratio,
            top_k: self.top_k,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_bytes() -> usize {
    16 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

impl Config {
    /// Resolve the knowledge base path relative to the config file's directory.
    pub fn resolve_paths(mut self, config_path: &Path) -> Self {
        if self.knowledge.path.is_relative() {
            if let Some(dir) = config_path.parent() {
                self.knowledge.path = dir.join(&self.knowledge.path);
            }
        }
        self
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    Ok(parse_config(&content)?.resolve_paths(path))
}

fn validate(config: &Config) -> Result<()> {
    // Validate knowledge
    if !(0.0..=1.0).contains(&config.knowledge.min_confidence) {
        anyhow::bail!("knowledge.min_confidence must be in [0.0, 1.0]");
    }
    if config.knowledge.max_query_chars == 0 {
        anyhow::bail!("knowledge.max_query_chars must be > 0");
    }

    // Validate profiling
    if !(0.0..=1.0).contains(&config.profiling.type_success_fraction) {
        anyhow::bail!("profiling.type_success_fraction must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&config.profiling.categorical_max_ratio) {
        anyhow::bail!("profiling.categorical_max_ratio must be in [0.0, 1.0]");
    }
    if config.profiling.top_k == 0 {
        anyhow::bail!("profiling.top_k must be >= 1");
    }

    // Validate upload
    if config.upload.max_bytes == 0 {
        anyhow::bail!("upload.max_bytes must be > 0");
    }

    Ok(())
}
