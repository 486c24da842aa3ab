//! Knowledge base loading.
//!
//! The knowledge base is a JSON array of entries on disk. It is read once at
//! startup and indexed into an immutable [`SimilarityMatcher`].

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use analyst_copilot_core::{DatasetContext, DatasetProfiler, KnowledgeCorpus, QueryRouter, SimilarityMatcher};

use crate::config::Config;

/// Read and validate the knowledge base file.
pub fn load_corpus(path: &Path) -> Result<KnowledgeCorpus> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read knowledge base: {}", path.display()))?;
    let corpus = KnowledgeCorpus::from_json(&content)
        .with_context(|| format!("Invalid knowledge base: {}", path.display()))?;
    tracing::info!(path = %path.display(), entries = corpus.len(), "knowledge base loaded");
    Ok(corpus)
}

/// Load the configured knowledge base and build its matcher.
pub fn load_matcher(config: &Config) -> Result<SimilarityMatcher> {
    let corpus = load_corpus(&config.knowledge.path)?;
    Ok(SimilarityMatcher::new(corpus, config.knowledge.min_confidence))
}

/// Build a router with a fresh, empty dataset context.
pub fn build_router(config: &Config) -> Result<QueryRouter> {
    let matcher = load_matcher(config)?;
    Ok(QueryRouter::new(
        Arc::new(matcher),
        DatasetProfiler::new(config.profiling.inference()),
        DatasetContext::new(),
    )
    .with_max_query_chars(config.knowledge.max_query_chars))
}
