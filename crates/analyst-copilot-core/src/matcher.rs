//! Cosine similarity matching against the knowledge corpus.
//!
//! A [`SimilarityMatcher`] owns the corpus, the TF-IDF model built from it,
//! and the pre-computed corpus vectors. The three are created together and
//! never change; rebuilding means constructing a new matcher.
//!
//! Because every vector is L2-normalized, cosine similarity is the plain dot
//! product. Scores are clamped to `[0, 1]` to absorb rounding error.

use serde::Serialize;

use crate::error::Result;
use crate::models::{KnowledgeCorpus, KnowledgeEntry};
use crate::vectorize::{TermVector, VectorModel};

/// Default `min_confidence` threshold.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.15;

/// Outcome of one query. `entry` is `None` when nothing cleared the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub entry: Option<KnowledgeEntry>,
    pub score: f64,
}

/// Index of the best corpus vector and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch {
    pub index: Option<usize>,
    pub score: f64,
}

/// Cosine similarity of two term vectors.
///
/// Falls back to the full `dot / (|a| |b|)` form so it is also correct for
/// vectors that were not normalized. Zero vectors score 0.
pub fn cosine_similarity(a: &TermVector, b: &TermVector) -> f64 {
    let na = a.norm();
    let nb = b.norm();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (a.dot(b) / (na * nb)).clamp(0.0, 1.0)
}

/// Score `query` against every corpus vector and keep the best.
///
/// Ties go to the earliest index. A best score below `threshold`, or a best
/// score of exactly zero, reports `index: None` while still carrying the
/// score. An empty corpus yields `{None, 0.0}`.
pub fn best_match(query: &TermVector, corpus_vectors: &[TermVector], threshold: f64) -> BestMatch {
    let mut best_index: Option<usize> = None;
    let mut best_score = 0.0f64;

    for (i, doc) in corpus_vectors.iter().enumerate() {
        let score = query.dot(doc).clamp(0.0, 1.0);
        if best_index.is_none() || score > best_score {
            best_index = Some(i);
            best_score = score;
        }
    }

    if best_score <= 0.0 || best_score < threshold {
        return BestMatch {
            index: None,
            score: best_score,
        };
    }

    BestMatch {
        index: best_index,
        score: best_score,
    }
}

/// Knowledge-base matcher: corpus + model + corpus vectors.
#[derive(Debug, Clone)]
pub struct SimilarityMatcher {
    corpus: KnowledgeCorpus,
    model: VectorModel,
    vectors: Vec<TermVector>,
    threshold: f64,
}

impl SimilarityMatcher {
    /// Build the model and vectorize every entry.
    pub fn new(corpus: KnowledgeCorpus, threshold: f64) -> Self {
        let documents = corpus.documents();
        let model = VectorModel::build(&documents);
        let vectors: Vec<TermVector> = documents.iter().map(|d| model.vectorize(d)).collect();

        tracing::debug!(
            entries = corpus.len(),
            vocabulary = model.vocabulary_size(),
            threshold,
            "similarity matcher ready"
        );

        Self {
            corpus,
            model,
            vectors,
            threshold,
        }
    }

    pub fn corpus(&self) -> &KnowledgeCorpus {
        &self.corpus
    }

    pub fn model(&self) -> &VectorModel {
        &self.model
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Match an already-vectorized query.
    pub fn match_vector(&self, query: &TermVector) -> MatchResult {
        let best = best_match(query, &self.vectors, self.threshold);
        MatchResult {
            entry: best.index.and_then(|i| self.corpus.get(i)).cloned(),
            score: best.score,
        }
    }

    /// Vectorize `text` and match it.
    pub fn match_text(&self, text: &str) -> MatchResult {
        self.match_vector(&self.model.vectorize(text))
    }

    /// Like [`match_text`](Self::match_text), rejecting text over `max_chars`.
    pub fn match_text_bounded(&self, text: &str, max_chars: usize) -> Result<MatchResult> {
        let query = self.model.vectorize_bounded(text, max_chars)?;
        Ok(self.match_vector(&query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn vector(pairs: &[(&str, f64)]) -> TermVector {
        TermVector::from_weights(
            pairs
                .iter()
                .map(|(t, w)| (t.to_string(), *w))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn corpus() -> KnowledgeCorpus {
        KnowledgeCorpus::new(vec![
            KnowledgeEntry::new("1", "pivot_tables", "How do I create a pivot table in Excel"),
            KnowledgeEntry::new("2", "sql_windows", "Use window functions like ROW_NUMBER and LAG in SQL"),
            KnowledgeEntry::new("3", "tableau_lod", "Level of detail expressions in Tableau"),
        ])
        .unwrap()
    }

    #[test]
    fn test_best_match_empty_corpus() {
        let q = vector(&[("x", 1.0)]);
        let best = best_match(&q, &[], 0.15);
        assert_eq!(best.index, None);
        assert_eq!(best.score, 0.0);
    }

    #[test]
    fn test_best_match_ties_go_to_earliest() {
        let q = vector(&[("a", 1.0)]);
        let docs = vec![vector(&[("b", 1.0)]), vector(&[("a", 1.0)]), vector(&[("a", 1.0)])];
        let best = best_match(&q, &docs, 0.15);
        assert_eq!(best.index, Some(1));
        assert!((best.score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_below_threshold_keeps_score() {
        let q = vector(&[("a", 0.6), ("b", 0.8)]);
        let docs = vec![vector(&[("a", 1.0)])];
        let best = best_match(&q, &docs, 0.7);
        assert_eq!(best.index, None);
        assert!((best.score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_zero_score_never_matches() {
        let q = TermVector::default();
        let docs = vec![vector(&[("a", 1.0)])];
        let best = best_match(&q, &docs, 0.0);
        assert_eq!(best.index, None);
        assert_eq!(best.score, 0.0);
    }

    #[test]
    fn test_cosine_similarity_unnormalized() {
        let a = vector(&[("x", 3.0), ("y", 4.0)]);
        let b = vector(&[("x", 6.0), ("y", 8.0)]);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&a, &TermVector::default()), 0.0);
    }

    #[test]
    fn test_matcher_finds_relevant_entry() {
        let matcher = SimilarityMatcher::new(corpus(), DEFAULT_MIN_CONFIDENCE);
        let result = matcher.match_text("window functions in sql");
        assert_eq!(result.entry.unwrap().id, "2");
        assert!(result.score > DEFAULT_MIN_CONFIDENCE);
    }

    #[test]
    fn test_matcher_unrelated_query_has_no_entry() {
        let matcher = SimilarityMatcher::new(corpus(), DEFAULT_MIN_CONFIDENCE);
        let result = matcher.match_text("weather forecast tomorrow");
        assert!(result.entry.is_none());
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_match_text_bounded() {
        let matcher = SimilarityMatcher::new(corpus(), DEFAULT_MIN_CONFIDENCE);
        assert!(matcher.match_text_bounded("pivot table", 3).is_err());
        assert!(matcher.match_text_bounded("pivot table", 100).is_ok());
    }
}
