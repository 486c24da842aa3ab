//! TF-IDF vectorization.
//!
//! [`VectorModel::build`] computes smoothed inverse document frequencies over
//! a corpus; [`VectorModel::vectorize`] turns any text into an L2-normalized
//! sparse [`TermVector`] using those weights.
//!
//! # Weighting
//!
//! ```text
//! idf(t) = ln((1 + N) / (1 + df(t))) + 1
//! w(t)   = tf(t, text) * idf(t)
//! v      = w / ||w||₂          (skipped when ||w|| = 0)
//! ```
//!
//! Terms that never appeared in the corpus carry no weight and are dropped.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{CoreError, Result};

/// English stop words removed before weighting.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
    "been", "being", "but", "by", "can", "could", "did", "do", "does", "doing", "for", "from",
    "had", "has", "have", "having", "he", "her", "here", "his", "how", "i", "if", "in", "into",
    "is", "it", "its", "me", "my", "no", "not", "of", "on", "or", "our", "out", "she", "should",
    "so", "some", "than", "that", "the", "their", "them", "then", "there", "these", "they",
    "this", "those", "to", "too", "up", "us", "very", "was", "we", "were", "what", "when",
    "where", "which", "while", "who", "why", "will", "with", "would", "you", "your",
];

/// Lower-case and split on non-alphanumeric boundaries. Stop words are kept.
pub fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

/// [`words`] with stop words removed: the terms that enter the model.
pub fn tokenize(text: &str) -> Vec<String> {
    words(text)
        .into_iter()
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Sparse term → weight mapping.
///
/// Backed by a `BTreeMap` so iteration, and therefore every dot product,
/// runs in a fixed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TermVector {
    weights: BTreeMap<String, f64>,
}

impl TermVector {
    pub fn from_weights(weights: BTreeMap<String, f64>) -> Self {
        Self { weights }
    }

    pub fn get(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// True when every weight is zero (or there are none).
    pub fn is_zero(&self) -> bool {
        self.weights.values().all(|w| *w == 0.0)
    }

    pub fn norm(&self) -> f64 {
        self.weights.values().map(|w| w * w).sum::<f64>().sqrt()
    }

    /// Sum of products over shared terms.
    pub fn dot(&self, other: &TermVector) -> f64 {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .weights
            .iter()
            .filter_map(|(term, w)| large.weights.get(term).map(|o| w * o))
            .sum()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(t, w)| (t.as_str(), *w))
    }
}

/// Immutable TF-IDF model: the vocabulary and its idf weights.
#[derive(Debug, Clone, Default)]
pub struct VectorModel {
    idf: HashMap<String, f64>,
    doc_count: usize,
}

impl VectorModel {
    /// Compute idf weights over `corpus`, one string per document.
    pub fn build<S: AsRef<str>>(corpus: &[S]) -> Self {
        let n = corpus.len();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in corpus {
            let unique: BTreeSet<String> = tokenize(doc.as_ref()).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let idf = doc_freq
            .into_iter()
            .map(|(term, df)| {
                let weight = ((1.0 + n as f64) / (1.0 + df as f64)).ln() + 1.0;
                (term, weight)
            })
            .collect::<HashMap<_, _>>();

        tracing::debug!(documents = n, vocabulary = idf.len(), "built tf-idf model");

        Self { idf, doc_count: n }
    }

    /// Inverse document frequency of `term`, if it is in the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    /// Weight `text` against the model and L2-normalize it.
    ///
    /// Empty, all-stop-word, or fully out-of-vocabulary text yields the
    /// zero vector.
    pub fn vectorize(&self, text: &str) -> TermVector {
        let mut tf: BTreeMap<String, f64> = BTreeMap::new();
        for term in tokenize(text) {
            if self.idf.contains_key(&term) {
                *tf.entry(term).or_insert(0.0) += 1.0;
            }
        }

        let mut weights: BTreeMap<String, f64> = tf
            .into_iter()
            .map(|(term, count)| {
                let idf = self.idf[&term];
                (term, count * idf)
            })
            .collect();

        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for w in weights.values_mut() {
                *w /= norm;
            }
        }

        TermVector::from_weights(weights)
    }

    /// [`vectorize`](Self::vectorize) with an input-size limit in characters.
    pub fn vectorize_bounded(&self, text: &str, max_chars: usize) -> Result<TermVector> {
        let len = text.chars().count();
        if len > max_chars {
            return Err(CoreError::Vectorization { len, max: max_chars });
        }
        Ok(self.vectorize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_drops_stop_words() {
        let tokens = tokenize("How do I create a Pivot-Table in EXCEL?");
        assert_eq!(tokens, vec!["create", "pivot", "table", "excel"]);
    }

    #[test]
    fn test_words_keeps_stop_words() {
        assert_eq!(words("Sum of revenue_by"), vec!["sum", "of", "revenue", "by"]);
    }

    #[test]
    fn test_idf_of_identical_documents_is_one() {
        let corpus = vec!["excel"; 5];
        let model = VectorModel::build(&corpus);
        assert!((model.idf("excel").unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(model.doc_count(), 5);
    }

    #[test]
    fn test_idf_rewards_rare_terms() {
        let model = VectorModel::build(&["excel pivot", "excel vlookup", "excel charts"]);
        let common = model.idf("excel").unwrap();
        let rare = model.idf("pivot").unwrap();
        assert!(rare > common);
        let expected = (4.0f64 / 2.0).ln() + 1.0;
        assert!((rare - expected).abs() < 1e-12);
    }

    #[test]
    fn test_vectorize_is_unit_length() {
        let model = VectorModel::build(&["pivot table excel", "sql window functions"]);
        let v = model.vectorize("pivot table pivot");
        assert!((v.norm() - 1.0).abs() < 1e-9);
        assert!(v.get("pivot") > v.get("table"));
    }

    #[test]
    fn test_out_of_vocabulary_terms_dropped() {
        let model = VectorModel::build(&["pivot table"]);
        let v = model.vectorize("pivot quantum");
        assert_eq!(v.len(), 1);
        assert_eq!(v.get("quantum"), 0.0);
    }

    #[test]
    fn test_stop_words_only_is_zero_vector() {
        let model = VectorModel::build(&["pivot table"]);
        let v = model.vectorize("the and of to");
        assert!(v.is_zero());
        assert_eq!(v.norm(), 0.0);
    }

    #[test]
    fn test_empty_corpus_model() {
        let model = VectorModel::build::<&str>(&[]);
        assert_eq!(model.vocabulary_size(), 0);
        assert!(model.vectorize("anything at all").is_zero());
    }

    #[test]
    fn test_vectorize_bounded_rejects_long_input() {
        let model = VectorModel::build(&["pivot"]);
        let err = model.vectorize_bounded("pivot pivot", 5).unwrap_err();
        assert_eq!(err, CoreError::Vectorization { len: 11, max: 5 });
        assert!(model.vectorize_bounded("pivot", 5).is_ok());
    }

    #[test]
    fn test_dot_of_identical_vectors_is_one() {
        let model = VectorModel::build(&["sql joins", "sql window"]);
        let a = model.vectorize("sql joins");
        assert!((a.dot(&a) - 1.0).abs() < 1e-9);
    }
}
