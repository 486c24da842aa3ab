//! Knowledge entries and the in-memory corpus they live in.
//!
//! The corpus is loaded once and never mutated afterwards. Entry IDs are
//! unique; [`KnowledgeCorpus::new`] rejects duplicates.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::error::{CoreError, Result};

/// One curated answer in the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Unique identifier. Numeric IDs in the source file are kept as strings.
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    /// Short topic label, e.g. `pivot_tables`.
    pub topic: String,
    /// The answer text returned to the user. Also accepted as `answer`.
    #[serde(alias = "answer")]
    pub text: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Example phrasings of the question. Indexed, never displayed.
    #[serde(default)]
    pub questions: Vec<String>,
}

impl KnowledgeEntry {
    pub fn new(id: impl Into<String>, topic: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            text: text.into(),
            tags: BTreeSet::new(),
            questions: Vec::new(),
        }
    }

    /// The text that represents this entry in the TF-IDF index.
    pub fn document_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3 + self.questions.len() + self.tags.len());
        parts.push(&self.topic);
        parts.extend(self.questions.iter().map(String::as_str));
        parts.push(&self.text);
        parts.extend(self.tags.iter().map(String::as_str));
        parts.join(" ")
    }

    /// Topic rendered as a title: `pivot_tables` → `Pivot Tables`.
    pub fn topic_title(&self) -> String {
        self.topic
            .split(|c: char| c == '_' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
    })
}

/// Ordered, read-only collection of knowledge entries.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeCorpus {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeCorpus {
    /// Build a corpus, rejecting empty or duplicate IDs.
    pub fn new(entries: Vec<KnowledgeEntry>) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        for entry in &entries {
            if entry.id.trim().is_empty() {
                return Err(CoreError::InvalidCorpus(format!(
                    "entry with topic '{}' has an empty id",
                    entry.topic
                )));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(CoreError::InvalidCorpus(format!(
                    "duplicate entry id '{}'",
                    entry.id
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Parse a JSON array of entries.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<KnowledgeEntry> =
            serde_json::from_str(json).map_err(|e| CoreError::InvalidCorpus(e.to_string()))?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&KnowledgeEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index documents, one per entry, in corpus order.
    pub fn documents(&self) -> Vec<String> {
        self.entries.iter().map(KnowledgeEntry::document_text).collect()
    }
}
