//! # Analyst Copilot Core
//!
//! The retrieval-and-profiling engine behind Analyst Copilot: TF-IDF
//! vectorization, cosine similarity matching over a static knowledge
//! corpus, dataset type inference and statistics, and the rule-table
//! query router that decides which engine answers a chat message.
//!
//! This crate contains no tokio, HTTP, or filesystem I/O. Callers hand it
//! plain data (entries, raw tables, message strings) and render whatever
//! it returns.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Knowledge entries and the corpus |
//! | [`vectorize`] | Tokenizer, TF-IDF model, sparse term vectors |
//! | [`matcher`] | Cosine similarity matching with a confidence threshold |
//! | [`profile`] | Column type inference and summary statistics |
//! | [`aggregate`] | Group-by aggregations and per-column statistics |
//! | [`router`] | Routing rule table and the answer entry point |
//! | [`error`] | Core error taxonomy |

pub mod aggregate;
pub mod error;
pub mod matcher;
pub mod models;
pub mod profile;
pub mod router;
pub mod vectorize;

pub use error::CoreError;
pub use matcher::{MatchResult, SimilarityMatcher};
pub use models::{KnowledgeCorpus, KnowledgeEntry};
pub use profile::{ColumnSpec, ColumnType, Dataset, DatasetProfiler, ProfileSummary, RawTable};
pub use router::{Answer, AnswerSource, DatasetContext, LoadedDataset, QueryRouter};
