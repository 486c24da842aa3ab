//! Errors raised by the retrieval and profiling engines.
//!
//! A low-confidence match and an empty dataset are not errors: the first is
//! reported in-band as [`AnswerSource::None`](crate::router::AnswerSource::None),
//! the second as an empty [`ProfileSummary`](crate::profile::ProfileSummary).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Query text exceeds the configured character limit.
    #[error("question is too long ({len} characters, limit is {max})")]
    Vectorization { len: usize, max: usize },

    /// Unknown column, or a numeric operation over a non-numeric column.
    #[error("{0}")]
    InvalidAggregation(String),

    /// Duplicate or otherwise malformed knowledge entries.
    #[error("invalid knowledge corpus: {0}")]
    InvalidCorpus(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
