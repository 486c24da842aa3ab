//! Query routing: the single entry point for chat messages.
//!
//! When a dataset is loaded, a message is first classified against
//! [`ROUTE_RULES`], an ordered rule table. The first rule that fires decides
//! the dataset question being asked; if none fires (or no dataset is
//! loaded) the message goes to the knowledge base.
//!
//! ```text
//! message ──▶ classify ──▶ Dataset(intent) ──▶ profiler / aggregate ──▶ "dataset"
//!                 │
//!                 └──────▶ Knowledge ──▶ matcher ──┬──▶ "kb"   (score ≥ threshold)
//!                                                  └──▶ "none" (fallback text)
//! ```
//!
//! The current dataset lives in a [`DatasetContext`] handed to the router at
//! construction. Uploads build the new dataset and profile completely before
//! swapping a single `Arc`, so readers see either the old pair or the new
//! pair, never a mix.

use serde::Serialize;
use std::sync::{Arc, RwLock};

use crate::aggregate::{aggregate, column_stat, AggregateOp, ColumnStat, StatValue};
use crate::error::CoreError;
use crate::matcher::SimilarityMatcher;
use crate::profile::{format_number, summary_text, ColumnSpec, Dataset, DatasetProfiler, ProfileSummary, RawTable};
use crate::vectorize::{words, STOP_WORDS};

/// Reply when the knowledge base has no confident match.
pub const FALLBACK_TEXT: &str =
    "I do not have a confident answer yet. Try rephrasing or provide more detail.";

/// Reply to a blank message.
pub const EMPTY_MESSAGE_TEXT: &str = "Please enter a question to analyze.";

/// Default limit on question length, in characters.
pub const DEFAULT_MAX_QUERY_CHARS: usize = 2000;

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Kb,
    Dataset,
    None,
}

impl AnswerSource {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerSource::Kb => "kb",
            AnswerSource::Dataset => "dataset",
            AnswerSource::None => "none",
        }
    }
}

/// The payload handed back to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    /// Cosine score; set only for knowledge-base answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub source: AnswerSource,
}

impl Answer {
    fn none(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
            source: AnswerSource::None,
        }
    }

    fn dataset(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
            source: AnswerSource::Dataset,
        }
    }
}

// ============ Dataset context ============

/// A dataset together with the profile computed from it.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub name: Option<String>,
    pub dataset: Dataset,
    pub profile: ProfileSummary,
}

/// Holder of the current dataset. Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct DatasetContext {
    current: Arc<RwLock<Option<Arc<LoadedDataset>>>>,
}

impl DatasetContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current dataset, if any.
    pub fn current(&self) -> Option<Arc<LoadedDataset>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Swap in a fully built dataset and return the shared handle.
    pub fn replace(&self, loaded: LoadedDataset) -> Arc<LoadedDataset> {
        let loaded = Arc::new(loaded);
        let mut slot = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(loaded.clone());
        loaded
    }
}

// ============ Routing rules ============

/// A question about the loaded dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetIntent {
    Aggregate {
        group_by: String,
        target: String,
        op: AggregateOp,
    },
    ListColumns,
    RowCount,
    ColumnStat {
        column: String,
        stat: ColumnStat,
    },
    Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Dataset(DatasetIntent),
    Knowledge,
}

/// Condition a rule tests against the message.
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    /// `<op> [of] <target> by|per <group>`, e.g. "total revenue by region".
    GroupedAggregation,
    /// Any of the phrases appears as a whole-word sequence.
    Phrases(&'static [&'static str], Intent),
    /// A column is named together with a statistic keyword.
    ColumnStatistic,
}

/// Fixed-payload intents reachable from [`Trigger::Phrases`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ListColumns,
    RowCount,
    Summary,
}

#[derive(Debug, Clone, Copy)]
pub struct RouteRule {
    pub name: &'static str,
    pub trigger: Trigger,
}

/// Dataset routing rules, tried in order. First match wins.
pub const ROUTE_RULES: &[RouteRule] = &[
    RouteRule {
        name: "grouped_aggregation",
        trigger: Trigger::GroupedAggregation,
    },
    RouteRule {
        name: "column_list",
        trigger: Trigger::Phrases(&["column names", "columns", "fields", "headers"], Intent::ListColumns),
    },
    RouteRule {
        name: "row_count",
        trigger: Trigger::Phrases(&["row count", "rows", "records", "entries"], Intent::RowCount),
    },
    RouteRule {
        name: "column_statistic",
        trigger: Trigger::ColumnStatistic,
    },
    RouteRule {
        name: "summary",
        trigger: Trigger::Phrases(&["summary", "describe", "overview", "profile"], Intent::Summary),
    },
];

const GROUP_SEPARATORS: &[&str] = &["by", "per"];

const AGGREGATE_KEYWORDS: &[(&str, AggregateOp)] = &[
    ("sum", AggregateOp::Sum),
    ("total", AggregateOp::Sum),
    ("average", AggregateOp::Mean),
    ("mean", AggregateOp::Mean),
    ("avg", AggregateOp::Mean),
    ("count", AggregateOp::Count),
    ("how many", AggregateOp::Count),
    ("number of", AggregateOp::Count),
];

const STAT_KEYWORDS: &[(&str, ColumnStat)] = &[
    ("average", ColumnStat::Mean),
    ("mean", ColumnStat::Mean),
    ("avg", ColumnStat::Mean),
    ("median", ColumnStat::Median),
    ("sum", ColumnStat::Sum),
    ("total", ColumnStat::Sum),
    ("minimum", ColumnStat::Min),
    ("min", ColumnStat::Min),
    ("lowest", ColumnStat::Min),
    ("smallest", ColumnStat::Min),
    ("maximum", ColumnStat::Max),
    ("max", ColumnStat::Max),
    ("highest", ColumnStat::Max),
    ("largest", ColumnStat::Max),
    ("unique", ColumnStat::Distinct),
    ("distinct", ColumnStat::Distinct),
    ("missing", ColumnStat::Missing),
    ("null", ColumnStat::Missing),
    ("nulls", ColumnStat::Missing),
    ("na", ColumnStat::Missing),
    ("empty", ColumnStat::Missing),
    ("blank", ColumnStat::Missing),
    ("most common", ColumnStat::MostCommon),
    ("top values", ColumnStat::MostCommon),
    ("top value", ColumnStat::MostCommon),
    ("frequent", ColumnStat::MostCommon),
];

/// Position of the first whole-word occurrence of `phrase` in `message`.
fn find_phrase(message: &[String], phrase: &[String]) -> Option<usize> {
    if phrase.is_empty() || phrase.len() > message.len() {
        return None;
    }
    message.windows(phrase.len()).position(|w| w == phrase)
}

fn contains_phrase(message: &[String], phrase: &str) -> bool {
    find_phrase(message, &words(phrase)).is_some()
}

fn is_keyword(word: &str) -> bool {
    STAT_KEYWORDS
        .iter()
        .map(|(k, _)| *k)
        .chain(AGGREGATE_KEYWORDS.iter().map(|(k, _)| *k))
        .any(|k| k == word)
}

/// The column named in `message`, excluding `skip`.
///
/// A full, contiguous match of the column's words wins, longest first.
/// Failing that, any significant column word present in the message counts.
fn find_column<'a>(message: &[String], columns: &'a [ColumnSpec], skip: Option<&str>) -> Option<&'a ColumnSpec> {
    let candidates = move || columns.iter().filter(move |c| Some(c.name.as_str()) != skip);

    let mut best: Option<(&ColumnSpec, usize)> = None;
    for column in candidates() {
        let col_words = words(&column.name);
        if find_phrase(message, &col_words).is_some() {
            match best {
                Some((_, len)) if len >= col_words.len() => {}
                _ => best = Some((column, col_words.len())),
            }
        }
    }
    if let Some((column, _)) = best {
        return Some(column);
    }

    candidates().find(|column| {
        words(&column.name).iter().any(|w| {
            w.len() >= 3
                && !STOP_WORDS.contains(&w.as_str())
                && !is_keyword(w)
                && message.contains(w)
        })
    })
}

fn detect_aggregate_op(message: &[String]) -> Option<AggregateOp> {
    AGGREGATE_KEYWORDS
        .iter()
        .find(|(k, _)| contains_phrase(message, k))
        .map(|(_, op)| *op)
}

fn detect_stat(message: &[String]) -> Option<ColumnStat> {
    STAT_KEYWORDS
        .iter()
        .find(|(k, _)| contains_phrase(message, k))
        .map(|(_, stat)| *stat)
}

fn grouped_aggregation(message: &[String], columns: &[ColumnSpec]) -> Option<DatasetIntent> {
    let sep = message
        .iter()
        .position(|w| GROUP_SEPARATORS.contains(&w.as_str()))?;
    let (before, after) = (&message[..sep], &message[sep + 1..]);

    let op = detect_aggregate_op(before)?;
    let group = find_column(after, columns, None)?;
    let target = match find_column(before, columns, Some(&group.name)) {
        Some(target) => target.name.clone(),
        None if op == AggregateOp::Count => group.name.clone(),
        None => return None,
    };

    Some(DatasetIntent::Aggregate {
        group_by: group.name.clone(),
        target,
        op,
    })
}

impl Trigger {
    /// Evaluate against pre-split message words.
    pub fn evaluate(&self, message: &[String], columns: &[ColumnSpec]) -> Option<DatasetIntent> {
        match self {
            Trigger::GroupedAggregation => grouped_aggregation(message, columns),
            Trigger::Phrases(phrases, intent) => {
                if phrases.iter().any(|p| contains_phrase(message, p)) {
                    Some(match intent {
                        Intent::ListColumns => DatasetIntent::ListColumns,
                        Intent::RowCount => DatasetIntent::RowCount,
                        Intent::Summary => DatasetIntent::Summary,
                    })
                } else {
                    None
                }
            }
            Trigger::ColumnStatistic => {
                let stat = detect_stat(message)?;
                let column = find_column(message, columns, None)?;
                Some(DatasetIntent::ColumnStat {
                    column: column.name.clone(),
                    stat,
                })
            }
        }
    }
}

/// Decide where `message` goes. `columns` is `None` when no dataset is loaded.
pub fn classify(message: &str, columns: Option<&[ColumnSpec]>) -> Route {
    let Some(columns) = columns else {
        return Route::Knowledge;
    };
    let message_words = words(message);
    for rule in ROUTE_RULES {
        if let Some(intent) = rule.trigger.evaluate(&message_words, columns) {
            tracing::debug!(rule = rule.name, ?intent, "routed to dataset");
            return Route::Dataset(intent);
        }
    }
    Route::Knowledge
}

// ============ Router ============

fn sentence(message: &str) -> String {
    let mut chars = message.chars();
    let mut out: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => return String::new(),
    };
    if !out.ends_with('.') {
        out.push('.');
    }
    out
}

fn describe_stat(column: &str, stat: ColumnStat, value: StatValue) -> String {
    match (stat, value) {
        (ColumnStat::Distinct, StatValue::Count(n)) => format!("'{}' has {} unique values.", column, n),
        (ColumnStat::Missing, StatValue::Count(n)) => {
            format!("The column '{}' has {} missing values.", column, n)
        }
        (_, StatValue::Values(values)) => {
            let formatted: Vec<String> = values
                .iter()
                .map(|v| format!("{} ({})", v.value, v.count))
                .collect();
            format!("The most common values in '{}' are: {}.", column, formatted.join(", "))
        }
        (_, StatValue::Number(x)) => {
            format!("The {} of '{}' is {}.", stat.label(), column, format_number(x))
        }
        (_, StatValue::Count(n)) => format!("The {} of '{}' is {}.", stat.label(), column, n),
    }
}

/// Answers chat messages from the knowledge base or the current dataset.
#[derive(Debug, Clone)]
pub struct QueryRouter {
    matcher: Arc<SimilarityMatcher>,
    profiler: DatasetProfiler,
    datasets: DatasetContext,
    max_query_chars: usize,
}

impl QueryRouter {
    pub fn new(matcher: Arc<SimilarityMatcher>, profiler: DatasetProfiler, datasets: DatasetContext) -> Self {
        Self {
            matcher,
            profiler,
            datasets,
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
        }
    }

    pub fn with_max_query_chars(mut self, max_query_chars: usize) -> Self {
        self.max_query_chars = max_query_chars;
        self
    }

    pub fn matcher(&self) -> &SimilarityMatcher {
        &self.matcher
    }

    pub fn datasets(&self) -> &DatasetContext {
        &self.datasets
    }

    /// Profile `raw` and make it the current dataset.
    pub fn load_dataset(&self, raw: RawTable, name: Option<String>) -> Arc<LoadedDataset> {
        let (dataset, profile) = self.profiler.ingest(raw);
        self.datasets.replace(LoadedDataset {
            name,
            dataset,
            profile,
        })
    }

    /// Answer one chat message. Never fails; problems become answer text.
    pub fn answer(&self, message: &str) -> Answer {
        let message = message.trim();
        if message.is_empty() {
            return Answer::none(EMPTY_MESSAGE_TEXT);
        }

        if let Some(loaded) = self.datasets.current() {
            if let Route::Dataset(intent) = classify(message, Some(loaded.dataset.columns())) {
                return Answer::dataset(self.answer_dataset(&loaded, intent));
            }
        }

        self.answer_knowledge(message)
    }

    fn answer_knowledge(&self, message: &str) -> Answer {
        match self.matcher.match_text_bounded(message, self.max_query_chars) {
            Ok(result) => match result.entry {
                Some(entry) => Answer {
                    text: format!("[{}]\n{}", entry.topic_title(), entry.text),
                    confidence: Some(result.score),
                    source: AnswerSource::Kb,
                },
                None => {
                    tracing::debug!(score = result.score, "no confident knowledge match");
                    Answer::none(FALLBACK_TEXT)
                }
            },
            Err(e) => Answer::none(sentence(&e.to_string())),
        }
    }

    fn answer_dataset(&self, loaded: &LoadedDataset, intent: DatasetIntent) -> String {
        let dataset = &loaded.dataset;
        let top_k = self.profiler.config().top_k.min(3);

        let result: Result<String, CoreError> = match intent {
            DatasetIntent::ListColumns => {
                let names: Vec<&str> = dataset.columns().iter().map(|c| c.name.as_str()).collect();
                Ok(format!(
                    "The dataset contains {} columns: {}.",
                    names.len(),
                    names.join(", ")
                ))
            }
            DatasetIntent::RowCount => Ok(format!(
                "The dataset has {} rows and {} columns.",
                dataset.row_count(),
                dataset.column_count()
            )),
            DatasetIntent::Summary => Ok(summary_text(&loaded.profile)),
            DatasetIntent::ColumnStat { column, stat } => {
                column_stat(dataset, &column, stat, top_k).map(|v| describe_stat(&column, stat, v))
            }
            DatasetIntent::Aggregate { group_by, target, op } => {
                aggregate(dataset, &group_by, &target, op).map(|groups| {
                    let heading = match op {
                        AggregateOp::Count => format!("Row count by '{}'", group_by),
                        AggregateOp::Sum => format!("Total of '{}' by '{}'", target, group_by),
                        AggregateOp::Mean => format!("Average of '{}' by '{}'", target, group_by),
                    };
                    if groups.is_empty() {
                        return format!("{}: no numeric values to aggregate.", heading);
                    }
                    let lines: Vec<String> = groups
                        .iter()
                        .map(|(group, value)| format!("- {}: {}", group, format_number(*value)))
                        .collect();
                    format!("{}:\n{}", heading, lines.join("\n"))
                })
            }
        };

        result.unwrap_or_else(|e| sentence(&e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KnowledgeCorpus, KnowledgeEntry};

    fn specs(names: &[&str]) -> Vec<ColumnSpec> {
        let raw = RawTable::new(
            names.iter().map(|n| n.to_string()).collect(),
            vec![names.iter().map(|_| "1".to_string()).collect()],
        );
        DatasetProfiler::default().ingest(raw).0.columns().to_vec()
    }

    fn router() -> QueryRouter {
        let corpus = KnowledgeCorpus::new(vec![KnowledgeEntry::new(
            "1",
            "pivot_tables",
            "How do I create a pivot table in Excel",
        )])
        .unwrap();
        QueryRouter::new(
            Arc::new(SimilarityMatcher::new(corpus, 0.15)),
            DatasetProfiler::default(),
            DatasetContext::new(),
        )
    }

    fn sales_table() -> RawTable {
        RawTable::new(
            vec!["region".into(), "revenue".into()],
            vec![
                vec!["east".into(), "10".into()],
                vec!["east".into(), "5".into()],
                vec!["west".into(), "7".into()],
            ],
        )
    }

    #[test]
    fn test_classify_without_dataset_goes_to_knowledge() {
        assert_eq!(classify("average revenue", None), Route::Knowledge);
    }

    #[test]
    fn test_classify_grouped_aggregation() {
        let cols = specs(&["region", "revenue"]);
        assert_eq!(
            classify("What is the total revenue by region?", Some(&cols)),
            Route::Dataset(DatasetIntent::Aggregate {
                group_by: "region".into(),
                target: "revenue".into(),
                op: AggregateOp::Sum,
            })
        );
        assert_eq!(
            classify("how many orders per region", Some(&cols)),
            Route::Dataset(DatasetIntent::Aggregate {
                group_by: "region".into(),
                target: "region".into(),
                op: AggregateOp::Count,
            })
        );
    }

    #[test]
    fn test_classify_phrase_rules_in_order() {
        let cols = specs(&["region"]);
        assert_eq!(
            classify("list the column names", Some(&cols)),
            Route::Dataset(DatasetIntent::ListColumns)
        );
        assert_eq!(
            classify("how many rows are there", Some(&cols)),
            Route::Dataset(DatasetIntent::RowCount)
        );
        assert_eq!(
            classify("give me an overview", Some(&cols)),
            Route::Dataset(DatasetIntent::Summary)
        );
    }

    #[test]
    fn test_classify_column_statistic_with_multiword_column() {
        let cols = specs(&["unit", "unit_price"]);
        assert_eq!(
            classify("median unit price?", Some(&cols)),
            Route::Dataset(DatasetIntent::ColumnStat {
                column: "unit_price".into(),
                stat: ColumnStat::Median,
            })
        );
    }

    #[test]
    fn test_classify_column_without_stat_falls_back() {
        let cols = specs(&["date"]);
        assert_eq!(classify("how do I format a date in excel", Some(&cols)), Route::Knowledge);
    }

    #[test]
    fn test_answer_blank_message() {
        let answer = router().answer("   ");
        assert_eq!(answer.source, AnswerSource::None);
        assert_eq!(answer.text, EMPTY_MESSAGE_TEXT);
    }

    #[test]
    fn test_answer_knowledge_match() {
        let answer = router().answer("pivot table excel");
        assert_eq!(answer.source, AnswerSource::Kb);
        assert!(answer.text.starts_with("[Pivot Tables]\n"));
        assert!(answer.confidence.unwrap() > 0.15);
    }

    #[test]
    fn test_answer_unrelated_is_none() {
        let answer = router().answer("what's the weather tomorrow");
        assert_eq!(answer.source, AnswerSource::None);
        assert_eq!(answer.text, FALLBACK_TEXT);
        assert_eq!(answer.confidence, None);
    }

    #[test]
    fn test_answer_too_long_is_none() {
        let r = router().with_max_query_chars(10);
        let answer = r.answer("pivot table excel please");
        assert_eq!(answer.source, AnswerSource::None);
        assert!(answer.text.starts_with("Question is too long"));
    }

    #[test]
    fn test_answer_dataset_aggregate() {
        let r = router();
        r.load_dataset(sales_table(), Some("sales.csv".into()));
        let answer = r.answer("sum of revenue by region");
        assert_eq!(answer.source, AnswerSource::Dataset);
        assert_eq!(answer.text, "Total of 'revenue' by 'region':\n- east: 15\n- west: 7");
    }

    #[test]
    fn test_answer_dataset_invalid_aggregation_is_text() {
        let r = router();
        r.load_dataset(sales_table(), None);
        let answer = r.answer("average region");
        assert_eq!(answer.source, AnswerSource::Dataset);
        assert!(answer.text.contains("not numeric"));
    }

    #[test]
    fn test_knowledge_still_answers_with_dataset_loaded() {
        let r = router();
        r.load_dataset(sales_table(), None);
        assert_eq!(r.answer("pivot table excel").source, AnswerSource::Kb);
    }

    #[test]
    fn test_routers_do_not_share_datasets() {
        let a = router();
        let b = router();
        a.load_dataset(sales_table(), None);
        assert!(a.datasets().current().is_some());
        assert!(b.datasets().current().is_none());
    }

    #[test]
    fn test_replace_keeps_old_snapshot_intact() {
        let r = router();
        let first = r.load_dataset(sales_table(), Some("first".into()));
        let snapshot = r.datasets().current().unwrap();
        r.load_dataset(RawTable::new(vec!["x".into()], vec![]), Some("second".into()));

        assert_eq!(snapshot.name.as_deref(), Some("first"));
        assert_eq!(snapshot.dataset.row_count(), snapshot.profile.row_count);
        assert!(Arc::ptr_eq(&first, &snapshot));
        assert_eq!(r.datasets().current().unwrap().name.as_deref(), Some("second"));
    }
}
