//! One-shot CLI commands: `ask`, `profile` and `stats`.
//!
//! Each command has a function returning structured data (used by tests)
//! and a `run_*` wrapper that prints it.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use analyst_copilot_core::profile::summary_text;
use analyst_copilot_core::{Answer, AnswerSource, ProfileSummary};

use crate::config::Config;
use crate::knowledge::{build_router, load_matcher};
use crate::tabular::read_table_file;

/// Answer a single question, optionally against a dataset file.
pub fn ask(config: &Config, question: &str, dataset: Option<&Path>) -> Result<Answer> {
    let router = build_router(config)?;
    if let Some(path) = dataset {
        let raw = read_table_file(path)?;
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        router.load_dataset(raw, name);
    }
    Ok(router.answer(question))
}

/// Render an answer the way a chat front end shows it.
pub fn render_answer(answer: &Answer) -> String {
    match (answer.source, answer.confidence) {
        (AnswerSource::Dataset, _) => format!("Dataset insight: {}", answer.text),
        (_, Some(score)) => format!("{}\n(confidence: {:.0}%)", answer.text, score * 100.0),
        _ => answer.text.clone(),
    }
}

pub fn run_ask(config: &Config, question: &str, dataset: Option<&Path>) -> Result<()> {
    let answer = ask(config, question, dataset)?;
    println!("{}", render_answer(&answer));
    Ok(())
}

/// Parse and profile a CSV/XLSX file.
pub fn profile(config: &Config, path: &Path) -> Result<ProfileSummary> {
    let raw = read_table_file(path)?;
    let profiler = analyst_copilot_core::DatasetProfiler::new(config.profiling.inference());
    let (_, summary) = profiler.ingest(raw);
    Ok(summary)
}

pub fn run_profile(config: &Config, path: &Path, json: bool) -> Result<()> {
    let summary = profile(config, path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary_text(&summary));
    }
    Ok(())
}

/// Knowledge index statistics.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeStats {
    pub entries: usize,
    pub vocabulary: usize,
    pub threshold: f64,
}

pub fn stats(config: &Config) -> Result<KnowledgeStats> {
    let matcher = load_matcher(config)?;
    Ok(KnowledgeStats {
        entries: matcher.corpus().len(),
        vocabulary: matcher.model().vocabulary_size(),
        threshold: matcher.threshold(),
    })
}

pub fn run_stats(config: &Config) -> Result<()> {
    let stats = stats(config)?;
    println!("Knowledge base: {}", config.knowledge.path.display());
    println!("  entries:    {}", stats.entries);
    println!("  vocabulary: {}", stats.vocabulary);
    println!("  threshold:  {}", stats.threshold);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> Config {
        std::fs::write(
            dir.join("kb.json"),
            r#"[
                {"id": 1, "topic": "pivot_tables", "text": "Use Insert > PivotTable in Excel.", "questions": ["How do I create a pivot table in Excel?"]},
                {"id": 2, "topic": "sql_joins", "text": "A LEFT JOIN keeps every row of the left table.", "tags": ["sql"]}
            ]"#,
        )
        .unwrap();
        let mut config = Config::default();
        config.knowledge.path = dir.join("kb.json");
        config
    }

    #[test]
    fn stats_reports_corpus_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let stats = stats(&config_in(tmp.path())).unwrap();
        assert_eq!(stats.entries, 2);
        assert!(stats.vocabulary > 5);
        assert_eq!(stats.threshold, 0.15);
    }

    #[test]
    fn ask_with_dataset_answers_from_dataset() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = config_in(tmp.path());
        let csv = tmp.path().join("sales.csv");
        std::fs::write(&csv, "region,revenue\neast,10\neast,5\nwest,7\n").unwrap();

        let answer = ask(&config, "total revenue by region", Some(&csv)).unwrap();
        assert_eq!(answer.source, AnswerSource::Dataset);
        assert!(answer.text.contains("east: 15"), "{}", answer.text);

        let answer = ask(&config, "how do I create a pivot table", None).unwrap();
        assert_eq!(answer.source, AnswerSource::Kb);
    }

    #[test]
    fn render_answer_by_source() {
        let kb = Answer {
            text: "[Pivot Tables]\nUse Insert.".into(),
            confidence: Some(0.734),
            source: AnswerSource::Kb,
        };
        assert_eq!(render_answer(&kb), "[Pivot Tables]\nUse Insert.\n(confidence: 73%)");

        let dataset = Answer {
            text: "The dataset has 3 rows and 2 columns.".into(),
            confidence: None,
            source: AnswerSource::Dataset,
        };
        assert_eq!(render_answer(&dataset), "Dataset insight: The dataset has 3 rows and 2 columns.");

        let none = Answer {
            text: "nothing".into(),
            confidence: None,
            source: AnswerSource::None,
        };
        assert_eq!(render_answer(&none), "nothing");
    }

    #[test]
    fn profile_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let csv = tmp.path().join("people.csv");
        std::fs::write(&csv, "name,age\nann,30\nbob,\n").unwrap();
        let summary = profile(&Config::default(), &csv).unwrap();
        assert_eq!(summary.row_count, 2);
        assert_eq!(summary.column("age").unwrap().null_count, 1);
    }

    #[test]
    fn profile_rejects_unknown_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        let err = profile(&Config::default(), &path).unwrap_err();
        assert!(format!("{:#}", err).contains("Unsupported file type"));
    }
}
