//! Group-by aggregations and single-column statistics over a [`Dataset`].
//!
//! Both entry points validate column names and types up front and report
//! problems as [`CoreError::InvalidAggregation`] with a message meant to be
//! shown to the user as-is.

use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::profile::{is_null, parse_number, top_values, ColumnSpec, Dataset, ValueCount};

/// Label shown for rows whose group-by cell is null.
pub const MISSING_GROUP: &str = "(missing)";

/// Group of an aggregation. Null group-by cells form their own group, kept
/// apart from any real cell that happens to read `(missing)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Value(String),
    Missing,
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        GroupKey::Value(value.to_string())
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupKey::Value(v) => f.write_str(v),
            GroupKey::Missing => f.write_str(MISSING_GROUP),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    Sum,
    Mean,
    Count,
}

impl AggregateOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateOp::Sum => "sum",
            AggregateOp::Mean => "mean",
            AggregateOp::Count => "count",
        }
    }
}

impl FromStr for AggregateOp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" | "total" => Ok(AggregateOp::Sum),
            "mean" | "average" | "avg" => Ok(AggregateOp::Mean),
            "count" => Ok(AggregateOp::Count),
            other => Err(CoreError::InvalidAggregation(format!(
                "unknown aggregation '{}'; use sum, mean or count",
                other
            ))),
        }
    }
}

fn resolve<'a>(dataset: &'a Dataset, name: &str) -> Result<(usize, &'a ColumnSpec)> {
    let index = dataset.column_index(name).ok_or_else(|| {
        CoreError::InvalidAggregation(format!("column '{}' does not exist in the dataset", name))
    })?;
    Ok((index, &dataset.columns()[index]))
}

/// Aggregate `target` grouped by `group_by`.
///
/// `count` counts every row in the group, so the counts sum to the row
/// count. `sum` and `mean` need a numeric target; groups without any
/// numeric target value are left out of their result. Groups come back in
/// value order with the null group last.
pub fn aggregate(
    dataset: &Dataset,
    group_by: &str,
    target: &str,
    op: AggregateOp,
) -> Result<BTreeMap<GroupKey, f64>> {
    let (group_idx, _) = resolve(dataset, group_by)?;
    let (target_idx, target_spec) = resolve(dataset, target)?;

    if op != AggregateOp::Count && !target_spec.inferred_type.is_numeric() {
        return Err(CoreError::InvalidAggregation(format!(
            "cannot compute {} of '{}': column is {}, not numeric",
            op.as_str(),
            target_spec.name,
            target_spec.inferred_type
        )));
    }

    // group -> (row count, numeric sum, numeric count)
    let mut groups: BTreeMap<GroupKey, (usize, f64, usize)> = BTreeMap::new();
    for row in dataset.rows() {
        let cell = row[group_idx].as_str();
        let key = if is_null(cell) {
            GroupKey::Missing
        } else {
            GroupKey::from(cell)
        };
        let slot = groups.entry(key).or_insert((0, 0.0, 0));
        slot.0 += 1;
        if let Some(x) = parse_number(&row[target_idx]) {
            slot.1 += x;
            slot.2 += 1;
        }
    }

    Ok(groups
        .into_iter()
        .filter_map(|(key, (rows, sum, n))| match op {
            AggregateOp::Count => Some((key, rows as f64)),
            AggregateOp::Sum if n > 0 => Some((key, sum)),
            AggregateOp::Mean if n > 0 => Some((key, sum / n as f64)),
            _ => None,
        })
        .collect())
}

/// Statistic over a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnStat {
    Mean,
    Median,
    Sum,
    Min,
    Max,
    Distinct,
    Missing,
    MostCommon,
}

impl ColumnStat {
    pub fn requires_numeric(self) -> bool {
        matches!(
            self,
            ColumnStat::Mean | ColumnStat::Median | ColumnStat::Sum | ColumnStat::Min | ColumnStat::Max
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ColumnStat::Mean => "average",
            ColumnStat::Median => "median",
            ColumnStat::Sum => "total",
            ColumnStat::Min => "minimum",
            ColumnStat::Max => "maximum",
            ColumnStat::Distinct => "distinct count",
            ColumnStat::Missing => "missing count",
            ColumnStat::MostCommon => "most common values",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Number(f64),
    Count(usize),
    Values(Vec<ValueCount>),
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Compute one statistic for `column`. `top_k` bounds `MostCommon`.
pub fn column_stat(dataset: &Dataset, column: &str, stat: ColumnStat, top_k: usize) -> Result<StatValue> {
    let (index, spec) = resolve(dataset, column)?;

    if stat.requires_numeric() {
        if !spec.inferred_type.is_numeric() {
            return Err(CoreError::InvalidAggregation(format!(
                "'{}' is {}, not numeric, so the {} is not applicable",
                spec.name,
                spec.inferred_type,
                stat.label()
            )));
        }
        let values = dataset.numeric_values(index);
        if values.is_empty() {
            return Err(CoreError::InvalidAggregation(format!(
                "the column '{}' has only missing values",
                spec.name
            )));
        }
        let value = match stat {
            ColumnStat::Mean => values.iter().sum::<f64>() / values.len() as f64,
            ColumnStat::Median => median(values),
            ColumnStat::Sum => values.iter().sum(),
            ColumnStat::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            ColumnStat::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            _ => unreachable!("non-numeric stat in numeric branch"),
        };
        return Ok(StatValue::Number(value));
    }

    Ok(match stat {
        ColumnStat::Distinct => StatValue::Count(spec.distinct_count),
        ColumnStat::Missing => StatValue::Count(spec.null_count),
        _ => StatValue::Values(top_values(dataset.cells(index).flatten(), top_k)),
    })
}
