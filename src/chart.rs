//! Chart-type heuristics: keyword and shape matching over the executed SQL
//! and its results. Selection only; rendering belongs to the caller.

use crate::schema::ResultSet;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
  Line,
  Bar,
  Pie,
  Scatter,
  Histogram,
}

/// A chart suggestion: the family plus the columns to put on each axis.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
  pub kind: ChartKind,
  pub x: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub y: Option<String>,
}

const TIME_WORDS: [&str; 6] = ["year", "month", "date", "quarter", "time", "trend"];
const COMPARE_WORDS: [&str; 4] = ["compare", "vs", "versus", "difference"];
const DISTRIBUTION_WORDS: [&str; 3] = ["distribution", "frequency", "histogram"];
const SCATTER_WORDS: [&str; 3] = ["correlation", "relationship", "scatter"];
const SHARE_WORDS: [&str; 3] = ["share", "proportion", "percentage"];

/// Pick a chart for the result set, or nothing when there is no way to put
/// the data on axes (no rows, or no usable column pairing).
pub fn select_chart(sql: &str, question: &str, results: &ResultSet) -> Option<ChartSpec> {
  if results.is_empty() || results.columns.is_empty() {
    return None;
  }

  let kind = detect_kind(sql, question, results);
  let (x, y) = pick_axes(results, kind)?;
  Some(ChartSpec { kind, x, y })
}

fn detect_kind(sql: &str, question: &str, results: &ResultSet) -> ChartKind {
  let text = format!("{} {}", sql.to_lowercase(), question.to_lowercase());

  if TIME_WORDS.iter().any(|w| text.contains(w)) {
    return if results.len() > 1 { ChartKind::Line } else { ChartKind::Bar };
  }
  if text.contains("group by") {
    return if results.len() <= 15 { ChartKind::Bar } else { ChartKind::Line };
  }
  if COMPARE_WORDS.iter().any(|w| text.contains(w)) {
    return ChartKind::Bar;
  }
  if DISTRIBUTION_WORDS.iter().any(|w| text.contains(w)) {
    return ChartKind::Histogram;
  }
  if SCATTER_WORDS.iter().any(|w| text.contains(w)) {
    return ChartKind::Scatter;
  }
  if SHARE_WORDS.iter().any(|w| text.contains(w)) {
    return ChartKind::Pie;
  }

  if results.len() <= 20 {
    ChartKind::Bar
  } else {
    ChartKind::Line
  }
}

/// Axis columns for the chosen family: scatter wants two numeric columns,
/// a histogram wants one, everything else pairs a label column with a
/// numeric column.
fn pick_axes(results: &ResultSet, kind: ChartKind) -> Option<(String, Option<String>)> {
  let numeric: Vec<usize> = (0..results.columns.len())
    .filter(|&i| results.rows.iter().any(|r| r.get(i).is_some_and(|v| v.is_numeric())))
    .collect();
  let label = (0..results.columns.len()).find(|i| !numeric.contains(i));

  match kind {
    ChartKind::Histogram => {
      let x = *numeric.first()?;
      Some((results.columns[x].clone(), None))
    }
    ChartKind::Scatter => {
      let x = *numeric.first()?;
      let y = *numeric.get(1)?;
      Some((results.columns[x].clone(), Some(results.columns[y].clone())))
    }
    _ => {
      let y = *numeric.first()?;
      let x = label.unwrap_or(0);
      if x == y && results.columns.len() == 1 {
        // Single numeric column still charts as a histogram-style axis.
        return Some((results.columns[x].clone(), None));
      }
      Some((results.columns[x].clone(), Some(results.columns[y].clone())))
    }
  }
}
