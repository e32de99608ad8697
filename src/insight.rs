//! Natural-language summaries of query results.
//!
//! Two modes: a fast mode that formats the result set without any HTTP, and
//! an LLM-backed mode that sends a condensed summary through the generation
//! client and degrades to the fast mode when the endpoint is unavailable.

use crate::generation::{GenerationClient, GenerationOptions};
use crate::prompt;
use crate::schema::ResultSet;

/// Summarize results without contacting the generation endpoint.
pub fn fast_insight(results: &ResultSet) -> String {
  if results.is_empty() {
    return "No results found for your query.".to_string();
  }

  let mut insight = format!("Found {} results. ", results.len());

  if results.columns.len() == 1 {
    if let Some((min, max)) = numeric_range(results, 0) {
      insight.push_str(&format!("Values range from {min} to {max}."));
      return insight;
    }
    let samples: Vec<String> =
      results.rows.iter().take(3).filter_map(|r| r.first()).map(|v| v.to_string()).collect();
    insight.push_str(&format!("Sample values: {}.", samples.join(", ")));
    return insight;
  }

  insight.push_str(&format!("Columns: {}. ", results.columns.join(", ")));
  if let Some(record) = results.record(0) {
    let rendered = serde_json::to_string(&record).unwrap_or_default();
    insight.push_str(&format!("Sample row: {rendered}"));
  }
  insight
}

/// Min and max of a numeric column, rendered with the values' own display
/// form (so integers stay integers).
fn numeric_range(results: &ResultSet, column: usize) -> Option<(String, String)> {
  let mut min: Option<(f64, String)> = None;
  let mut max: Option<(f64, String)> = None;

  for row in &results.rows {
    let value = row.get(column)?;
    let numeric = value.as_f64()?;
    if min.as_ref().is_none_or(|(m, _)| numeric < *m) {
      min = Some((numeric, value.to_string()));
    }
    if max.as_ref().is_none_or(|(m, _)| numeric > *m) {
      max = Some((numeric, value.to_string()));
    }
  }

  Some((min?.1, max?.1))
}

/// Summarize results through the generation client, falling back to the
/// fast mode when every model fails.
pub async fn llm_insight(
  client: &GenerationClient,
  question: &str,
  sql: &str,
  results: &ResultSet,
) -> String {
  if results.is_empty() {
    return "No results found for your query.".to_string();
  }

  let prompt = prompt::insight_prompt(question, sql, results);
  match client.generate_with_fallback(&prompt, Some(&GenerationOptions::insight())).await {
    Ok(text) => text,
    Err(e) => {
      tracing::debug!(error = %e, "insight generation failed, using fast summary");
      fast_insight(results)
    }
  }
}
