//! Renders the schema store and user question into the fixed prompt
//! templates sent to the generation endpoint.

use crate::error::AnalystError;
use crate::schema::{ResultSet, SchemaStore};

/// Render the schema section: table name, row count, column list, and one
/// representative sample row per table.
pub fn schema_context(schema: &SchemaStore) -> String {
  let mut context = String::from("DATABASE SCHEMA:\n");

  for table in schema.tables() {
    context.push_str(&format!("\nTABLE: {} ({} rows)\n", table.name, table.row_count));
    context.push_str(&format!("COLUMNS: {}\n", table.columns.join(", ")));
    match table.sample_rows.first() {
      Some(row) => {
        let rendered =
          serde_json::to_string(row).unwrap_or_else(|_| "(unrenderable sample)".to_string());
        context.push_str(&format!("SAMPLE: {rendered}\n"));
      }
      None => context.push_str("SAMPLE: no data\n"),
    }
  }

  context
}

/// Build the NL-to-SQL prompt.
///
/// The only failure mode is an empty schema store, which callers must treat
/// as a hard rejection before contacting the generation endpoint.
pub fn sql_prompt(schema: &SchemaStore, question: &str) -> Result<String, AnalystError> {
  if schema.is_empty() {
    return Err(AnalystError::NoTablesLoaded);
  }

  let table_names = schema.table_names().join(", ");
  let first_table = schema.first().map(|t| t.name.clone()).unwrap_or_default();

  Ok(format!(
    "{context}\n\
     Generate ONLY a SQL query for this question: {question}\n\n\
     IMPORTANT:\n\
     - Return ONLY the SQL query, no explanations or markdown\n\
     - Use ONLY these exact table names: {table_names}\n\
     - Use ONLY column names from the schema above\n\
     - Put column names with spaces in backticks like `Invoice Number`\n\
     - If unsure, use SELECT * FROM {first_table}\n\n\
     SQL:",
    context = schema_context(schema),
  ))
}

/// How many sample records of the result set the insight prompt includes.
const INSIGHT_SAMPLE_RECORDS: usize = 2;

/// Build the prompt asking for a short natural-language answer from a
/// condensed result summary.
pub fn insight_prompt(question: &str, sql: &str, results: &ResultSet) -> String {
  let mut summary = format!("Query returned {} rows.", results.len());
  if !results.is_empty() {
    let sample: Vec<_> = (0..results.len().min(INSIGHT_SAMPLE_RECORDS))
      .filter_map(|i| results.record(i))
      .collect();
    let rendered = serde_json::to_string(&sample).unwrap_or_default();
    summary.push_str(&format!(" Sample: {rendered}"));
  }

  format!(
    "Original question: {question}\n\
     SQL query executed: {sql}\n\
     Results: {summary}\n\n\
     Provide a clear, concise answer to the original question based on the results.\n\
     Focus on key insights and numbers. Keep it under 100 words.\n\n\
     Answer:"
  )
}

/// Build the prompt translating a non-English question to English.
pub fn translation_prompt(text: &str) -> String {
  format!(
    "Translate this text to clear, natural English. Preserve the original \
     meaning and intent exactly.\n\n\
     Text: {text}\n\n\
     Provide only the English translation:"
  )
}
