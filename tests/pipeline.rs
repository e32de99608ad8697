//! End-to-end pipeline tests. The generation client is pointed at an
//! unreachable loopback port throughout, so every path that would contact
//! the endpoint exercises the deterministic fallbacks instead.

use askql::analyst::{Analyst, AnalyzeOptions};
use askql::error::QueryErrorKind;
use askql::executor;
use askql::generation::GenerationConfig;
use askql::loader;
use askql::schema::{SchemaStore, TableInfo, Value};
use askql::store::Backend;
use std::io::Write;
use tempfile::NamedTempFile;

fn offline_config() -> GenerationConfig {
  GenerationConfig {
    base_url: "http://127.0.0.1:9".to_string(),
    models: vec!["sqlcoder".to_string(), "llama3".to_string()],
    timeout_secs: 1,
  }
}

fn offline_analyst() -> Analyst {
  Analyst::with_generation_config(offline_config()).unwrap()
}

fn sales_csv() -> NamedTempFile {
  let mut file = tempfile::Builder::new().prefix("sales").suffix(".csv").tempfile().unwrap();
  file
    .write_all(b"product,revenue,quarter\nLaptop,1000,Q1\nMouse,25,Q1\nKeyboard,75,Q2\n")
    .unwrap();
  file.flush().unwrap();
  file
}

async fn backend_with(tables: &[(&str, &str)]) -> (Backend, SchemaStore) {
  let mut backend = Backend::memory().unwrap();
  let mut schema = SchemaStore::new();

  for (name, csv) in tables {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(csv.as_bytes()).unwrap();
    file.flush().unwrap();

    let data = loader::read_table(file.path()).unwrap();
    let count = backend.load_table(name, &data).await.unwrap();
    schema.insert(TableInfo::from_result_set(name.to_string(), &data, count));
  }

  (backend, schema)
}

#[tokio::test]
async fn test_empty_store_rejects_question_without_generation() {
  let mut analyst = offline_analyst();

  let result = analyst.analyze("what is the revenue", AnalyzeOptions::default()).await;
  assert!(!result.success);
  assert!(result.error.as_deref().unwrap().contains("No tables loaded"));
  assert!(result.sql_query.is_empty());
}

#[tokio::test]
async fn test_unreachable_endpoint_still_answers_via_fallback() {
  let mut analyst = offline_analyst();
  let file = sales_csv();
  let message = analyst.load_file(file.path(), Some("sales")).await.unwrap();
  assert!(message.contains("3 rows"));

  let options = AnalyzeOptions { fast_insights: true, ..Default::default() };
  let result = analyst.analyze("what product has highest revenue", options).await;

  assert!(result.success, "error: {:?}", result.error);
  assert_eq!(result.sql_query, "SELECT * FROM sales LIMIT 10");
  assert_eq!(result.results.len(), 3);
  assert!(result.warning.is_some(), "fallback should be flagged");
  assert!(result.insights.contains("Found 3 results"));
}

#[tokio::test]
async fn test_llm_insight_mode_degrades_to_fast_summary() {
  let mut analyst = offline_analyst();
  let file = sales_csv();
  analyst.load_file(file.path(), Some("sales")).await.unwrap();

  // fast_insights off: the insight stage tries the endpoint and falls back.
  let result = analyst.analyze("show all sales", AnalyzeOptions::default()).await;

  assert!(result.success);
  assert!(result.insights.contains("Found"));
}

#[tokio::test]
async fn test_row_count_matches_backing_store_after_load() {
  let mut analyst = offline_analyst();
  let file = sales_csv();
  analyst.load_file(file.path(), Some("sales")).await.unwrap();

  assert_eq!(analyst.schema().get("sales").unwrap().row_count, 3);

  let options = AnalyzeOptions { fast_insights: true, ..Default::default() };
  let result = analyst.analyze("count the sales rows", options).await;
  assert!(result.success);
  assert_eq!(result.sql_query, "SELECT COUNT(*) FROM sales");
  assert_eq!(result.results.rows[0][0], Value::Integer(3));
}

#[tokio::test]
async fn test_reload_replaces_table_wholesale() {
  let mut analyst = offline_analyst();

  let file = sales_csv();
  analyst.load_file(file.path(), Some("sales")).await.unwrap();

  let mut smaller = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
  smaller.write_all(b"product,revenue,quarter\nLaptop,1000,Q1\n").unwrap();
  smaller.flush().unwrap();
  analyst.load_file(smaller.path(), Some("sales")).await.unwrap();

  assert_eq!(analyst.schema().len(), 1);
  assert_eq!(analyst.schema().get("sales").unwrap().row_count, 1);
}

#[tokio::test]
async fn test_history_records_every_question_in_order() {
  let mut analyst = offline_analyst();
  let file = sales_csv();
  analyst.load_file(file.path(), Some("sales")).await.unwrap();

  let options = AnalyzeOptions { fast_insights: true, ..Default::default() };
  analyst.analyze("count rows", options).await;
  analyst.analyze("show everything", options).await;

  let history = analyst.history();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0].question, "count rows");
  assert_eq!(history[1].question, "show everything");
}

#[tokio::test]
async fn test_payload_serializes_results_as_row_mappings() {
  let mut analyst = offline_analyst();
  let file = sales_csv();
  analyst.load_file(file.path(), Some("sales")).await.unwrap();

  let options = AnalyzeOptions { fast_insights: true, ..Default::default() };
  let result = analyst.analyze("show everything", options).await;

  let payload = serde_json::to_value(&result).unwrap();
  assert_eq!(payload["success"], serde_json::Value::Bool(true));
  assert_eq!(payload["results"][0]["product"], "Laptop");
  assert_eq!(payload["results"][0]["revenue"], 1000);
  assert!(payload.get("error").is_none());
}

#[tokio::test]
async fn test_misspelled_table_lists_available_tables() {
  let (backend, schema) = backend_with(&[
    ("sales", "product,revenue\nLaptop,1000\n"),
    ("orders", "id,total\n1,50\n"),
  ])
  .await;

  let error = executor::run(&backend, &schema, "SELECT * FROM salez").await.unwrap_err();
  assert_eq!(error.query_kind(), Some(QueryErrorKind::TableNotFound));
  let message = error.to_string();
  assert!(message.contains("sales"), "{message}");
  assert!(message.contains("orders"), "{message}");
}

#[tokio::test]
async fn test_syntax_error_repair_quotes_keyword_column() {
  // "order" is a keyword; selecting it bare is a syntax error that one
  // aggressive quoting pass fixes.
  let (backend, schema) = backend_with(&[("items", "order,total\n5,50\n8,80\n")]).await;

  let result = executor::run(&backend, &schema, "SELECT order FROM items").await.unwrap();
  assert_eq!(result.columns, vec!["order"]);
  assert_eq!(result.len(), 2);
}

#[tokio::test]
async fn test_unfixable_syntax_error_surfaces_original_message() {
  let (backend, schema) = backend_with(&[("items", "order,total\n5,50\n")]).await;

  // No known column appears, so the repair pass has nothing to change.
  let error =
    executor::run(&backend, &schema, "SELECT * FROM items WHERE WHERE").await.unwrap_err();
  assert_eq!(error.query_kind(), Some(QueryErrorKind::Syntax));
  assert!(error.to_string().to_lowercase().contains("syntax error"));
}

#[tokio::test]
async fn test_space_bearing_columns_survive_load_and_query() {
  let (backend, schema) =
    backend_with(&[("invoices", "Invoice Number,Amount Due\nINV-1,100\nINV-2,250\n")]).await;

  let sql = askql::sanitize::quote_columns(
    "SELECT Invoice Number FROM invoices",
    &schema,
    backend.dialect(),
  );
  assert_eq!(sql, "SELECT `Invoice Number` FROM invoices");

  let result = executor::run(&backend, &schema, &sql).await.unwrap();
  assert_eq!(result.len(), 2);
  assert_eq!(result.rows[0][0], Value::Text("INV-1".to_string()));
}
