use askql::sanitize::{self, Dialect};
use askql::schema::{SchemaStore, TableInfo};

fn schema_with(columns: &[&str]) -> SchemaStore {
  let mut schema = SchemaStore::new();
  schema.insert(TableInfo {
    name: "sales".to_string(),
    columns: columns.iter().map(|c| c.to_string()).collect(),
    sample_rows: vec![],
    row_count: 0,
  });
  schema
}

#[cfg(test)]
mod cleaning_tests {
  use super::*;

  #[test]
  fn test_fenced_select_is_unwrapped() {
    let schema = schema_with(&["product", "revenue"]);
    let raw = "```sql\nSELECT product FROM sales;\n```";

    let cleaned = sanitize::clean_sql(raw, &schema, Dialect::Sqlite);
    assert_eq!(cleaned, "SELECT product FROM sales");
  }

  #[test]
  fn test_label_prefixes_are_stripped() {
    let schema = schema_with(&["product"]);
    let raw = "SQL: SELECT product FROM sales";

    let cleaned = sanitize::clean_sql(raw, &schema, Dialect::Sqlite);
    assert_eq!(cleaned, "SELECT product FROM sales");
  }

  #[test]
  fn test_prose_around_statement_is_discarded() {
    let schema = schema_with(&["product"]);
    let raw = "Sure! Here is the query you asked for:\n\nSELECT product FROM sales;\n\nThis query lists every product.";

    let cleaned = sanitize::clean_sql(raw, &schema, Dialect::Sqlite);
    assert_eq!(cleaned, "SELECT product FROM sales");
  }

  #[test]
  fn test_statement_stops_at_first_semicolon() {
    let schema = schema_with(&["product"]);
    let raw = "SELECT product FROM sales; SELECT 1;";

    let cleaned = sanitize::clean_sql(raw, &schema, Dialect::Sqlite);
    assert_eq!(cleaned, "SELECT product FROM sales");
  }

  #[test]
  fn test_line_scan_keeps_sql_and_drops_commentary() {
    let schema = schema_with(&["product"]);
    // No SELECT keyword in statement position; forces the line-scan path.
    let raw = "here's how you would do it\nFROM sales\nWHERE product IS NOT NULL";

    let cleaned = sanitize::clean_sql(raw, &schema, Dialect::Sqlite);
    assert_eq!(cleaned, "FROM sales WHERE product IS NOT NULL");
  }

  #[test]
  fn test_comment_lines_are_dropped() {
    let schema = schema_with(&["product"]);
    let raw = "-- fetch everything\n# a note\nFROM sales";

    let cleaned = sanitize::clean_sql(raw, &schema, Dialect::Sqlite);
    assert_eq!(cleaned, "FROM sales");
  }

  #[test]
  fn test_keyword_detection() {
    assert!(sanitize::starts_with_sql_keyword("SELECT 1"));
    assert!(sanitize::starts_with_sql_keyword("  select 1"));
    assert!(sanitize::starts_with_sql_keyword("DELETE FROM t"));
    assert!(!sanitize::starts_with_sql_keyword("SELECTED works"));
    assert!(!sanitize::starts_with_sql_keyword("The answer is 42"));
    assert!(!sanitize::starts_with_sql_keyword(""));
  }
}

#[cfg(test)]
mod quoting_tests {
  use super::*;

  #[test]
  fn test_space_bearing_column_is_quoted() {
    let schema = schema_with(&["Invoice Number", "total"]);
    let sql = "SELECT Invoice Number FROM sales";

    let quoted = sanitize::quote_columns(sql, &schema, Dialect::Sqlite);
    assert_eq!(quoted, "SELECT `Invoice Number` FROM sales");
  }

  #[test]
  fn test_already_quoted_occurrence_is_untouched() {
    let schema = schema_with(&["Invoice Number"]);
    let sql = "SELECT `Invoice Number` FROM sales";

    let quoted = sanitize::quote_columns(sql, &schema, Dialect::Sqlite);
    assert_eq!(quoted, sql);
  }

  #[test]
  fn test_quoting_is_idempotent() {
    let schema = schema_with(&["Invoice Number", "unit price"]);
    let sql = "SELECT Invoice Number, unit price FROM sales";

    let once = sanitize::quote_columns(sql, &schema, Dialect::Sqlite);
    let twice = sanitize::quote_columns(&once, &schema, Dialect::Sqlite);
    assert_eq!(once, twice);
  }

  #[test]
  fn test_longest_name_first_avoids_partial_corruption() {
    // "unit price" contains no shorter quotable name here, but "price (usd)"
    // shares a prefix with "price (usd) net"; the longer must win.
    let schema = schema_with(&["price (usd)", "price (usd) net"]);
    let sql = "SELECT price (usd) net FROM sales";

    let quoted = sanitize::quote_columns(sql, &schema, Dialect::Sqlite);
    assert_eq!(quoted, "SELECT `price (usd) net` FROM sales");
  }

  #[test]
  fn test_plain_columns_are_left_alone() {
    let schema = schema_with(&["product", "revenue"]);
    let sql = "SELECT product, revenue FROM sales";

    let quoted = sanitize::quote_columns(sql, &schema, Dialect::Sqlite);
    assert_eq!(quoted, sql);
  }

  #[test]
  fn test_postgres_dialect_uses_double_quotes() {
    let schema = schema_with(&["Invoice Number"]);
    let sql = "SELECT Invoice Number FROM sales";

    let quoted = sanitize::quote_columns(sql, &schema, Dialect::Postgres);
    assert_eq!(quoted, "SELECT \"Invoice Number\" FROM sales");
  }

  #[test]
  fn test_aggressive_pass_quotes_plain_columns_too() {
    let schema = schema_with(&["order", "revenue"]);
    let sql = "SELECT order FROM sales";

    let quoted = sanitize::quote_all_columns(sql, &schema, Dialect::Sqlite);
    assert_eq!(quoted, "SELECT `order` FROM sales");
  }

  #[test]
  fn test_case_insensitive_match_preserves_original_casing() {
    let schema = schema_with(&["Invoice Number"]);
    let sql = "SELECT invoice number FROM sales";

    let quoted = sanitize::quote_columns(sql, &schema, Dialect::Sqlite);
    assert_eq!(quoted, "SELECT `invoice number` FROM sales");
  }
}

#[cfg(test)]
mod fallback_tests {
  use super::*;

  #[test]
  fn test_count_questions_aggregate() {
    let sql = sanitize::fallback_query("how many orders came in", "sales", Dialect::Sqlite);
    assert_eq!(sql, "SELECT COUNT(*) FROM sales");
  }

  #[test]
  fn test_top_questions_widen_the_limit() {
    let sql = sanitize::fallback_query("top products by revenue", "sales", Dialect::Sqlite);
    assert_eq!(sql, "SELECT * FROM sales LIMIT 10");
  }

  #[test]
  fn test_default_is_a_small_sample() {
    let sql = sanitize::fallback_query("show me the data", "sales", Dialect::Sqlite);
    assert_eq!(sql, "SELECT * FROM sales LIMIT 5");
  }

  #[test]
  fn test_awkward_table_names_are_quoted() {
    let sql = sanitize::fallback_query("show me the data", "my data", Dialect::Sqlite);
    assert_eq!(sql, "SELECT * FROM `my data` LIMIT 5");
  }
}
