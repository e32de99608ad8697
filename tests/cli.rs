use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::process::Command;

/// Helper to create a Command for the `askql` binary with the generation
/// endpoint pointed somewhere unreachable, so commands exercise the
/// deterministic fallbacks rather than a live endpoint.
fn askql_cmd() -> Command {
  let mut cmd = Command::cargo_bin("askql").expect("binary exists");
  cmd.env("ASKQL_OLLAMA_URL", "http://127.0.0.1:9");
  cmd.env("ASKQL_TIMEOUT_SECS", "1");
  cmd.env("NO_COLOR", "1");
  for var in ["ASKQL_PG_HOST", "ASKQL_PG_PORT", "ASKQL_PG_USER", "ASKQL_PG_PASSWORD", "ASKQL_PG_DATABASE"] {
    cmd.env_remove(var);
  }
  cmd
}

fn sales_file(temp: &assert_fs::TempDir) -> assert_fs::fixture::ChildPath {
  let file = temp.child("sales.csv");
  file
    .write_str("product,revenue,quarter\nLaptop,1000,Q1\nMouse,25,Q1\nKeyboard,75,Q2\n")
    .unwrap();
  file
}

#[test]
fn test_tables_lists_loaded_schema() {
  let temp = assert_fs::TempDir::new().unwrap();
  let file = sales_file(&temp);

  askql_cmd()
    .args(["tables", "--file"])
    .arg(file.path())
    .assert()
    .success()
    .stdout(contains("sales").and(contains("product, revenue, quarter")).and(contains("3 rows")));
}

#[test]
fn test_ask_without_tables_fails_cleanly() {
  askql_cmd()
    .args(["ask", "what is the revenue"])
    .assert()
    .failure()
    .stderr(contains("No tables loaded"));
}

#[test]
fn test_ask_answers_offline_via_fallback() {
  let temp = assert_fs::TempDir::new().unwrap();
  let file = sales_file(&temp);

  askql_cmd()
    .args(["ask", "what product has highest revenue", "--fast", "--file"])
    .arg(file.path())
    .assert()
    .success()
    .stdout(contains("SELECT * FROM sales LIMIT 10").and(contains("Found 3 results")));
}

#[test]
fn test_ask_json_emits_analysis_payload() {
  let temp = assert_fs::TempDir::new().unwrap();
  let file = sales_file(&temp);

  askql_cmd()
    .args(["ask", "count the rows", "--fast", "--json", "--file"])
    .arg(file.path())
    .assert()
    .success()
    .stdout(
      contains("\"success\": true")
        .and(contains("\"sql_query\": \"SELECT COUNT(*) FROM sales\""))
        .and(contains("\"question\": \"count the rows\"")),
    );
}

#[test]
fn test_partial_postgres_config_is_rejected_before_querying() {
  askql_cmd()
    .args(["ask", "anything", "--pg-host", "localhost"])
    .assert()
    .failure()
    .stderr(contains("missing required connection fields").and(contains("user")));
}

#[test]
fn test_explicit_table_name_overrides_file_stem() {
  let temp = assert_fs::TempDir::new().unwrap();
  let file = sales_file(&temp);

  askql_cmd()
    .args(["tables", "--table", "quarterly", "--file"])
    .arg(file.path())
    .assert()
    .success()
    .stdout(contains("quarterly"));
}
