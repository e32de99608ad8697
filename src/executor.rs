//! Runs sanitized SQL against the active backing store, rewriting engine
//! errors into messages the user (or the model, on a retried question) can
//! act on.

use crate::error::{AnalystError, QueryErrorKind};
use crate::sanitize;
use crate::schema::{ResultSet, SchemaStore};
use crate::store::Backend;

/// Execute `sql` against the backend.
///
/// Table-not-found errors come back listing the currently loaded tables.
/// On a syntax error, exactly one repair pass re-applies aggressive
/// identifier quoting and re-executes; a second failure surfaces the
/// original engine message. The schema store is never mutated here.
pub async fn run(
  backend: &Backend,
  schema: &SchemaStore,
  sql: &str,
) -> Result<ResultSet, AnalystError> {
  match backend.execute(sql).await {
    Ok(result) => Ok(result),
    Err(error) => match error.query_kind() {
      Some(QueryErrorKind::TableNotFound) => Err(AnalystError::table_not_found(format!(
        "Table not found. Available tables: {}. Try asking about these tables instead.",
        schema.table_names().join(", ")
      ))),
      Some(QueryErrorKind::Syntax) => {
        let repaired = sanitize::quote_all_columns(sql, schema, backend.dialect());
        if repaired == sql {
          return Err(error);
        }
        tracing::debug!(%repaired, "retrying after syntax error with aggressive quoting");
        match backend.execute(&repaired).await {
          Ok(result) => Ok(result),
          // Surface the original engine message, not the repair's.
          Err(_) => Err(error),
        }
      }
      _ => Err(error),
    },
  }
}
