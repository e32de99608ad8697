//! Backing stores holding loaded tables and executing SQL.
//!
//! One pipeline, two engines: an embedded in-memory SQLite store for file
//! sessions, and a networked Postgres store when connection details are
//! supplied. Both expose the same load/execute surface; the sanitizer picks
//! its identifier quote style from [`Backend::dialect`].

use crate::error::AnalystError;
use crate::sanitize::Dialect;
use crate::schema::{ResultSet, TableInfo, Value};
use bytes::BytesMut;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::NoTls;

/// Connection details for the networked store. Every field is required;
/// validation reports what is missing before any query is attempted.
#[derive(Debug, Clone, Default)]
pub struct PostgresConfig {
  pub host: Option<String>,
  pub port: Option<u16>,
  pub user: Option<String>,
  pub password: Option<String>,
  pub database: Option<String>,
}

impl PostgresConfig {
  /// Whether any connection field was supplied at all.
  pub fn is_requested(&self) -> bool {
    self.host.is_some()
      || self.port.is_some()
      || self.user.is_some()
      || self.password.is_some()
      || self.database.is_some()
  }

  /// Validate the config and render a libpq-style connection string.
  pub fn connection_string(&self) -> Result<String, AnalystError> {
    let mut missing = Vec::new();
    if self.host.is_none() {
      missing.push("host");
    }
    if self.port.is_none() {
      missing.push("port");
    }
    if self.user.is_none() {
      missing.push("user");
    }
    if self.password.is_none() {
      missing.push("password");
    }
    if self.database.is_none() {
      missing.push("database");
    }

    if !missing.is_empty() {
      return Err(AnalystError::configuration(format!(
        "missing required connection fields: {}",
        missing.join(", ")
      )));
    }

    Ok(format!(
      "host={} port={} user={} password={} dbname={}",
      self.host.as_deref().unwrap_or_default(),
      self.port.unwrap_or_default(),
      self.user.as_deref().unwrap_or_default(),
      self.password.as_deref().unwrap_or_default(),
      self.database.as_deref().unwrap_or_default(),
    ))
  }
}

impl ToSql for Value {
  fn to_sql(
    &self,
    ty: &Type,
    out: &mut BytesMut,
  ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
    match self {
      Value::Null => Ok(IsNull::Yes),
      Value::Integer(n) => n.to_sql(ty, out),
      Value::Real(r) => r.to_sql(ty, out),
      Value::Text(s) => s.to_sql(ty, out),
    }
  }

  fn accepts(ty: &Type) -> bool {
    <i64 as ToSql>::accepts(ty) || <f64 as ToSql>::accepts(ty) || <String as ToSql>::accepts(ty)
  }

  to_sql_checked!();
}

/// The active backing store for a session.
pub enum Backend {
  Memory(rusqlite::Connection),
  Postgres(tokio_postgres::Client),
}

impl Backend {
  /// Open the embedded in-memory store.
  pub fn memory() -> Result<Self, AnalystError> {
    let conn = rusqlite::Connection::open_in_memory()
      .map_err(|e| AnalystError::engine(format!("failed to open in-memory store: {e}")))?;
    Ok(Backend::Memory(conn))
  }

  /// Connect to the networked store. The connection driver runs on a
  /// background task for the life of the client.
  pub async fn postgres(config: &PostgresConfig) -> Result<Self, AnalystError> {
    let conn_string = config.connection_string()?;

    let (client, connection) = tokio_postgres::connect(&conn_string, NoTls)
      .await
      .map_err(|e| AnalystError::configuration(format!("failed to connect: {e}")))?;

    tokio::spawn(async move {
      if let Err(e) = connection.await {
        tracing::error!(error = %e, "database connection closed");
      }
    });

    Ok(Backend::Postgres(client))
  }

  pub fn dialect(&self) -> Dialect {
    match self {
      Backend::Memory(_) => Dialect::Sqlite,
      Backend::Postgres(_) => Dialect::Postgres,
    }
  }

  /// Create (or replace) a table from loaded data. Returns the row count
  /// actually stored, so callers can record schema metadata that agrees
  /// with the store.
  pub async fn load_table(&mut self, name: &str, data: &ResultSet) -> Result<u64, AnalystError> {
    match self {
      Backend::Memory(conn) => load_sqlite(conn, name, data),
      Backend::Postgres(client) => load_postgres(client, name, data).await,
    }
  }

  /// Execute one SQL statement and collect its result rows. Never mutates
  /// schema metadata; errors come back classified by [`AnalystError::query_kind`].
  pub async fn execute(&self, sql: &str) -> Result<ResultSet, AnalystError> {
    match self {
      Backend::Memory(conn) => execute_sqlite(conn, sql),
      Backend::Postgres(client) => execute_postgres(client, sql).await,
    }
  }

  /// Introspect tables that already exist in the store. The embedded store
  /// starts empty, so only the networked arm returns anything.
  pub async fn existing_tables(&self) -> Result<Vec<TableInfo>, AnalystError> {
    match self {
      Backend::Memory(_) => Ok(Vec::new()),
      Backend::Postgres(client) => introspect_postgres(client).await,
    }
  }
}

/// Column type keywords for CREATE TABLE, inferred from the loaded values.
fn column_sql_types(data: &ResultSet, dialect: Dialect) -> Vec<&'static str> {
  (0..data.columns.len())
    .map(|i| {
      let mut integer = true;
      let mut numeric = true;
      for row in &data.rows {
        match row.get(i) {
          Some(Value::Integer(_)) | Some(Value::Null) | None => {}
          Some(Value::Real(_)) => integer = false,
          Some(Value::Text(_)) => {
            integer = false;
            numeric = false;
          }
        }
      }
      match (integer, numeric, dialect) {
        (true, _, Dialect::Sqlite) => "INTEGER",
        (true, _, Dialect::Postgres) => "BIGINT",
        (false, true, Dialect::Sqlite) => "REAL",
        (false, true, Dialect::Postgres) => "DOUBLE PRECISION",
        _ => "TEXT",
      }
    })
    .collect()
}

fn create_table_sql(name: &str, data: &ResultSet, dialect: Dialect) -> String {
  let types = column_sql_types(data, dialect);
  let columns: Vec<String> = data
    .columns
    .iter()
    .zip(&types)
    .map(|(col, ty)| format!("{} {ty}", dialect.quote(col)))
    .collect();
  format!("CREATE TABLE {} ({})", dialect.quote(name), columns.join(", "))
}

fn insert_sql(name: &str, data: &ResultSet, dialect: Dialect, numbered: bool) -> String {
  let placeholders: Vec<String> = (1..=data.columns.len())
    .map(|i| if numbered { format!("${i}") } else { "?".to_string() })
    .collect();
  format!(
    "INSERT INTO {} ({}) VALUES ({})",
    dialect.quote(name),
    data.columns.iter().map(|c| dialect.quote(c)).collect::<Vec<_>>().join(", "),
    placeholders.join(", ")
  )
}

// ==== Embedded store (SQLite) ====

fn classify_sqlite(e: rusqlite::Error) -> AnalystError {
  let message = e.to_string();
  let lower = message.to_lowercase();
  if lower.contains("no such table") {
    AnalystError::table_not_found(message)
  } else if lower.contains("syntax error") {
    AnalystError::syntax(message)
  } else {
    AnalystError::engine(message)
  }
}

fn load_sqlite(
  conn: &mut rusqlite::Connection,
  name: &str,
  data: &ResultSet,
) -> Result<u64, AnalystError> {
  let dialect = Dialect::Sqlite;

  conn
    .execute_batch(&format!("DROP TABLE IF EXISTS {}", dialect.quote(name)))
    .map_err(classify_sqlite)?;
  conn.execute_batch(&create_table_sql(name, data, dialect)).map_err(classify_sqlite)?;

  let tx = conn.transaction().map_err(classify_sqlite)?;
  {
    let mut stmt = tx.prepare(&insert_sql(name, data, dialect, false)).map_err(classify_sqlite)?;
    for row in &data.rows {
      let params = rusqlite::params_from_iter(row.iter().map(sqlite_param));
      stmt.execute(params).map_err(classify_sqlite)?;
    }
  }
  tx.commit().map_err(classify_sqlite)?;

  let count: i64 = conn
    .query_row(&format!("SELECT COUNT(*) FROM {}", dialect.quote(name)), [], |row| row.get(0))
    .map_err(classify_sqlite)?;

  Ok(count as u64)
}

fn sqlite_param(value: &Value) -> rusqlite::types::Value {
  match value {
    Value::Null => rusqlite::types::Value::Null,
    Value::Integer(n) => rusqlite::types::Value::Integer(*n),
    Value::Real(r) => rusqlite::types::Value::Real(*r),
    Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
  }
}

fn sqlite_value(cell: rusqlite::types::ValueRef<'_>) -> Value {
  match cell {
    rusqlite::types::ValueRef::Null => Value::Null,
    rusqlite::types::ValueRef::Integer(n) => Value::Integer(n),
    rusqlite::types::ValueRef::Real(r) => Value::Real(r),
    rusqlite::types::ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).to_string()),
    rusqlite::types::ValueRef::Blob(b) => Value::Text(format!("<{} bytes>", b.len())),
  }
}

fn execute_sqlite(conn: &rusqlite::Connection, sql: &str) -> Result<ResultSet, AnalystError> {
  let mut stmt = conn.prepare(sql).map_err(classify_sqlite)?;
  let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

  let mut result = ResultSet::new(columns);
  let mut rows = stmt.query([]).map_err(classify_sqlite)?;
  while let Some(row) = rows.next().map_err(classify_sqlite)? {
    let mut cells = Vec::with_capacity(result.columns.len());
    for i in 0..result.columns.len() {
      let cell = row.get_ref(i).map_err(classify_sqlite)?;
      cells.push(sqlite_value(cell));
    }
    result.rows.push(cells);
  }

  Ok(result)
}

// ==== Networked store (Postgres) ====

fn classify_postgres(e: tokio_postgres::Error) -> AnalystError {
  use tokio_postgres::error::SqlState;

  if let Some(db) = e.as_db_error() {
    if db.code() == &SqlState::UNDEFINED_TABLE {
      return AnalystError::table_not_found(db.message().to_string());
    }
    if db.code() == &SqlState::SYNTAX_ERROR {
      return AnalystError::syntax(db.message().to_string());
    }
    return AnalystError::engine(db.message().to_string());
  }
  AnalystError::engine(e.to_string())
}

async fn load_postgres(
  client: &tokio_postgres::Client,
  name: &str,
  data: &ResultSet,
) -> Result<u64, AnalystError> {
  let dialect = Dialect::Postgres;

  client
    .execute(&format!("DROP TABLE IF EXISTS {}", dialect.quote(name)), &[])
    .await
    .map_err(classify_postgres)?;
  client
    .execute(&create_table_sql(name, data, dialect), &[])
    .await
    .map_err(classify_postgres)?;

  let insert = client
    .prepare(&insert_sql(name, data, dialect, true))
    .await
    .map_err(classify_postgres)?;

  for row in &data.rows {
    let params: Vec<&(dyn ToSql + Sync)> = row.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
    client.execute(&insert, &params).await.map_err(classify_postgres)?;
  }

  let count_row = client
    .query_one(&format!("SELECT COUNT(*) FROM {}", dialect.quote(name)), &[])
    .await
    .map_err(classify_postgres)?;
  let count: i64 = count_row.get(0);

  Ok(count as u64)
}

fn postgres_value(row: &tokio_postgres::Row, idx: usize) -> Value {
  if let Ok(v) = row.try_get::<_, Option<i64>>(idx) {
    return v.map(Value::Integer).unwrap_or(Value::Null);
  }
  if let Ok(v) = row.try_get::<_, Option<i32>>(idx) {
    return v.map(|n| Value::Integer(n.into())).unwrap_or(Value::Null);
  }
  if let Ok(v) = row.try_get::<_, Option<i16>>(idx) {
    return v.map(|n| Value::Integer(n.into())).unwrap_or(Value::Null);
  }
  if let Ok(v) = row.try_get::<_, Option<f64>>(idx) {
    return v.map(Value::Real).unwrap_or(Value::Null);
  }
  if let Ok(v) = row.try_get::<_, Option<f32>>(idx) {
    return v.map(|f| Value::Real(f.into())).unwrap_or(Value::Null);
  }
  if let Ok(v) = row.try_get::<_, Option<String>>(idx) {
    return v.map(Value::Text).unwrap_or(Value::Null);
  }
  if let Ok(v) = row.try_get::<_, Option<bool>>(idx) {
    return v.map(|b| Value::Text(b.to_string())).unwrap_or(Value::Null);
  }
  Value::Null
}

async fn execute_postgres(
  client: &tokio_postgres::Client,
  sql: &str,
) -> Result<ResultSet, AnalystError> {
  let stmt = client.prepare(sql).await.map_err(classify_postgres)?;
  let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();

  let rows = client.query(&stmt, &[]).await.map_err(classify_postgres)?;

  let mut result = ResultSet::new(columns);
  for row in &rows {
    let cells = (0..result.columns.len()).map(|i| postgres_value(row, i)).collect();
    result.rows.push(cells);
  }

  Ok(result)
}

/// Introspect existing public-schema tables into schema metadata: columns
/// in ordinal order, a few sample rows, and the current row count.
async fn introspect_postgres(
  client: &tokio_postgres::Client,
) -> Result<Vec<TableInfo>, AnalystError> {
  let table_rows = client
    .query(
      "SELECT table_name FROM information_schema.tables
       WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
       ORDER BY table_name",
      &[],
    )
    .await
    .map_err(classify_postgres)?;

  let mut tables = Vec::new();
  for table_row in &table_rows {
    let name: String = table_row.get(0);
    let quoted = Dialect::Postgres.quote(&name);

    let sample =
      execute_postgres(client, &format!("SELECT * FROM {quoted} LIMIT 3")).await?;

    let count_row = client
      .query_one(&format!("SELECT COUNT(*) FROM {quoted}"), &[])
      .await
      .map_err(classify_postgres)?;
    let count: i64 = count_row.get(0);

    tables.push(TableInfo::from_result_set(name, &sample, count as u64));
  }

  Ok(tables)
}
