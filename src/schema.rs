//! Session schema metadata: loaded tables, their columns, and sample rows.
//!
//! The schema store is owned by the session and passed by reference to the
//! prompt builder, sanitizer, and executor. There is no global state; a
//! process restart is the only teardown.

use serde::{Serialize, Serializer};
use std::fmt;

/// A single cell value, mirroring SQLite's storage classes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
}

impl Value {
  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn is_numeric(&self) -> bool {
    matches!(self, Value::Integer(_) | Value::Real(_))
  }

  /// Numeric view of the value, for min/max style summaries.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Integer(n) => Some(*n as f64),
      Value::Real(f) => Some(*f),
      _ => None,
    }
  }

  pub fn to_json(&self) -> serde_json::Value {
    match self {
      Value::Null => serde_json::Value::Null,
      Value::Integer(n) => serde_json::Value::from(*n),
      Value::Real(f) => serde_json::Value::from(*f),
      Value::Text(s) => serde_json::Value::from(s.clone()),
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => write!(f, ""),
      Value::Integer(n) => write!(f, "{n}"),
      Value::Real(r) => write!(f, "{r}"),
      Value::Text(s) => write!(f, "{s}"),
    }
  }
}

impl Serialize for Value {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Value::Null => serializer.serialize_unit(),
      Value::Integer(n) => serializer.serialize_i64(*n),
      Value::Real(r) => serializer.serialize_f64(*r),
      Value::Text(s) => serializer.serialize_str(s),
    }
  }
}

/// A tabular query result: named columns plus typed rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSet {
  pub columns: Vec<String>,
  pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
  pub fn new(columns: Vec<String>) -> Self {
    Self { columns, rows: Vec::new() }
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// One row as an ordered column -> value mapping.
  pub fn record(&self, index: usize) -> Option<serde_json::Map<String, serde_json::Value>> {
    let row = self.rows.get(index)?;
    let mut record = serde_json::Map::new();
    for (column, value) in self.columns.iter().zip(row) {
      record.insert(column.clone(), value.to_json());
    }
    Some(record)
  }

  /// All rows as ordered column -> value mappings.
  pub fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
    (0..self.rows.len()).filter_map(|i| self.record(i)).collect()
  }

  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == name)
  }
}

/// Schema and sample metadata for one loaded table.
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
  pub name: String,
  pub columns: Vec<String>,
  pub sample_rows: Vec<serde_json::Map<String, serde_json::Value>>,
  pub row_count: u64,
}

/// How many rows of each table the prompt builder gets to see.
const SAMPLE_ROWS: usize = 3;

impl TableInfo {
  /// Build table metadata from loaded data, keeping at most a few sample rows.
  pub fn from_result_set(name: impl Into<String>, data: &ResultSet, row_count: u64) -> Self {
    let sample_rows = (0..data.rows.len().min(SAMPLE_ROWS)).filter_map(|i| data.record(i)).collect();

    Self { name: name.into(), columns: data.columns.clone(), sample_rows, row_count }
  }
}

/// Mapping from table name to metadata, with stable insertion order.
///
/// Re-loading a table of the same name replaces its entry wholesale; entries
/// are never partially mutated.
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
  tables: Vec<TableInfo>,
}

impl SchemaStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, info: TableInfo) {
    if let Some(existing) = self.tables.iter_mut().find(|t| t.name == info.name) {
      *existing = info;
    } else {
      self.tables.push(info);
    }
  }

  pub fn get(&self, name: &str) -> Option<&TableInfo> {
    self.tables.iter().find(|t| t.name == name)
  }

  pub fn first(&self) -> Option<&TableInfo> {
    self.tables.first()
  }

  pub fn is_empty(&self) -> bool {
    self.tables.is_empty()
  }

  pub fn len(&self) -> usize {
    self.tables.len()
  }

  pub fn tables(&self) -> impl Iterator<Item = &TableInfo> {
    self.tables.iter()
  }

  pub fn table_names(&self) -> Vec<&str> {
    self.tables.iter().map(|t| t.name.as_str()).collect()
  }

  /// Every column name known across all tables, deduplicated.
  pub fn all_columns(&self) -> Vec<&str> {
    let mut columns: Vec<&str> =
      self.tables.iter().flat_map(|t| t.columns.iter().map(String::as_str)).collect();
    columns.sort_unstable();
    columns.dedup();
    columns
  }
}
