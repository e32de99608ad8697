//! Reads CSV and Excel files into typed [`ResultSet`]s ready for loading
//! into a backing store.

use crate::error::AnalystError;
use crate::schema::{ResultSet, Value};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

/// Table name for a file: the explicit name when given, otherwise the
/// lower-cased file stem.
pub fn table_name_for(path: &Path, explicit: Option<&str>) -> String {
  match explicit {
    Some(name) => name.to_string(),
    None => path
      .file_stem()
      .and_then(|s| s.to_str())
      .unwrap_or("table")
      .to_lowercase(),
  }
}

/// Read a tabular file into a result set, dispatching on extension.
/// Anything that is not `.csv` is treated as an Excel workbook.
pub fn read_table(path: &Path) -> Result<ResultSet, AnalystError> {
  let is_csv = path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

  let data = if is_csv { read_csv(path) } else { read_excel(path) }?;

  if data.columns.is_empty() {
    return Err(AnalystError::load(path.display().to_string(), "file has no columns"));
  }

  Ok(data)
}

fn read_csv(path: &Path) -> Result<ResultSet, AnalystError> {
  let display = path.display().to_string();

  let mut reader = csv::ReaderBuilder::new()
    .flexible(true)
    .from_path(path)
    .map_err(|e| AnalystError::load(&display, e.to_string()))?;

  let columns: Vec<String> = reader
    .headers()
    .map_err(|e| AnalystError::load(&display, e.to_string()))?
    .iter()
    .map(|h| h.trim().to_string())
    .collect();

  let mut raw_rows: Vec<Vec<String>> = Vec::new();
  for record in reader.records() {
    let record = record.map_err(|e| AnalystError::load(&display, e.to_string()))?;
    let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
    // Flexible CSVs can come up short; pad so every row is rectangular.
    row.resize(columns.len(), String::new());
    row.truncate(columns.len());
    raw_rows.push(row);
  }

  Ok(infer_result_set(columns, raw_rows))
}

fn read_excel(path: &Path) -> Result<ResultSet, AnalystError> {
  let display = path.display().to_string();

  let mut workbook =
    open_workbook_auto(path).map_err(|e| AnalystError::load(&display, e.to_string()))?;

  let range = workbook
    .worksheet_range_at(0)
    .ok_or_else(|| AnalystError::load(&display, "workbook has no worksheets"))?
    .map_err(|e| AnalystError::load(&display, e.to_string()))?;

  let mut rows = range.rows();
  let header = rows
    .next()
    .ok_or_else(|| AnalystError::load(&display, "worksheet is empty"))?;

  let columns: Vec<String> = header
    .iter()
    .enumerate()
    .map(|(i, cell)| {
      let name = cell.to_string().trim().to_string();
      if name.is_empty() {
        format!("column_{i}")
      } else {
        name
      }
    })
    .collect();

  let raw_rows: Vec<Vec<String>> = rows
    .map(|row| {
      let mut cells: Vec<String> = row
        .iter()
        .map(|cell| match cell {
          Data::Empty => String::new(),
          other => other.to_string(),
        })
        .collect();
      cells.resize(columns.len(), String::new());
      cells.truncate(columns.len());
      cells
    })
    .collect();

  Ok(infer_result_set(columns, raw_rows))
}

/// Column-wide type inference over raw string cells: a column where every
/// non-empty cell parses as an integer becomes Integer, numeric becomes
/// Real, anything else Text. Empty cells become Null.
fn infer_result_set(columns: Vec<String>, raw_rows: Vec<Vec<String>>) -> ResultSet {
  #[derive(Clone, Copy, PartialEq)]
  enum ColumnType {
    Integer,
    Real,
    Text,
  }

  let mut types = vec![ColumnType::Integer; columns.len()];
  for row in &raw_rows {
    for (i, cell) in row.iter().enumerate() {
      let cell = cell.trim();
      if cell.is_empty() {
        continue;
      }
      types[i] = match types[i] {
        ColumnType::Integer if cell.parse::<i64>().is_ok() => ColumnType::Integer,
        ColumnType::Integer | ColumnType::Real if cell.parse::<f64>().is_ok() => ColumnType::Real,
        _ => ColumnType::Text,
      };
    }
  }

  let rows = raw_rows
    .into_iter()
    .map(|row| {
      row
        .into_iter()
        .enumerate()
        .map(|(i, cell)| {
          let trimmed = cell.trim();
          if trimmed.is_empty() {
            return Value::Null;
          }
          match types[i] {
            ColumnType::Integer => trimmed
              .parse::<i64>()
              .map(Value::Integer)
              .unwrap_or_else(|_| Value::Text(trimmed.to_string())),
            ColumnType::Real => trimmed
              .parse::<f64>()
              .map(Value::Real)
              .unwrap_or_else(|_| Value::Text(trimmed.to_string())),
            ColumnType::Text => Value::Text(trimmed.to_string()),
          }
        })
        .collect()
    })
    .collect();

  ResultSet { columns, rows }
}
