//! Turns free-form model output into a single executable SQL statement.
//!
//! Everything here is textual: markdown stripping, first-statement
//! extraction, and identifier quoting by substitution. The quoting pass is
//! not grammar-aware, so a column name occurring inside a string literal can
//! be mis-quoted; mitigations are longest-name-first ordering and skipping
//! matches that sit inside an existing quoted span.

use crate::schema::SchemaStore;
use regex::Regex;
use std::cmp::Reverse;

/// Quote style of the engine that will execute the SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
  Sqlite,
  Postgres,
}

impl Dialect {
  /// Identifier quote character for this dialect.
  pub fn quote_char(&self) -> char {
    match self {
      Dialect::Sqlite => '`',
      Dialect::Postgres => '"',
    }
  }

  pub fn quote(&self, identifier: &str) -> String {
    let qc = self.quote_char();
    format!("{qc}{identifier}{qc}")
  }
}

const STATEMENT_KEYWORDS: [&str; 4] = ["SELECT", "INSERT", "UPDATE", "DELETE"];

const LINE_KEYWORDS: [&str; 12] = [
  "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "GROUP", "ORDER", "HAVING", "LIMIT",
  "JOIN", "ON",
];

const DISCURSIVE_PHRASES: [&str; 4] = ["to find", "you would", "here's how", "this query"];

/// Does the string start with a recognized SQL statement keyword?
pub fn starts_with_sql_keyword(sql: &str) -> bool {
  let trimmed = sql.trim_start();
  STATEMENT_KEYWORDS.iter().any(|kw| {
    trimmed.get(..kw.len()).is_some_and(|head| head.eq_ignore_ascii_case(kw))
      && !trimmed[kw.len()..].starts_with(|c: char| c.is_alphanumeric() || c == '_')
  })
}

/// Column names needing quoting: anything with a space or `- . ( )`.
fn needs_quoting(column: &str) -> bool {
  column.contains(' ') || column.contains(['-', '.', '(', ')'])
}

/// Clean raw model output down to one executable statement, with known
/// column names quoted for the target dialect.
///
/// Never fails; if no SQL can be recognized at all the caller should fall
/// back to [`fallback_query`].
pub fn clean_sql(raw: &str, schema: &SchemaStore, dialect: Dialect) -> String {
  let stripped = strip_markup(raw);

  let candidate = match extract_statement(&stripped) {
    Some(statement) => statement,
    None => collect_sql_lines(&stripped),
  };

  quote_columns(&candidate, schema, dialect)
}

/// Remove markdown fences and label prefixes the models like to add.
fn strip_markup(raw: &str) -> String {
  let re = Regex::new(r"(?i)```sql\n?|```\n?|\bSQL:|\bQuery:").expect("valid markup regex");
  re.replace_all(raw, "").trim().to_string()
}

/// Extract the first SELECT/INSERT/UPDATE/DELETE statement, up to the next
/// semicolon or end of text, discarding surrounding prose.
fn extract_statement(text: &str) -> Option<String> {
  let re = Regex::new(r"(?is)\b(?:SELECT|INSERT|UPDATE|DELETE)\b.*?(?:;|\z)")
    .expect("valid statement regex");

  let matched = re.find(text)?;
  let statement = matched.as_str().trim().trim_end_matches(';').trim();
  if statement.is_empty() {
    return None;
  }
  Some(statement.to_string())
}

/// Line-scan fallback: keep only lines that look like SQL, dropping comment
/// lines and discursive prose.
fn collect_sql_lines(text: &str) -> String {
  let mut kept = Vec::new();

  for line in text.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with("--") {
      continue;
    }
    let lower = line.to_lowercase();
    if lower.starts_with("note") || DISCURSIVE_PHRASES.iter().any(|p| lower.contains(p)) {
      continue;
    }
    let first_word = line.split_whitespace().next().unwrap_or("");
    if LINE_KEYWORDS.iter().any(|kw| first_word.eq_ignore_ascii_case(kw)) {
      kept.push(line);
    }
  }

  kept.join(" ").trim().trim_end_matches(';').trim().to_string()
}

/// Quote schema columns containing spaces or punctuation wherever they occur
/// unquoted in `sql`. Longest names go first so a column that is a prefix of
/// another cannot corrupt it. Idempotent.
pub fn quote_columns(sql: &str, schema: &SchemaStore, dialect: Dialect) -> String {
  let columns: Vec<&str> = schema.all_columns().into_iter().filter(|c| needs_quoting(c)).collect();
  quote_names(sql, &columns, dialect)
}

/// Aggressive variant used by the executor's repair pass: quotes every known
/// column, punctuated or not.
pub fn quote_all_columns(sql: &str, schema: &SchemaStore, dialect: Dialect) -> String {
  quote_names(sql, &schema.all_columns(), dialect)
}

fn quote_names(sql: &str, names: &[&str], dialect: Dialect) -> String {
  let mut names: Vec<&str> = names.to_vec();
  names.sort_unstable_by_key(|n| Reverse(n.len()));

  let mut out = sql.to_string();
  for name in names {
    out = quote_occurrences(&out, name, dialect.quote_char());
  }
  out
}

/// Wrap unquoted occurrences of one literal name in the dialect quote char,
/// leaving already-quoted occurrences untouched.
fn quote_occurrences(sql: &str, name: &str, qc: char) -> String {
  if name.is_empty() {
    return sql.to_string();
  }

  // Word-boundary anchors only make sense against word-char edges; a name
  // like "price (usd)" ends on punctuation where `\b` would never match.
  let anchor = |c: Option<char>| {
    if c.is_some_and(|c| c.is_alphanumeric() || c == '_') {
      r"\b"
    } else {
      ""
    }
  };
  let pattern = format!(
    "(?i){}{}{}",
    anchor(name.chars().next()),
    regex::escape(name),
    anchor(name.chars().next_back())
  );
  let re = Regex::new(&pattern).expect("valid identifier regex");

  let mut out = String::with_capacity(sql.len() + name.len());
  let mut last = 0;

  for m in re.find_iter(sql) {
    out.push_str(&sql[last..m.start()]);

    let before = sql[..m.start()].chars().next_back();
    let after = sql[m.end()..].chars().next();
    let adjacent_quote = before == Some(qc) || after == Some(qc);
    // An odd number of preceding quote chars means we are inside a span that
    // an earlier (longer) name already wrapped.
    let inside_quoted = sql[..m.start()].matches(qc).count() % 2 == 1;

    if adjacent_quote || inside_quoted {
      out.push_str(m.as_str());
    } else {
      out.push(qc);
      out.push_str(m.as_str());
      out.push(qc);
    }
    last = m.end();
  }
  out.push_str(&sql[last..]);
  out
}

/// Deterministic last-resort query when no SQL could be recognized (or the
/// generation endpoint is unreachable). Shape picked from the question.
pub fn fallback_query(question: &str, table: &str, dialect: Dialect) -> String {
  let table = if needs_quoting(table) { dialect.quote(table) } else { table.to_string() };
  let q = question.to_lowercase();

  if ["count", "how many", "total"].iter().any(|w| q.contains(w)) {
    format!("SELECT COUNT(*) FROM {table}")
  } else if ["top", "highest", "maximum", "best"].iter().any(|w| q.contains(w)) {
    format!("SELECT * FROM {table} LIMIT 10")
  } else {
    format!("SELECT * FROM {table} LIMIT 5")
  }
}
