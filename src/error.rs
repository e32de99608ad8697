use thiserror::Error;

/// Classification of backing-store failures, used by the executor to decide
/// between rewriting the message and attempting a repair pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
  TableNotFound,
  Syntax,
  Engine,
}

#[derive(Error, Debug)]
pub enum AnalystError {
  #[error("Configuration error: {message}")]
  Configuration { message: String },

  #[error("No tables loaded. Load a CSV or Excel file first.")]
  NoTablesLoaded,

  #[error("Generation failed: {message}")]
  Generation { message: String },

  #[error("{message}")]
  Query { kind: QueryErrorKind, message: String },

  #[error("Failed to load {path}: {message}")]
  Load { path: String, message: String },
}

impl AnalystError {
  pub fn configuration(message: impl Into<String>) -> Self {
    Self::Configuration { message: message.into() }
  }

  pub fn generation(message: impl Into<String>) -> Self {
    Self::Generation { message: message.into() }
  }

  pub fn table_not_found(message: impl Into<String>) -> Self {
    Self::Query { kind: QueryErrorKind::TableNotFound, message: message.into() }
  }

  pub fn syntax(message: impl Into<String>) -> Self {
    Self::Query { kind: QueryErrorKind::Syntax, message: message.into() }
  }

  pub fn engine(message: impl Into<String>) -> Self {
    Self::Query { kind: QueryErrorKind::Engine, message: message.into() }
  }

  pub fn load(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Load { path: path.into(), message: message.into() }
  }

  /// Query failure classification, if this is a query failure at all.
  pub fn query_kind(&self) -> Option<QueryErrorKind> {
    match self {
      Self::Query { kind, .. } => Some(*kind),
      _ => None,
    }
  }
}
