//! The end-to-end pipeline: build prompt, generate, sanitize, execute,
//! summarize. Strictly linear; each stage converts its own failures into the
//! analysis result rather than letting them escape, and the only in-stage
//! retries are the executor's single repair pass and the generation client's
//! model fallback list.

use crate::chart::{self, ChartSpec};
use crate::error::{AnalystError, QueryErrorKind};
use crate::generation::{GenerationClient, GenerationConfig, GenerationOptions};
use crate::insight;
use crate::loader;
use crate::prompt;
use crate::sanitize;
use crate::schema::{ResultSet, SchemaStore, TableInfo};
use crate::store::{Backend, PostgresConfig};
use crate::{executor, translate};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Per-question switches for the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeOptions {
  /// Summarize results without the generation endpoint.
  pub fast_insights: bool,
  /// Attach a chart suggestion to successful results.
  pub chart: bool,
  /// Translate non-English questions before SQL generation.
  pub translate: bool,
}

/// The outcome of one question. Immutable once created; appended to the
/// session history.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
  pub question: String,
  pub sql_query: String,
  #[serde(serialize_with = "serialize_records")]
  pub results: ResultSet,
  pub insights: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub chart: Option<ChartSpec>,
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub warning: Option<String>,
  pub asked_at: DateTime<Utc>,
}

/// The payload's `results` field is the row mappings, not the columnar form.
fn serialize_records<S: serde::Serializer>(
  results: &ResultSet,
  serializer: S,
) -> Result<S::Ok, S::Error> {
  results.records().serialize(serializer)
}

impl AnalysisResult {
  fn failure(question: &str, error: &AnalystError) -> Self {
    Self {
      question: question.to_string(),
      sql_query: String::new(),
      results: ResultSet::default(),
      insights: String::new(),
      chart: None,
      success: false,
      error: Some(error.to_string()),
      warning: None,
      asked_at: Utc::now(),
    }
  }
}

/// One analysis session: schema metadata, backing store, generation client,
/// and the ordered history of everything asked so far.
pub struct Analyst {
  schema: SchemaStore,
  backend: Backend,
  generation: GenerationClient,
  history: Vec<AnalysisResult>,
}

impl Analyst {
  /// Session over the embedded in-memory store.
  pub fn new() -> Result<Self, AnalystError> {
    Self::with_generation_config(GenerationConfig::from_env())
  }

  pub fn with_generation_config(config: GenerationConfig) -> Result<Self, AnalystError> {
    Ok(Self {
      schema: SchemaStore::new(),
      backend: Backend::memory()?,
      generation: GenerationClient::with_config(config),
      history: Vec::new(),
    })
  }

  /// Session over a networked Postgres store. Existing tables are
  /// introspected into the schema store so they can be asked about
  /// immediately.
  pub async fn connect_postgres(
    pg: &PostgresConfig,
    config: GenerationConfig,
  ) -> Result<Self, AnalystError> {
    let backend = Backend::postgres(pg).await?;

    let mut schema = SchemaStore::new();
    for table in backend.existing_tables().await? {
      schema.insert(table);
    }

    Ok(Self {
      schema,
      backend,
      generation: GenerationClient::with_config(config),
      history: Vec::new(),
    })
  }

  pub fn schema(&self) -> &SchemaStore {
    &self.schema
  }

  pub fn history(&self) -> &[AnalysisResult] {
    &self.history
  }

  /// Load a CSV/Excel file into the backing store, replacing any existing
  /// table of the same name. Schema metadata is recorded only after the
  /// store load succeeds, with the row count the store reports.
  pub async fn load_file(
    &mut self,
    path: &Path,
    table_name: Option<&str>,
  ) -> Result<String, AnalystError> {
    let name = loader::table_name_for(path, table_name);
    let data = loader::read_table(path)?;

    let row_count = self.backend.load_table(&name, &data).await?;
    self.schema.insert(TableInfo::from_result_set(name.clone(), &data, row_count));

    tracing::info!(table = %name, rows = row_count, "loaded table");
    Ok(format!("Loaded {row_count} rows into table '{name}'"))
  }

  /// Answer one question. Never returns an error; every failure is folded
  /// into the result, which is also appended to the session history.
  pub async fn analyze(&mut self, question: &str, options: AnalyzeOptions) -> AnalysisResult {
    let result = self.analyze_inner(question, options).await;
    self.history.push(result.clone());
    result
  }

  async fn analyze_inner(&mut self, question: &str, options: AnalyzeOptions) -> AnalysisResult {
    // Reject before any HTTP: an empty store means nothing to ask about.
    if self.schema.is_empty() {
      return AnalysisResult::failure(question, &AnalystError::NoTablesLoaded);
    }

    let asked_at = Utc::now();
    let mut warning: Option<String> = None;
    let dialect = self.backend.dialect();
    let first_table =
      self.schema.first().map(|t| t.name.clone()).unwrap_or_default();

    let effective_question = if options.translate {
      let (text, translated) = translate::to_english(&self.generation, question).await;
      if translated {
        tracing::debug!(original = question, translated = %text, "question translated");
      }
      text
    } else {
      question.to_string()
    };

    let sql = match self.nl_to_sql(&effective_question, dialect).await {
      Ok(sql) => sql,
      Err(e) => {
        warning = Some(format!("Generation unavailable ({e}); used a fallback query."));
        sanitize::fallback_query(&effective_question, &first_table, dialect)
      }
    };
    tracing::debug!(%sql, "executing");

    let (sql, results, warning) = match executor::run(&self.backend, &self.schema, &sql).await {
      Ok(results) => (sql, results, warning),
      Err(error) if error.query_kind() == Some(QueryErrorKind::Syntax) => {
        // Last-resort degradation: show a sample of the first table rather
        // than failing the whole question on unparseable SQL.
        let fallback = format!("SELECT * FROM {} LIMIT 5", dialect.quote(&first_table));
        match self.backend.execute(&fallback).await {
          Ok(results) => {
            let note = format!("Original query failed ({error}); showing sample data instead.");
            (fallback, results, Some(note))
          }
          Err(_) => return AnalysisResult::failure(question, &error),
        }
      }
      Err(error) => return AnalysisResult::failure(question, &error),
    };

    let insights = if options.fast_insights {
      insight::fast_insight(&results)
    } else {
      insight::llm_insight(&self.generation, question, &sql, &results).await
    };

    let chart = if options.chart { chart::select_chart(&sql, question, &results) } else { None };

    AnalysisResult {
      question: question.to_string(),
      sql_query: sql,
      results,
      insights,
      chart,
      success: true,
      error: None,
      warning,
      asked_at,
    }
  }

  /// Build the prompt and run the model fallback list, sanitizing whatever
  /// comes back. Errors here mean the endpoint was unusable; the caller
  /// falls back to a deterministic query.
  async fn nl_to_sql(
    &self,
    question: &str,
    dialect: sanitize::Dialect,
  ) -> Result<String, AnalystError> {
    let prompt = prompt::sql_prompt(&self.schema, question)?;

    let raw = self
      .generation
      .generate_with_fallback(&prompt, Some(&GenerationOptions::sql()))
      .await?;

    let cleaned = sanitize::clean_sql(&raw, &self.schema, dialect);
    if !sanitize::starts_with_sql_keyword(&cleaned) {
      return Err(AnalystError::generation("response contained no recognizable SQL"));
    }

    Ok(cleaned)
  }
}
