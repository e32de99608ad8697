//! HTTP client for the local text-generation endpoint.
//!
//! One POST per call, no caching and no streaming. The only retry behavior
//! is walking an ordered list of model names until one produces a non-empty
//! response; every failure shape (network error, non-200 status, missing or
//! empty `response` field) collapses to [`AnalystError::Generation`].

use crate::error::AnalystError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the generation client.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
  /// Base URL of the generation endpoint (e.g. "http://localhost:11434").
  pub base_url: String,
  /// Models to try in order until one yields a non-empty response.
  pub models: Vec<String>,
  /// Request timeout in seconds.
  pub timeout_secs: u64,
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:11434".to_string(),
      models: vec!["sqlcoder".to_string(), "llama3".to_string()],
      timeout_secs: 60,
    }
  }
}

impl GenerationConfig {
  /// Build a config from environment variables, falling back to defaults.
  ///
  /// `ASKQL_OLLAMA_URL`, `ASKQL_MODELS` (comma-separated, in fallback
  /// order), `ASKQL_TIMEOUT_SECS`.
  pub fn from_env() -> Self {
    let defaults = Self::default();

    let base_url = std::env::var("ASKQL_OLLAMA_URL").unwrap_or(defaults.base_url);

    let models = std::env::var("ASKQL_MODELS")
      .map(|raw| {
        raw
          .split(',')
          .map(str::trim)
          .filter(|m| !m.is_empty())
          .map(str::to_string)
          .collect::<Vec<_>>()
      })
      .ok()
      .filter(|models| !models.is_empty())
      .unwrap_or(defaults.models);

    let timeout_secs = std::env::var("ASKQL_TIMEOUT_SECS")
      .ok()
      .and_then(|v| v.parse().ok())
      .unwrap_or(defaults.timeout_secs);

    Self { base_url, models, timeout_secs }
  }
}

/// Sampling options forwarded to the endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationOptions {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub num_predict: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub top_p: Option<f32>,
}

impl GenerationOptions {
  /// Tight, deterministic settings for SQL generation.
  pub fn sql() -> Self {
    Self { temperature: Some(0.0), num_predict: Some(150), top_p: Some(0.9) }
  }

  /// Short-answer settings for result summaries.
  pub fn insight() -> Self {
    Self { temperature: Some(0.2), num_predict: Some(80), top_p: None }
  }

  /// Settings for question translation.
  pub fn translation() -> Self {
    Self { temperature: Some(0.1), num_predict: Some(100), top_p: None }
  }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
  model: &'a str,
  prompt: &'a str,
  stream: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  options: Option<&'a GenerationOptions>,
}

#[derive(Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  response: String,
}

/// HTTP client for the generation endpoint.
pub struct GenerationClient {
  client: Client,
  config: GenerationConfig,
}

impl Default for GenerationClient {
  fn default() -> Self {
    Self::new()
  }
}

impl GenerationClient {
  /// Create a client from environment configuration.
  pub fn new() -> Self {
    Self::with_config(GenerationConfig::from_env())
  }

  pub fn with_config(config: GenerationConfig) -> Self {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .expect("Failed to create HTTP client");

    Self { client, config }
  }

  pub fn config(&self) -> &GenerationConfig {
    &self.config
  }

  /// Issue one generation request against a specific model.
  pub async fn generate(
    &self,
    model: &str,
    prompt: &str,
    options: Option<&GenerationOptions>,
  ) -> Result<String, AnalystError> {
    let url = format!("{}/api/generate", self.config.base_url);
    let request = GenerateRequest { model, prompt, stream: false, options };

    let response = self
      .client
      .post(&url)
      .json(&request)
      .send()
      .await
      .map_err(|e| AnalystError::generation(format!("request to {url} failed: {e}")))?;

    if !response.status().is_success() {
      return Err(AnalystError::generation(format!(
        "endpoint returned HTTP {} for model '{model}'",
        response.status()
      )));
    }

    let body: GenerateResponse = response
      .json()
      .await
      .map_err(|e| AnalystError::generation(format!("malformed response body: {e}")))?;

    let text = body.response.trim().to_string();
    if text.is_empty() {
      return Err(AnalystError::generation(format!("model '{model}' returned an empty response")));
    }

    Ok(text)
  }

  /// Try each configured model in order until one yields a non-empty
  /// response. Calls are independent; there is no backoff between attempts.
  pub async fn generate_with_fallback(
    &self,
    prompt: &str,
    options: Option<&GenerationOptions>,
  ) -> Result<String, AnalystError> {
    let mut last_error = AnalystError::generation("no models configured");

    for model in &self.config.models {
      tracing::debug!(model, "requesting generation");
      match self.generate(model, prompt, options).await {
        Ok(text) => return Ok(text),
        Err(e) => {
          tracing::debug!(model, error = %e, "generation attempt failed");
          last_error = e;
        }
      }
    }

    Err(last_error)
  }
}
