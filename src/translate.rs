//! Optional translation pre-stage: detect non-English questions and route
//! them through the generation client before SQL generation.

use crate::generation::{GenerationClient, GenerationOptions};
use crate::prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
  English,
  Other,
}

const ENGLISH_WORDS: [&str; 22] = [
  "what", "show", "get", "find", "list", "count", "sum", "average", "top", "highest", "lowest",
  "how", "which", "where", "when", "why", "the", "and", "or", "of", "in", "for",
];

/// Cheap detection: enough English stop-words means English; any non-ASCII
/// character suggests another language; otherwise assume English.
pub fn detect_language(text: &str) -> Language {
  let lower = text.to_lowercase();
  let english_hits = lower
    .split(|c: char| !c.is_alphanumeric())
    .filter(|word| ENGLISH_WORDS.contains(word))
    .count();

  if english_hits >= 2 {
    return Language::English;
  }
  if text.chars().any(|c| !c.is_ascii()) {
    return Language::Other;
  }
  Language::English
}

/// Translate a question to English when needed. Returns the text to use and
/// whether a translation actually happened; any failure falls back to the
/// original text.
pub async fn to_english(client: &GenerationClient, text: &str) -> (String, bool) {
  if detect_language(text) == Language::English {
    return (text.to_string(), false);
  }

  let prompt = prompt::translation_prompt(text);
  match client.generate_with_fallback(&prompt, Some(&GenerationOptions::translation())).await {
    Ok(translated) => {
      let cleaned = clean_translation(&translated);
      if cleaned.is_empty() {
        (text.to_string(), false)
      } else {
        (cleaned, true)
      }
    }
    Err(e) => {
      tracing::debug!(error = %e, "translation failed, keeping original question");
      (text.to_string(), false)
    }
  }
}

/// Strip the label prefixes and quoting models wrap translations in.
fn clean_translation(raw: &str) -> String {
  let mut text = raw.trim();
  for prefix in ["translation:", "english:", "translated text:"] {
    if text.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)) {
      text = text[prefix.len()..].trim_start();
    }
  }
  text.trim_matches('"').trim().to_string()
}
