//! askql - Natural-language questions over tabular data
//!
//! Load CSV/Excel files (or connect to Postgres), ask a question in plain
//! language, and get back the SQL a local generation endpoint produced, the
//! query results, and a short natural-language answer.

pub mod analyst;
pub mod chart;
pub mod error;
pub mod executor;
pub mod generation;
pub mod insight;
pub mod loader;
pub mod prompt;
pub mod sanitize;
pub mod schema;
pub mod store;
pub mod translate;
