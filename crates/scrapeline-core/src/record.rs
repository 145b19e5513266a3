//! Per-identifier fetch outcomes and their flattened form

use serde_json::{Map, Value};

/// Single-level mapping from field path to value, ready for tabular storage.
pub type FlatRecord = Map<String, Value>;

/// Column carrying the source identifier in every output record
pub const ORIGINAL_ID: &str = "original_id";

/// Outcome of fetching one identifier, before flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// Nested document returned by the remote source
    Document(Value),
    /// Retries exhausted, or the remote answered with field-level errors
    Error { id: String, error: Value },
    /// Remote returned no data for the id
    Empty,
}

impl RawResult {
    /// Error marker produced locally after the last failed attempt
    pub fn exhausted(id: &str, max_retries: u32) -> Self {
        Self::Error {
            id: id.to_string(),
            error: Value::String(format!("Failed after {max_retries} retries")),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_message() {
        let raw = RawResult::exhausted("42", 5);
        assert_eq!(
            raw,
            RawResult::Error {
                id: "42".into(),
                error: Value::String("Failed after 5 retries".into()),
            }
        );
        assert!(raw.is_error());
        assert!(!raw.is_empty());
    }
}
