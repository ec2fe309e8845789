//! Data models shared by the engine, CLI and server

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction fields that contribute text to a recommendation query, in
/// the order they are concatenated.
pub const QUERY_TEXT_FIELDS: &[&str] = &[
    "mededelingen",
    "omschrijving",
    "naam",
    "rekening",
    "tegenrekening",
    "mutatiesoort",
    "code",
    "memo",
    "description",
];

/// Transaction fields that may carry the amount (first parseable wins)
pub const QUERY_AMOUNT_FIELDS: &[&str] = &["bedrag", "amount"];

/// Transaction field used by the counterparty fallback
pub const COUNTERPARTY_FIELD: &str = "tegenrekening";

/// A single transaction field value as supplied by the request layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Text form of the value, `None` when it is blank
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) if s.trim().is_empty() => None,
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(n.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

/// A transaction to recommend a tag for: field name to value.
///
/// Field names are lowercased on the way in. Unrecognized names are
/// carried but ignored by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "HashMap<String, FieldValue>",
    into = "HashMap<String, FieldValue>"
)]
pub struct Transaction {
    pub fields: HashMap<String, FieldValue>,
}

impl From<HashMap<String, FieldValue>> for Transaction {
    fn from(fields: HashMap<String, FieldValue>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_lowercase(), value))
                .collect(),
        }
    }
}

impl From<Transaction> for HashMap<String, FieldValue> {
    fn from(transaction: Transaction) -> Self {
        transaction.fields
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A ranked tag suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub tag: String,
    /// Probability when produced by the classifier, unbounded non-negative
    /// relevance when produced by the heuristic scorer
    pub score: f64,
}

impl Suggestion {
    pub fn new(tag: impl Into<String>, score: f64) -> Self {
        Self {
            tag: tag.into(),
            score,
        }
    }
}

/// Which scoring path the current model state uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Heuristic,
    Classifier,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Heuristic => "heuristic",
            StrategyKind::Classifier => "classifier",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-tag corpus summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSummary {
    pub tag: String,
    /// Training rows labeled with this tag
    pub documents: u64,
    /// Total tokens contributed by those rows
    pub tokens: u64,
}

/// Snapshot of the loaded model for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub loaded: bool,
    pub total_docs: u64,
    pub vocabulary_size: usize,
    pub strategy: Option<StrategyKind>,
    pub classifier_classes: usize,
    pub tags: Vec<TagSummary>,
    pub watermark: Option<DateTime<Utc>>,
    pub sources: Vec<String>,
}

impl ModelStats {
    /// Stats for an engine with no successful load yet
    pub fn empty(sources: Vec<String>) -> Self {
        Self {
            loaded: false,
            total_docs: 0,
            vocabulary_size: 0,
            strategy: None,
            classifier_classes: 0,
            tags: Vec::new(),
            watermark: None,
            sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_as_text() {
        assert_eq!(FieldValue::from("  ").as_text(), None);
        assert_eq!(FieldValue::from("koffie").as_text().as_deref(), Some("koffie"));
        assert_eq!(FieldValue::from(12.0).as_text().as_deref(), Some("12"));
        assert_eq!(FieldValue::from(25.5).as_text().as_deref(), Some("25.5"));
    }

    #[test]
    fn test_transaction_deserializes_mixed_values() {
        let tx: Transaction =
            serde_json::from_str(r#"{"Mededelingen": "koffie", "bedrag": 25.5}"#).unwrap();
        assert_eq!(tx.get("mededelingen"), Some(&FieldValue::from("koffie")));
        assert_eq!(tx.get("bedrag"), Some(&FieldValue::Number(25.5)));
    }

    #[test]
    fn test_transaction_builder_lowercases_names() {
        let tx = Transaction::new().with("Mededelingen", "huur");
        assert!(tx.get("mededelingen").is_some());
        assert!(!tx.is_empty());
    }
}
