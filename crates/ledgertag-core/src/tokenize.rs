//! Tokenizer for transaction text
//!
//! Splits text on maximal runs of ASCII letters and digits, lowercases every
//! token and appends canonical category tokens from a synonym table. The
//! synonym table is plain data so new domain terms can be added through
//! configuration.

use serde::{Deserialize, Serialize};

/// A synonym rule: any token containing `trigger` also emits `canonical`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synonym {
    pub trigger: String,
    pub canonical: String,
}

impl Synonym {
    pub fn new(trigger: &str, canonical: &str) -> Self {
        Self {
            trigger: trigger.to_lowercase(),
            canonical: canonical.to_lowercase(),
        }
    }
}

/// Built-in synonym table (membership dues split by age group)
pub fn default_synonyms() -> Vec<Synonym> {
    vec![
        Synonym::new("jeugd", "youth"),
        Synonym::new("junior", "youth"),
        Synonym::new("kinder", "youth"),
        Synonym::new("senior", "adult"),
        Synonym::new("volwassen", "adult"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenizer {
    synonyms: Vec<Synonym>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(default_synonyms())
    }
}

impl Tokenizer {
    pub fn new(synonyms: Vec<Synonym>) -> Self {
        let synonyms = synonyms
            .into_iter()
            .map(|s| Synonym::new(&s.trigger, &s.canonical))
            .filter(|s| !s.trigger.is_empty() && !s.canonical.is_empty())
            .collect();
        Self { synonyms }
    }

    /// Tokenizer without synonym expansion
    pub fn plain() -> Self {
        Self {
            synonyms: Vec::new(),
        }
    }

    pub fn synonyms(&self) -> &[Synonym] {
        &self.synonyms
    }

    /// Tokenize text into lowercase tokens plus synonym expansions.
    ///
    /// Duplicates are kept: the output is a term-frequency multiset.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for word in basic_tokens(text) {
            let expansions: Vec<&str> = self
                .synonyms
                .iter()
                .filter(|s| word.contains(s.trigger.as_str()))
                .map(|s| s.canonical.as_str())
                .collect();
            tokens.push(word);
            tokens.extend(expansions.into_iter().map(str::to_string));
        }
        tokens
    }
}

/// Maximal runs of ASCII alphanumerics, lowercased
fn basic_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
}
