//! Counterparty account → tag fallback
//!
//! When the text model has no evidence, the tag most often used with the same
//! counterparty account is still a useful guess.

use std::collections::HashMap;

/// Tag usage counts per normalized counterparty
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterpartyIndex {
    /// Counts per tag in first-seen order
    counts: HashMap<String, Vec<(String, u64)>>,
}

/// Trim and uppercase an account identifier
pub fn normalize_counterparty(value: &str) -> String {
    value.trim().to_uppercase()
}

impl CounterpartyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, counterparty: &str, tag: &str) {
        let key = normalize_counterparty(counterparty);
        if key.is_empty() {
            return;
        }
        let tags = self.counts.entry(key).or_default();
        match tags.iter_mut().find(|(t, _)| t == tag) {
            Some((_, count)) => *count += 1,
            None => tags.push((tag.to_string(), 1)),
        }
    }

    /// Most frequent tag for a counterparty; ties go to the tag seen first
    pub fn best(&self, counterparty: &str) -> Option<&str> {
        let tags = self.counts.get(&normalize_counterparty(counterparty))?;
        let mut best: Option<&(String, u64)> = None;
        for entry in tags {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(tag, _)| tag.as_str())
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
