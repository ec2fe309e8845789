//! Term-frequency / IDF tag scorer
//!
//! Each tag keeps a bag of the tokens seen in its training rows. A query is
//! scored against every tag as
//!
//! ```text
//! score(tag) = Σ (tf_tag(t) / total_tag) · tf_query(t) · idf(t)
//! idf(t)     = ln(1 + N / (1 + df(t)))
//! ```
//!
//! Tags that share no token with the query score exactly zero and are left
//! out of the ranking. Ties keep the order in which tags were first seen.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Suggestion, TagSummary};

/// Token counts for one tag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagProfile {
    pub tag: String,
    pub term_freq: HashMap<String, u64>,
    pub total_tokens: u64,
    pub documents: u64,
}

impl TagProfile {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }
}

/// Corpus-wide document statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusStatistics {
    pub total_docs: u64,
    pub doc_freq: HashMap<String, u64>,
}

impl CorpusStatistics {
    /// Smoothed inverse document frequency; positive for every token
    pub fn idf(&self, token: &str) -> f64 {
        let df = self.doc_freq.get(token).copied().unwrap_or(0) as f64;
        (1.0 + self.total_docs as f64 / (1.0 + df)).ln()
    }
}

/// Count query tokens. Ordered so that summation order is reproducible.
pub fn query_term_frequencies(tokens: &[String]) -> BTreeMap<&str, u64> {
    let mut tf = BTreeMap::new();
    for token in tokens {
        *tf.entry(token.as_str()).or_insert(0) += 1;
    }
    tf
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeuristicScorer {
    /// Profiles in first-seen order
    profiles: Vec<TagProfile>,
    index: HashMap<String, usize>,
    stats: CorpusStatistics,
}

impl HeuristicScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one training document
    pub fn add_document(&mut self, tag: &str, tokens: &[String]) {
        if tokens.is_empty() {
            return;
        }

        self.stats.total_docs += 1;
        let unique: HashSet<&String> = tokens.iter().collect();
        for token in unique {
            *self.stats.doc_freq.entry(token.clone()).or_insert(0) += 1;
        }

        let idx = match self.index.get(tag) {
            Some(idx) => *idx,
            None => {
                self.profiles.push(TagProfile::new(tag));
                self.index.insert(tag.to_string(), self.profiles.len() - 1);
                self.profiles.len() - 1
            }
        };
        let profile = &mut self.profiles[idx];
        profile.documents += 1;
        for token in tokens {
            *profile.term_freq.entry(token.clone()).or_insert(0) += 1;
            profile.total_tokens += 1;
        }
    }

    pub fn stats(&self) -> &CorpusStatistics {
        &self.stats
    }

    pub fn total_docs(&self) -> u64 {
        self.stats.total_docs
    }

    pub fn vocabulary_size(&self) -> usize {
        self.stats.doc_freq.len()
    }

    pub fn profile(&self, tag: &str) -> Option<&TagProfile> {
        self.index.get(tag).map(|idx| &self.profiles[*idx])
    }

    /// Tags in first-seen order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.tag.as_str())
    }

    pub fn tag_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn summaries(&self) -> Vec<TagSummary> {
        self.profiles
            .iter()
            .map(|p| TagSummary {
                tag: p.tag.clone(),
                documents: p.documents,
                tokens: p.total_tokens,
            })
            .collect()
    }

    /// Score one tag against query term frequencies; zero for unknown tags
    pub fn score(&self, tag: &str, query_tf: &BTreeMap<&str, u64>) -> f64 {
        let Some(profile) = self.profile(tag) else {
            return 0.0;
        };
        let total = profile.total_tokens.max(1) as f64;

        let mut score = 0.0;
        for (token, count) in query_tf {
            let tag_tf = profile.term_freq.get(*token).copied().unwrap_or(0);
            if tag_tf == 0 {
                continue;
            }
            score += (tag_tf as f64 / total) * (*count as f64) * self.stats.idf(token);
        }
        score
    }

    /// Rank all tags with positive score, best first
    pub fn rank(&self, tokens: &[String]) -> Vec<Suggestion> {
        if self.stats.total_docs == 0 || tokens.is_empty() {
            return Vec::new();
        }

        let query_tf = query_term_frequencies(tokens);
        let mut suggestions: Vec<Suggestion> = self
            .profiles
            .iter()
            .map(|p| Suggestion::new(p.tag.clone(), self.score(&p.tag, &query_tf)))
            .filter(|s| s.score > 0.0)
            .collect();

        // Stable: equal scores keep first-seen tag order
        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
        suggestions
    }
}
