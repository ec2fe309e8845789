//! Tag recommendation engine
//!
//! [`TagRecommender`] owns the model state built from the configured sources
//! and answers recommendation requests. State is created empty, loaded lazily
//! on the first request and rebuilt whenever a source's modification time
//! moves past the watermark of the last successful load.
//!
//! A load pass builds a complete new [`ModelState`] before replacing the old
//! one, so a failed pass leaves the previous state servable.
//!
//! The engine is single-writer: hosts that share it across threads must
//! serialize access (the server keeps it behind a mutex).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::amount::{amount_token, parse_amount};
use crate::classifier::{self, TrainedModel};
use crate::config::{RecommenderConfig, MAX_SCORE_PRECISION};
use crate::corpus::{inspect_source, CorpusBuilder, SheetSummary};
use crate::counterparty::CounterpartyIndex;
use crate::error::{Error, Result};
use crate::heuristic::HeuristicScorer;
use crate::models::{
    FieldValue, ModelStats, StrategyKind, Suggestion, Transaction, QUERY_AMOUNT_FIELDS,
    QUERY_TEXT_FIELDS,
};
use crate::source::{self, CsvSource};
use crate::tokenize::Tokenizer;

/// How queries are scored, chosen once per load pass
#[derive(Debug, Clone)]
pub enum ScoringStrategy {
    /// Term-frequency / IDF scoring only
    Heuristic(HeuristicScorer),
    /// Trained classifier, with the heuristic scorer kept for calls where
    /// prediction fails
    Trained {
        model: TrainedModel,
        fallback: HeuristicScorer,
    },
}

impl ScoringStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            ScoringStrategy::Heuristic(_) => StrategyKind::Heuristic,
            ScoringStrategy::Trained { .. } => StrategyKind::Classifier,
        }
    }

    pub fn heuristic(&self) -> &HeuristicScorer {
        match self {
            ScoringStrategy::Heuristic(scorer) => scorer,
            ScoringStrategy::Trained { fallback, .. } => fallback,
        }
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        match self {
            ScoringStrategy::Heuristic(_) => None,
            ScoringStrategy::Trained { model, .. } => Some(model),
        }
    }

    /// Rank suggestions for a query, best first
    fn rank(&self, text: &str, tokens: &[String]) -> Vec<Suggestion> {
        match self {
            ScoringStrategy::Heuristic(scorer) => scorer.rank(tokens),
            ScoringStrategy::Trained { model, fallback } => match model.predict(text) {
                Ok(predictions) => predictions,
                Err(e) => {
                    debug!("Classifier prediction unavailable ({}); using heuristic", e);
                    fallback.rank(tokens)
                }
            },
        }
    }
}

/// Everything a successful load pass produces
#[derive(Debug, Clone)]
pub struct ModelState {
    pub strategy: ScoringStrategy,
    pub counterparties: CounterpartyIndex,
    /// Newest source modification time seen by this pass
    pub watermark: SystemTime,
    /// Whether the supplementary source contributed to this pass
    pub supplementary_loaded: bool,
}

pub struct TagRecommender {
    config: RecommenderConfig,
    tokenizer: Tokenizer,
    allowed: HashSet<String>,
    state: Option<ModelState>,
}

impl TagRecommender {
    /// Create an engine with empty state; nothing is read until needed
    pub fn new(config: RecommenderConfig) -> Self {
        let tokenizer = Tokenizer::new(config.synonyms.clone());
        let allowed = config.allowed_tags.iter().cloned().collect();
        Self {
            config,
            tokenizer,
            allowed,
            state: None,
        }
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn state(&self) -> Option<&ModelState> {
        self.state.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    /// Watermark of the last successful load
    pub fn watermark(&self) -> Option<SystemTime> {
        self.state.as_ref().map(|s| s.watermark)
    }

    /// Reload if any source changed since the last successful load.
    ///
    /// A supplementary source appearing or disappearing counts as a change.
    ///
    /// Returns whether usable state is available after the call.
    pub fn refresh(&mut self) -> bool {
        let newest = match self.newest_modification() {
            Ok(newest) => newest,
            Err(e) => {
                warn!("Training sources unavailable: {}", e);
                return false;
            }
        };

        if let Some(state) = &self.state {
            let supplementary_present = self.supplementary().is_some();
            if newest <= state.watermark && supplementary_present == state.supplementary_loaded {
                return true;
            }
            info!("Training sources changed; reloading");
        }

        self.load_pass(newest)
    }

    /// Rebuild from the sources regardless of the watermark
    pub fn reload(&mut self) -> bool {
        match self.newest_modification() {
            Ok(newest) => self.load_pass(newest),
            Err(e) => {
                warn!("Training sources unavailable: {}", e);
                false
            }
        }
    }

    /// Newest modification time across configured sources.
    ///
    /// The primary source must exist; a missing supplementary source is
    /// ignored.
    fn newest_modification(&self) -> Result<SystemTime> {
        let primary = &self.config.primary;
        if !primary.exists() {
            return Err(Error::Source(format!(
                "Training source not found: {}",
                primary.display()
            )));
        }
        let mut newest = source::modified(primary)?;

        if let Some(supplementary) = self.supplementary() {
            match source::modified(supplementary) {
                Ok(mtime) if mtime > newest => newest = mtime,
                Ok(_) => {}
                Err(e) => warn!(
                    "Cannot stat supplementary source {}: {}",
                    supplementary.display(),
                    e
                ),
            }
        }
        Ok(newest)
    }

    fn supplementary(&self) -> Option<&Path> {
        self.config
            .supplementary
            .as_deref()
            .filter(|path| path.exists())
    }

    /// One full load pass; replaces state only on success
    fn load_pass(&mut self, watermark: SystemTime) -> bool {
        let mut builder = CorpusBuilder::new(&self.tokenizer, &self.allowed);

        let mut paths: Vec<PathBuf> = vec![self.config.primary.clone()];
        match &self.config.supplementary {
            Some(path) if path.exists() => paths.push(path.clone()),
            Some(path) => warn!("Supplementary source not found: {}", path.display()),
            None => {}
        }

        for path in &paths {
            let source = CsvSource::new(path);
            match builder.add_source(&source) {
                Ok(summaries) => {
                    let used: usize = summaries.iter().map(|s| s.used).sum();
                    debug!(
                        "Loaded {} rows from {} ({} sheets)",
                        used,
                        path.display(),
                        summaries.len()
                    );
                }
                Err(e) => error!("Failed to read training source {}: {}", path.display(), e),
            }
        }

        let corpus = builder.finish();
        if corpus.total_docs() == 0 {
            warn!("No usable training rows found; keeping previous state");
            return false;
        }

        let distinct_tags = corpus.distinct_tags();
        let strategy = if !self.config.classifier.enabled {
            ScoringStrategy::Heuristic(corpus.scorer)
        } else {
            match classifier::train(&corpus.examples, &self.config.classifier) {
                Ok(model) => ScoringStrategy::Trained {
                    model,
                    fallback: corpus.scorer,
                },
                Err(e) => {
                    info!("Classifier not trained ({}); using heuristic scorer", e);
                    ScoringStrategy::Heuristic(corpus.scorer)
                }
            }
        };

        info!(
            "Training data loaded: {} documents, {} tags, {} tokens ({} scoring)",
            strategy.heuristic().total_docs(),
            distinct_tags,
            strategy.heuristic().vocabulary_size(),
            strategy.kind()
        );

        self.state = Some(ModelState {
            strategy,
            counterparties: corpus.counterparties,
            watermark,
            supplementary_loaded: paths.len() > 1,
        });
        true
    }

    /// Query text for a transaction: recognized text fields in fixed order,
    /// then the amount token
    pub fn query_text(transaction: &Transaction) -> String {
        let mut parts: Vec<String> = QUERY_TEXT_FIELDS
            .iter()
            .filter_map(|name| transaction.get(name))
            .filter_map(FieldValue::as_text)
            .collect();

        let amount = QUERY_AMOUNT_FIELDS
            .iter()
            .filter_map(|name| transaction.get(name))
            .find_map(|value| match value {
                FieldValue::Number(n) => Some(*n),
                FieldValue::Text(s) => parse_amount(s),
            });
        if let Some(token) = amount.and_then(amount_token) {
            parts.push(token);
        }

        parts.join(" ")
    }

    /// Recommend up to `top_k` tags for a transaction, best first
    pub fn recommend(&mut self, transaction: &Transaction, top_k: usize) -> Vec<Suggestion> {
        if !self.refresh() && self.state.is_none() {
            return Vec::new();
        }
        let Some(state) = &self.state else {
            return Vec::new();
        };

        let text = Self::query_text(transaction);
        let tokens = self.tokenizer.tokenize(&text);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut suggestions: Vec<Suggestion> = state
            .strategy
            .rank(&text, &tokens)
            .into_iter()
            .filter(|s| self.allowed.is_empty() || self.allowed.contains(&s.tag))
            .take(top_k)
            .collect();

        for suggestion in &mut suggestions {
            suggestion.score = round_to(suggestion.score, self.config.score_precision);
        }
        suggestions
    }

    /// Recommend with the configured default `top_k`
    pub fn recommend_default(&mut self, transaction: &Transaction) -> Vec<Suggestion> {
        let top_k = self.config.top_k;
        self.recommend(transaction, top_k)
    }

    /// Most frequent tag for a counterparty account, scored `1.0`
    pub fn suggest_by_counterparty(&mut self, counterparty: &str) -> Option<Suggestion> {
        if counterparty.trim().is_empty() {
            return None;
        }
        self.refresh();
        let state = self.state.as_ref()?;
        state
            .counterparties
            .best(counterparty)
            .filter(|tag| self.allowed.is_empty() || self.allowed.contains(*tag))
            .map(|tag| Suggestion::new(tag, 1.0))
    }

    pub fn stats(&self) -> ModelStats {
        let sources = self
            .config
            .sources()
            .iter()
            .map(|p| p.display().to_string())
            .collect();

        let Some(state) = &self.state else {
            return ModelStats::empty(sources);
        };
        let scorer = state.strategy.heuristic();

        ModelStats {
            loaded: true,
            total_docs: scorer.total_docs(),
            vocabulary_size: scorer.vocabulary_size(),
            strategy: Some(state.strategy.kind()),
            classifier_classes: state.strategy.model().map_or(0, |m| m.classes().len()),
            tags: scorer.summaries(),
            watermark: Some(DateTime::<Utc>::from(state.watermark)),
            sources,
        }
    }

    /// Resolved layout and usable rows per sheet of a source, without
    /// touching engine state
    pub fn check_source(&self, path: &Path) -> Result<Vec<SheetSummary>> {
        inspect_source(&CsvSource::new(path), &self.tokenizer, &self.allowed)
    }
}

/// Round for display; applied after ranking so order is unaffected
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits.min(MAX_SCORE_PRECISION) as i32);
    (value * factor).round() / factor
}
