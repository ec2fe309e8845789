//! Ledgertag Core Library
//!
//! Tag recommendation for bank-transaction descriptions:
//! - Tabular training sources (CSV files or directories of sheets)
//! - Header resolution for tag, text, amount and counterparty columns
//! - Tokenizer with synonym expansion and amount tokens
//! - Heuristic TF/IDF scorer and a trained TF-IDF + logistic regression classifier
//! - Staleness-checked reloading with atomic state replacement
//! - Counterparty fallback for transactions the models cannot place

pub mod amount;
pub mod classifier;
pub mod config;
pub mod corpus;
pub mod counterparty;
pub mod error;
pub mod heuristic;
pub mod models;
pub mod recommend;
pub mod schema;
pub mod source;
pub mod tokenize;

pub use amount::{amount_token, parse_amount};
pub use classifier::{ClassifierParams, TfidfVectorizer, TrainedModel};
pub use config::RecommenderConfig;
pub use corpus::{Corpus, CorpusBuilder, SheetSummary, TrainingExample};
pub use counterparty::CounterpartyIndex;
pub use error::{Error, Result};
pub use heuristic::HeuristicScorer;
pub use models::{FieldValue, ModelStats, StrategyKind, Suggestion, TagSummary, Transaction};
pub use recommend::{ModelState, ScoringStrategy, TagRecommender};
pub use schema::{resolve_columns, ColumnLayout};
pub use source::{Cell, CsvSource, MemorySource, Sheet, TableSource};
pub use tokenize::{Synonym, Tokenizer};
