//! Recommender configuration
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, else the override in the data dir
//!    (~/.local/share/ledgertag/config.toml) when it exists
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Environment variables (`LEDGERTAG_PRIMARY`, `LEDGERTAG_SUPPLEMENTARY`,
//! `LEDGERTAG_ALLOWED_TAGS`) are applied on top by the caller.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::classifier::ClassifierParams;
use crate::error::{Error, Result};
use crate::tokenize::{default_synonyms, Synonym};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/ledgertag.toml");

/// Largest `score_precision` that still rounds exactly in an f64
pub const MAX_SCORE_PRECISION: u32 = 15;

pub const ENV_PRIMARY: &str = "LEDGERTAG_PRIMARY";
pub const ENV_SUPPLEMENTARY: &str = "LEDGERTAG_SUPPLEMENTARY";
pub const ENV_ALLOWED_TAGS: &str = "LEDGERTAG_ALLOWED_TAGS";

#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderConfig {
    /// Labeled training corpus (CSV file or directory of CSV sheets)
    pub primary: PathBuf,
    /// Optional already-tagged export merged into the corpus
    pub supplementary: Option<PathBuf>,
    /// Tags the engine may learn and suggest; empty means no filter
    pub allowed_tags: Vec<String>,
    pub top_k: usize,
    /// Decimal digits kept in returned scores
    pub score_precision: u32,
    pub classifier: ClassifierParams,
    pub synonyms: Vec<Synonym>,
    pub log_level: String,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            primary: PathBuf::from("data/training"),
            supplementary: None,
            allowed_tags: Vec::new(),
            top_k: 3,
            score_precision: 4,
            classifier: ClassifierParams::default(),
            synonyms: default_synonyms(),
            log_level: "info".to_string(),
        }
    }
}

impl RecommenderConfig {
    /// Config for a primary source with everything else defaulted
    pub fn for_source(primary: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            ..Default::default()
        }
    }

    pub fn with_supplementary(mut self, path: impl Into<PathBuf>) -> Self {
        self.supplementary = Some(path.into());
        self
    }

    pub fn with_allowed_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Load configuration (explicit path or override first, then default)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let override_path = path.map(Path::to_path_buf).or_else(default_config_path);

        let content = match override_path {
            Some(path) if path.exists() => fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?,
            _ => DEFAULT_CONFIG.to_string(),
        };

        parse_config(&content)
    }

    /// Apply overrides from a variable lookup (normally the process env)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(primary) = non_empty(ENV_PRIMARY) {
            self.primary = PathBuf::from(primary.trim());
        }
        if let Some(supplementary) = non_empty(ENV_SUPPLEMENTARY) {
            self.supplementary = Some(PathBuf::from(supplementary.trim()));
        }
        if let Some(tags) = non_empty(ENV_ALLOWED_TAGS) {
            self.allowed_tags = tags
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Configured sources, primary first
    pub fn sources(&self) -> Vec<&Path> {
        let mut sources = vec![self.primary.as_path()];
        if let Some(supplementary) = &self.supplementary {
            sources.push(supplementary.as_path());
        }
        sources
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("ledgertag").join("config.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    sources: Option<RawSources>,
    tags: Option<RawTags>,
    recommend: Option<RawRecommend>,
    classifier: Option<RawClassifier>,
    logging: Option<RawLogging>,
    synonyms: Option<Vec<Synonym>>,
}

#[derive(Debug, Deserialize)]
struct RawSources {
    primary: Option<PathBuf>,
    supplementary: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawTags {
    allowed: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawRecommend {
    top_k: Option<usize>,
    score_precision: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawClassifier {
    enabled: Option<bool>,
    max_iter: Option<usize>,
    learning_rate: Option<f64>,
    l2: Option<f64>,
    tolerance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawLogging {
    level: Option<String>,
}

/// Parse config from TOML content
pub fn parse_config(content: &str) -> Result<RecommenderConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = RecommenderConfig::default();

    if let Some(sources) = raw.sources {
        if let Some(primary) = sources.primary {
            config.primary = primary;
        }
        config.supplementary = sources.supplementary;
    }

    if let Some(tags) = raw.tags {
        if let Some(allowed) = tags.allowed {
            config.allowed_tags = allowed
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
    }

    if let Some(recommend) = raw.recommend {
        if let Some(top_k) = recommend.top_k {
            if top_k == 0 {
                return Err(Error::Config("recommend.top_k must be at least 1".into()));
            }
            config.top_k = top_k;
        }
        if let Some(precision) = recommend.score_precision {
            if precision > MAX_SCORE_PRECISION {
                return Err(Error::Config(format!(
                    "recommend.score_precision must be at most {}",
                    MAX_SCORE_PRECISION
                )));
            }
            config.score_precision = precision;
        }
    }

    if let Some(classifier) = raw.classifier {
        if let Some(enabled) = classifier.enabled {
            config.classifier.enabled = enabled;
        }
        if let Some(max_iter) = classifier.max_iter {
            config.classifier.max_iter = max_iter;
        }
        if let Some(lr) = classifier.learning_rate {
            if !(lr > 0.0 && lr.is_finite()) {
                return Err(Error::Config(
                    "classifier.learning_rate must be positive".into(),
                ));
            }
            config.classifier.learning_rate = lr;
        }
        if let Some(l2) = classifier.l2 {
            config.classifier.l2 = l2;
        }
        if let Some(tolerance) = classifier.tolerance {
            config.classifier.tolerance = tolerance;
        }
    }

    if let Some(logging) = raw.logging {
        if let Some(level) = logging.level {
            config.log_level = level;
        }
    }

    if let Some(synonyms) = raw.synonyms {
        config.synonyms = synonyms;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.primary, PathBuf::from("data/training"));
        assert_eq!(config.supplementary, None);
        assert!(config.allowed_tags.is_empty());
        assert_eq!(config.top_k, 3);
        assert_eq!(config.score_precision, 4);
        assert!(config.classifier.enabled);
        assert_eq!(config.synonyms, default_synonyms());
    }

    #[test]
    fn test_parse_partial_config() {
        let config = parse_config(
            r#"
            [sources]
            primary = "static/category_test_set.csv"
            supplementary = "bank.csv"

            [tags]
            allowed = ["8700;Koffie", " 4500;Huur gebouw ", ""]

            [classifier]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.primary, PathBuf::from("static/category_test_set.csv"));
        assert_eq!(config.supplementary, Some(PathBuf::from("bank.csv")));
        assert_eq!(config.allowed_tags, vec!["8700;Koffie", "4500;Huur gebouw"]);
        assert!(!config.classifier.enabled);
        assert_eq!(config.classifier.max_iter, 300);
        assert_eq!(config.sources().len(), 2);
    }

    #[test]
    fn test_synonyms_replace_defaults() {
        let config = parse_config(
            r#"
            [[synonyms]]
            trigger = "koffie"
            canonical = "drinks"
            "#,
        )
        .unwrap();
        assert_eq!(config.synonyms, vec![Synonym::new("koffie", "drinks")]);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(parse_config("[sources"), Err(Error::Config(_))));
        assert!(matches!(
            parse_config("[recommend]\ntop_k = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_config("[classifier]\nlearning_rate = -1.0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_config("[recommend]\nscore_precision = 400"),
            Err(Error::Config(_))
        ));
        assert_eq!(
            parse_config("[recommend]\nscore_precision = 15")
                .unwrap()
                .score_precision,
            15
        );
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[recommend]\ntop_k = 5\n").unwrap();

        let config = RecommenderConfig::load(Some(&path)).unwrap();
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn test_load_missing_path_uses_default() {
        let dir = TempDir::new().unwrap();
        let config = RecommenderConfig::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn test_apply_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_PRIMARY, " /srv/training.csv "),
            (ENV_ALLOWED_TAGS, "Koffie, Huur,,"),
            (ENV_SUPPLEMENTARY, ""),
        ]
        .into_iter()
        .collect();

        let mut config = RecommenderConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.primary, PathBuf::from("/srv/training.csv"));
        assert_eq!(config.allowed_tags, vec!["Koffie", "Huur"]);
        assert_eq!(config.supplementary, None);
    }

    #[test]
    fn test_builder_helpers() {
        let config = RecommenderConfig::for_source("a.csv")
            .with_supplementary("b.csv")
            .with_allowed_tags(["Koffie"]);
        assert_eq!(config.sources(), vec![Path::new("a.csv"), Path::new("b.csv")]);
        assert_eq!(config.allowed_tags, vec!["Koffie"]);
    }
}
