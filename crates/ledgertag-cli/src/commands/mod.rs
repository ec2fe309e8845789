//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `recommend` - Tag recommendations for a single transaction
//! - `model` - Model statistics, source checks and tokenizer output
//! - `serve` - Web server command

pub mod model;
pub mod recommend;
pub mod serve;

// Re-export command functions for main.rs
pub use model::*;
pub use recommend::*;
pub use serve::*;

use std::path::Path;

use anyhow::{Context, Result};
use ledgertag_core::RecommenderConfig;

/// Load config from file (or defaults) and apply environment overrides
pub fn load_config(path: Option<&Path>) -> Result<RecommenderConfig> {
    let mut config = RecommenderConfig::load(path).context("Failed to load configuration")?;
    config.apply_env();
    Ok(config)
}
