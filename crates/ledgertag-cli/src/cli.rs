//! CLI argument definitions using clap
//!
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Ledgertag - Suggest tags for bank transactions
#[derive(Parser)]
#[command(name = "ledgertag")]
#[command(about = "Tag recommendations learned from your tagged bank exports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend tags for a transaction
    Recommend {
        /// Transaction field as name=value (repeatable), e.g. mededelingen="huur maart"
        #[arg(short, long = "field", value_name = "NAME=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Transaction amount (accepts 1.234,56 and 1,234.56 styles)
        #[arg(short, long, allow_hyphen_values = true)]
        amount: Option<String>,

        /// Number of suggestions (defaults to the configured top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Load the training sources and show model statistics
    Stats {
        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show how each sheet of a source is interpreted
    Check {
        /// Source file or directory (defaults to the configured primary source)
        path: Option<PathBuf>,
    },

    /// Show the tokens produced for a text
    Tokenize {
        /// Text to tokenize
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Allowed CORS origin (repeatable; default is same-origin only)
        #[arg(long = "cors-origin")]
        cors_origins: Vec<String>,
    },
}

/// Parse a `name=value` transaction field
pub fn parse_field(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in '{}'", s));
    }
    Ok((name.to_lowercase(), value.to_string()))
}
