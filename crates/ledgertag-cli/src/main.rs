//! Ledgertag CLI - Tag recommendations for bank transactions
//!
//! Usage:
//!   ledgertag recommend -f mededelingen="koffie kantoor" --amount 12,50
//!   ledgertag stats                 Show what the model learned
//!   ledgertag check data/training   Show how sheets are interpreted
//!   ledgertag serve --port 3000     Start the REST API

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > configured level
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Recommend {
            fields,
            amount,
            top_k,
            json,
        } => commands::cmd_recommend(config, &fields, amount.as_deref(), top_k, json),
        Commands::Stats { json } => commands::cmd_stats(config, json),
        Commands::Check { path } => commands::cmd_check(&config, path.as_deref()),
        Commands::Tokenize { text } => commands::cmd_tokenize(&config, &text.join(" ")),
        Commands::Serve {
            port,
            host,
            cors_origins,
        } => commands::cmd_serve(config, &host, port, cors_origins).await,
    }
}
