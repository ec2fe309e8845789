//! Server command implementation

use anyhow::Result;
use ledgertag_core::RecommenderConfig;

pub async fn cmd_serve(
    config: RecommenderConfig,
    host: &str,
    port: u16,
    cors_origins: Vec<String>,
) -> Result<()> {
    println!("🚀 Starting Ledgertag web server...");
    for source in config.sources() {
        println!("   Training data: {}", source.display());
    }
    if !config.allowed_tags.is_empty() {
        println!("   Allowed tags: {}", config.allowed_tags.len());
    }
    println!("   Listening: http://{}:{}", host, port);
    if !cors_origins.is_empty() {
        println!("   CORS origins: {}", cors_origins.join(", "));
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let server_config = ledgertag_server::ServerConfig {
        allowed_origins: cors_origins,
    };
    ledgertag_server::serve(config, host, port, server_config).await?;

    Ok(())
}
