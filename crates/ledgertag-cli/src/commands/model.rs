//! Model inspection commands (stats, check, tokenize)

use std::path::Path;

use anyhow::{Context, Result};
use ledgertag_core::{RecommenderConfig, TagRecommender};

pub fn cmd_stats(config: RecommenderConfig, json: bool) -> Result<()> {
    let mut engine = TagRecommender::new(config);
    engine.refresh();
    let stats = engine.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("📊 Ledgertag Model");
    println!("   ─────────────────────────────────────────────");
    for source in &stats.sources {
        println!("   Source: {}", source);
    }

    if !stats.loaded {
        println!();
        println!("   ❌ No model loaded (missing sources or no tagged rows)");
        println!();
        return Ok(());
    }

    let strategy = stats.strategy.map(|s| s.as_str()).unwrap_or("none");
    println!("   Documents: {}", stats.total_docs);
    println!("   Vocabulary: {} tokens", stats.vocabulary_size);
    println!("   Scoring: {}", strategy);
    if stats.classifier_classes > 0 {
        println!("   Classifier classes: {}", stats.classifier_classes);
    }
    if let Some(watermark) = stats.watermark {
        println!("   Sources modified: {}", watermark.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    println!();
    println!("   {:<32} {:>6} {:>8}", "Tag", "Rows", "Tokens");
    for tag in &stats.tags {
        println!("   {:<32} {:>6} {:>8}", tag.tag, tag.documents, tag.tokens);
    }
    println!();

    Ok(())
}

pub fn cmd_check(config: &RecommenderConfig, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(config.primary.as_path());
    let engine = TagRecommender::new(config.clone());
    let summaries = engine
        .check_source(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    println!();
    println!("🔍 {}", path.display());
    if summaries.is_empty() {
        println!("   No sheets found (expected .csv or .tsv files)");
    }

    for summary in &summaries {
        println!();
        println!("   Sheet: {}", summary.sheet);
        match &summary.tag_column {
            Some(tag) => println!("   Tag column: {}", tag),
            None => {
                println!("   ❌ No tag column (expected one of: tag, tags, categorie, category)");
                continue;
            }
        }
        println!("   Text columns: {}", summary.text_columns.join(", "));
        if let Some(amount) = &summary.amount_column {
            println!("   Amount column: {}", amount);
        }
        if let Some(counterparty) = &summary.counterparty_column {
            println!("   Counterparty column: {}", counterparty);
        }
        println!(
            "   Rows: {} used of {} ({} untagged, {} not allowed, {} without text)",
            summary.used,
            summary.rows,
            summary.skipped_untagged,
            summary.skipped_not_allowed,
            summary.skipped_empty
        );
    }
    println!();

    Ok(())
}

pub fn cmd_tokenize(config: &RecommenderConfig, text: &str) -> Result<()> {
    let engine = TagRecommender::new(config.clone());
    let tokens = engine.tokenizer().tokenize(text);
    println!("{}", tokens.join(" "));
    Ok(())
}
