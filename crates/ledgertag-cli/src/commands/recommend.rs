//! Recommend command implementation

use anyhow::{bail, Result};
use ledgertag_core::models::COUNTERPARTY_FIELD;
use ledgertag_core::{FieldValue, RecommenderConfig, Suggestion, TagRecommender, Transaction};

/// Build a transaction from `name=value` pairs and an optional amount
pub fn build_transaction(fields: &[(String, String)], amount: Option<&str>) -> Transaction {
    let mut transaction = Transaction::new();
    for (name, value) in fields {
        transaction.set(name, value.as_str());
    }
    if let Some(amount) = amount {
        transaction.set("bedrag", amount);
    }
    transaction
}

/// Ranked suggestions plus where they came from.
///
/// The counterparty index is consulted only when the model finds nothing.
pub fn suggest(
    engine: &mut TagRecommender,
    transaction: &Transaction,
    top_k: usize,
) -> (Vec<Suggestion>, &'static str) {
    let suggestions = engine.recommend(transaction, top_k);
    if !suggestions.is_empty() {
        return (suggestions, "model");
    }

    let fallback = transaction
        .get(COUNTERPARTY_FIELD)
        .and_then(FieldValue::as_text)
        .and_then(|counterparty| engine.suggest_by_counterparty(&counterparty));
    match fallback {
        Some(suggestion) => (vec![suggestion], "counterparty"),
        None => (Vec::new(), "none"),
    }
}

pub fn cmd_recommend(
    config: RecommenderConfig,
    fields: &[(String, String)],
    amount: Option<&str>,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    let top_k = top_k.unwrap_or(config.top_k);
    if top_k == 0 {
        bail!("--top-k must be at least 1");
    }

    let transaction = build_transaction(fields, amount);
    if transaction.is_empty() {
        bail!("Provide at least one --field or --amount");
    }

    let mut engine = TagRecommender::new(config);
    let (suggestions, source) = suggest(&mut engine, &transaction, top_k);

    if json {
        let output = serde_json::json!({
            "top_tag": suggestions.first().map(|s| s.tag.as_str()),
            "suggestions": suggestions,
            "source": source,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if suggestions.is_empty() {
        println!("No suggestions (nothing in the training data matches this transaction)");
        if !engine.is_loaded() {
            println!("   Training data could not be loaded; run 'ledgertag check' for details");
        }
        return Ok(());
    }

    println!();
    println!("🏷️  Suggested tags ({})", source);
    println!("   ─────────────────────────────────────────────");
    for (rank, suggestion) in suggestions.iter().enumerate() {
        println!(
            "   {}. {:<32} {:>8.4}",
            rank + 1,
            suggestion.tag,
            suggestion.score
        );
    }
    println!();

    Ok(())
}
