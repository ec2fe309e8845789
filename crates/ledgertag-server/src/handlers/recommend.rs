//! Tag recommendation handler

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AppError, AppState, MAX_TOP_K};
use ledgertag_core::models::COUNTERPARTY_FIELD;
use ledgertag_core::{FieldValue, Suggestion, Transaction};

/// Recommendation request
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub transaction: Transaction,
    pub top_k: Option<usize>,
}

/// Where the suggestions came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Model,
    Counterparty,
}

/// Recommendation response
#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub success: bool,
    pub top_tag: String,
    pub suggestions: Vec<Suggestion>,
    pub source: SuggestionSource,
}

/// POST /api/recommend - Rank tags for a transaction
///
/// Falls back to the most frequent tag of the transaction's counterparty
/// when the model has nothing to offer.
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::bad_request(&e.body_text()))?;

    let top_k = match request.top_k {
        Some(0) => return Err(AppError::bad_request("top_k must be at least 1")),
        Some(k) => k.min(MAX_TOP_K),
        None => state.default_top_k,
    };

    let transaction = request.transaction;
    let (suggestions, source) = state
        .with_engine(move |engine| {
            let suggestions = engine.recommend(&transaction, top_k);
            if !suggestions.is_empty() {
                return (suggestions, SuggestionSource::Model);
            }

            let fallback = transaction
                .get(COUNTERPARTY_FIELD)
                .and_then(FieldValue::as_text)
                .and_then(|counterparty| engine.suggest_by_counterparty(&counterparty));
            (
                fallback.into_iter().collect(),
                SuggestionSource::Counterparty,
            )
        })
        .await?;

    let Some(top_tag) = suggestions.first().map(|s| s.tag.clone()) else {
        return Err(AppError::not_found(
            "No suggestions available from the training set or counterparty",
        ));
    };
    debug!("Recommended '{}' ({:?})", top_tag, source);

    Ok(Json(RecommendResponse {
        success: true,
        top_tag,
        suggestions,
        source,
    }))
}
