//! Model introspection and maintenance handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::{AppError, AppState};
use ledgertag_core::ModelStats;

/// Reload response
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub stats: ModelStats,
}

/// GET /api/health - Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/model - Model statistics after a staleness check
pub async fn get_model(State(state): State<Arc<AppState>>) -> Result<Json<ModelStats>, AppError> {
    let stats = state
        .with_engine(|engine| {
            engine.refresh();
            engine.stats()
        })
        .await?;
    Ok(Json(stats))
}

/// POST /api/model/reload - Rebuild the model from the training sources
pub async fn reload_model(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReloadResponse>, AppError> {
    let (success, stats) = state
        .with_engine(|engine| (engine.reload(), engine.stats()))
        .await?;
    info!("Model reload requested (success: {})", success);
    Ok(Json(ReloadResponse { success, stats }))
}

/// GET /api/tags - Configured tag allow-list
pub async fn list_tags(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.allowed_tags.clone())
}
