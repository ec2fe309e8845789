//! Ledgertag Web Server
//!
//! Axum-based REST API around a single tag recommendation engine.
//!
//! The engine is not thread-safe on its own: it lives behind a mutex and
//! every call runs on the blocking pool, since a refresh may re-read the
//! training sources and retrain the classifier.
//!
//! Security features:
//! - Restrictive CORS policy
//! - Security headers on every response
//! - Sanitized error responses

use std::sync::{Arc, Mutex};

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use ledgertag_core::{RecommenderConfig, TagRecommender};

mod handlers;

/// Upper bound for `top_k` in recommendation requests
pub const MAX_TOP_K: usize = 50;

/// Server configuration
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub engine: Mutex<TagRecommender>,
    /// Allow-list from the engine config, served by `/api/tags`
    pub allowed_tags: Vec<String>,
    pub default_top_k: usize,
}

impl AppState {
    pub fn new(config: RecommenderConfig) -> Self {
        Self {
            allowed_tags: config.allowed_tags.clone(),
            default_top_k: config.top_k,
            engine: Mutex::new(TagRecommender::new(config)),
        }
    }

    /// Run `f` against the engine on the blocking pool
    pub async fn with_engine<T, F>(self: &Arc<Self>, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut TagRecommender) -> T + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        let result = tokio::task::spawn_blocking(move || {
            let mut engine = state
                .engine
                .lock()
                .map_err(|_| anyhow::anyhow!("Engine lock poisoned"))?;
            Ok::<T, anyhow::Error>(f(&mut engine))
        })
        .await??;
        Ok(result)
    }
}

/// Create the application router
pub fn create_router(engine_config: RecommenderConfig, config: ServerConfig) -> Router {
    create_router_with_state(Arc::new(AppState::new(engine_config)), config)
}

/// Create the application router around existing state
pub fn create_router_with_state(state: Arc<AppState>, config: ServerConfig) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/recommend", post(handlers::recommend))
        .route("/model", get(handlers::get_model))
        .route("/model/reload", post(handlers::reload_model))
        .route("/tags", get(handlers::list_tags));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server
pub async fn serve(
    engine_config: RecommenderConfig,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(engine_config));

    // Load the model up front so the first request does not pay for it
    let loaded = state.with_engine(|engine| engine.refresh()).await;
    match loaded {
        Ok(true) => info!("Tag model ready"),
        Ok(false) => warn!("Tag model not loaded; recommendations stay empty until sources are available"),
        Err(e) => warn!("Initial model load failed: {}", e.message),
    }

    let app = create_router_with_state(state, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            internal: Some(err.into()),
        }
    }
}
