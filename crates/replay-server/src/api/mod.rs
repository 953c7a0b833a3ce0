pub mod response;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;

use crate::config::CorsConfig;
use crate::db;
use crate::error_log::ErrorLogger;
use crate::features;
use crate::ingest::ReplayIngestor;
use crate::middleware::{self, DefaultLocale};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ingestor: ReplayIngestor,
    pub error_logger: Arc<dyn ErrorLogger>,
    pub default_locale: DefaultLocale,
    /// Cancelled when the server starts shutting down; each request fetch
    /// runs under a child token
    pub shutdown: CancellationToken,
    /// Present when replays live in PostgreSQL
    pub db: Option<PgPool>,
}

impl FromRef<AppState> for DefaultLocale {
    fn from_ref(state: &AppState) -> Self {
        state.default_locale.clone()
    }
}

pub fn create_router(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", features::router())
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

async fn health(State(state): State<AppState>) -> Response {
    let Some(pool) = &state.db else {
        return (StatusCode::OK, Json(json!({ "status": "healthy", "store": "memory" })))
            .into_response();
    };

    match db::health_check(pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "store": "postgres",
                "database": "connected"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "disconnected" })),
            )
                .into_response()
        },
    }
}
