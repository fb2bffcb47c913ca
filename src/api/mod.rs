pub mod control;
pub mod tokens;
pub mod ws;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Permissive CORS: the dashboard and browser extension are separate
    // origins.
    Router::new()
        .route("/api/health", get(health))
        .route("/api/events", get(ws::handler))
        .route("/api/tokens/viewed", post(tokens::viewed))
        .route("/api/tokens/:id", get(tokens::show).delete(tokens::delete))
        .route("/api/tokens/:id/reset-bought", post(tokens::reset_bought))
        .route("/api/tokens/:id/risk", get(tokens::risk))
        .route("/api/tokens/recheck-purchases", post(control::recheck_purchases))
        .route("/api/tokens/refresh-pnl", post(control::refresh_pnl))
        .route("/api/trades/sync", post(control::sync_trades))
        .route("/api/settings/wallets", put(control::set_wallets))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
