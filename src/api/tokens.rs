use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use super::control::UserParams;
use crate::db::{price_repo, settings_repo, token_repo, trade_repo};
use crate::errors::AppError;
use crate::holders::RiskAssessment;
use crate::models::{Chain, NotificationEvent, PricePoint, TrackedToken, TradeRow, ViewedTokenInput};
use crate::AppState;

#[derive(Serialize)]
pub struct ViewedResponse {
    success: bool,
    id: i64,
    bought: bool,
}

/// POST /api/tokens/viewed — record a token view.
///
/// First view of the day creates the row (and fires `new-token`); a same-day
/// re-view refreshes it in place. The wallet matcher runs on demand right
/// here so a token the user already traded is flagged immediately.
pub async fn viewed(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
    Json(input): Json<ViewedTokenInput>,
) -> Result<Json<ViewedResponse>, AppError> {
    let user_id = params.resolve();
    let Some(chain) = Chain::parse(&input.chain) else {
        return Err(AppError::BadRequest(format!(
            "unsupported chain: {}",
            input.chain
        )));
    };
    if input.contract_address.is_empty() {
        return Err(AppError::BadRequest("contract_address is required".into()));
    }

    // Only hit the price source when the view context didn't bring a market
    // cap of its own.
    let price = if input.mcap.is_none() {
        state.oracle.get_price(&input.contract_address, chain).await
    } else {
        None
    };

    let upsert = token_repo::upsert_viewed(&state.db, user_id, &input, price.as_ref()).await?;

    // On-demand purchase evidence.
    let mut bought = false;
    if let Some(wallets) = settings_repo::get_wallets(&state.db, user_id).await? {
        let hint = input
            .symbol
            .as_deref()
            .or(price.as_ref().and_then(|p| p.symbol.as_deref()));
        bought = state
            .matcher
            .has_bought(&input.contract_address, chain, &wallets, hint)
            .await;
        if bought {
            token_repo::mark_bought(&state.db, upsert.token_id).await?;
        }
    }

    if let Some(token) = token_repo::get(&state.db, upsert.token_id).await? {
        let event = if upsert.is_new {
            NotificationEvent::NewToken(token)
        } else {
            NotificationEvent::TokenUpdated(token)
        };
        state.fanout.broadcast(event).await;
    }

    Ok(Json(ViewedResponse {
        success: true,
        id: upsert.token_id,
        bought,
    }))
}

#[derive(Serialize)]
pub struct TokenDetail {
    #[serde(flatten)]
    pub token: TrackedToken,
    pub current_price: Option<PricePoint>,
    pub price_history: Vec<PricePoint>,
    pub trades: Vec<TradeRow>,
}

/// GET /api/tokens/:id — token row plus its latest price, history and trades.
pub async fn show(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
    Path(id): Path<i64>,
) -> Result<Json<TokenDetail>, AppError> {
    let user_id = params.resolve();
    let token = token_repo::get(&state.db, id)
        .await?
        .filter(|t| t.user_id == user_id)
        .ok_or_else(|| AppError::NotFound("token not found".into()))?;

    let current_price = price_repo::latest(&state.db, id).await?;
    let price_history = price_repo::history(&state.db, id, 100).await?;
    let trades = match Chain::parse(&token.chain) {
        Some(chain) => {
            trade_repo::list_for_token(&state.db, user_id, &token.contract_address, chain).await?
        }
        None => Vec::new(),
    };

    Ok(Json(TokenDetail {
        token,
        current_price,
        price_history,
        trades,
    }))
}

/// POST /api/tokens/:id/reset-bought — the only path that flips the bought
/// flag back to false.
pub async fn reset_bought(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = params.resolve();
    token_repo::reset_bought(&state.db, id, user_id).await?;

    if let Some(token) = token_repo::get(&state.db, id).await? {
        state
            .fanout
            .broadcast(NotificationEvent::TokenUpdated(token))
            .await;
    }

    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/tokens/:id
pub async fn delete(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = params.resolve();
    let removed = token_repo::delete(&state.db, id, user_id).await?;
    if !removed {
        return Err(AppError::NotFound("token not found".into()));
    }

    state
        .fanout
        .broadcast(NotificationEvent::TokenDeleted { id, user_id })
        .await;

    Ok(Json(json!({ "success": true })))
}

/// GET /api/tokens/:id/risk — stateless holder-concentration classification.
pub async fn risk(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
    Path(id): Path<i64>,
) -> Result<Json<RiskAssessment>, AppError> {
    let user_id = params.resolve();
    let token = token_repo::get(&state.db, id)
        .await?
        .filter(|t| t.user_id == user_id)
        .ok_or_else(|| AppError::NotFound("token not found".into()))?;

    let Some(chain) = Chain::parse(&token.chain) else {
        return Err(AppError::BadRequest("unsupported chain".into()));
    };
    let Some(tracker) = &state.tracker else {
        return Err(AppError::BadRequest("holder introspection not configured".into()));
    };

    let assessment = tracker.risk_level(&token.contract_address, chain).await;
    Ok(Json(assessment))
}
