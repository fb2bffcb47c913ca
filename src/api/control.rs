use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::{settings_repo, token_repo};
use crate::errors::AppError;
use crate::ingestion::MonitorCommand;
use crate::models::{Chain, WalletConfig};
use crate::services;
use crate::AppState;

/// Identity is normally resolved by the auth collaborator; local mode
/// defaults to user 1.
#[derive(Debug, Deserialize)]
pub struct UserParams {
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl UserParams {
    pub(crate) fn resolve(&self) -> i64 {
        self.user_id.unwrap_or(1)
    }
}

#[derive(Serialize)]
pub struct BulkJobResponse {
    success: bool,
    checked: usize,
    updated: usize,
}

/// POST /api/tokens/recheck-purchases — bulk purchase recheck for a user.
pub async fn recheck_purchases(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<Json<BulkJobResponse>, AppError> {
    let outcome =
        services::recheck_purchases(&state.db, &state.matcher, &state.fanout, params.resolve())
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(BulkJobResponse {
        success: true,
        checked: outcome.checked,
        updated: outcome.updated,
    }))
}

#[derive(Serialize)]
pub struct SyncResponse {
    success: bool,
    synced: usize,
    errors: usize,
}

/// POST /api/trades/sync — pull matched trades for every tracked token into
/// the trade store, deduplicated by tx hash.
pub async fn sync_trades(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<Json<SyncResponse>, AppError> {
    let user_id = params.resolve();
    let Some(wallets) = settings_repo::get_wallets(&state.db, user_id).await? else {
        return Err(AppError::BadRequest("wallets not configured".into()));
    };

    let tokens = token_repo::list_for_user(&state.db, user_id).await?;
    let targets: Vec<(String, Chain, Option<String>)> = tokens
        .iter()
        .filter_map(|t| {
            Chain::parse(&t.chain)
                .map(|chain| (t.contract_address.clone(), chain, t.symbol.clone()))
        })
        .collect();

    let outcome = state
        .matcher
        .sync_trades(&state.db, user_id, &targets, &wallets)
        .await;

    Ok(Json(SyncResponse {
        success: true,
        synced: outcome.synced,
        errors: outcome.errors,
    }))
}

/// PUT /api/settings/wallets — persist the user's wallet config and re-arm
/// the live monitor with the new Solana wallet (teardown, grace, reconnect
/// with a reset attempt counter happens inside the monitor).
pub async fn set_wallets(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
    Json(config): Json<WalletConfig>,
) -> Result<Json<serde_json::Value>, AppError> {
    settings_repo::set_wallets(&state.db, params.resolve(), &config).await?;

    if let Some(tx) = &state.monitor_tx {
        if tx
            .send(MonitorCommand::SetWallet(config.solana.clone()))
            .await
            .is_err()
        {
            tracing::warn!("Live monitor command channel closed");
        }
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /api/tokens/refresh-pnl — recompute PnL for all bought tokens.
pub async fn refresh_pnl(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<Json<BulkJobResponse>, AppError> {
    let outcome = services::refresh_pnl(&state.db, &state.matcher, params.resolve())
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(BulkJobResponse {
        success: true,
        checked: outcome.checked,
        updated: outcome.updated,
    }))
}
