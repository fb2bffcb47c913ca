use std::time::Duration;

use sqlx::PgPool;
use tokio::time::sleep;

use crate::db::{settings_repo, token_repo};
use crate::fanout::Fanout;
use crate::matcher::WalletMatcher;
use crate::models::{Chain, NotificationEvent, TrackedToken};

const ITEM_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Default, Clone, Copy)]
pub struct RecheckOutcome {
    pub checked: usize,
    pub updated: usize,
}

/// Re-check every not-yet-bought token of a user against the wallet feed.
/// A hit computes realized PnL, persists both, and notifies live clients.
pub async fn recheck_purchases(
    pool: &PgPool,
    matcher: &WalletMatcher,
    fanout: &Fanout,
    user_id: i64,
) -> anyhow::Result<RecheckOutcome> {
    let Some(wallets) = settings_repo::get_wallets(pool, user_id).await? else {
        anyhow::bail!("wallets not configured for user {user_id}");
    };

    let tokens = token_repo::list_unbought(pool, user_id).await?;
    tracing::info!(user_id, count = tokens.len(), "Rechecking purchases");

    let mut outcome = RecheckOutcome {
        checked: tokens.len(),
        ..RecheckOutcome::default()
    };

    for token in &tokens {
        let Some(chain) = Chain::parse(&token.chain) else {
            continue;
        };
        let hint = symbol_hint(token);

        let bought = matcher
            .has_bought(&token.contract_address, chain, &wallets, hint)
            .await;

        if bought {
            let pnl = matcher
                .realized_pnl(&token.contract_address, chain, &wallets, hint)
                .await;

            match token_repo::mark_bought_with_pnl(pool, token.id, pnl.pnl, &pnl.currency).await {
                Ok(()) => {
                    outcome.updated += 1;
                    if let Ok(Some(updated)) = token_repo::get(pool, token.id).await {
                        fanout.broadcast(NotificationEvent::TokenUpdated(updated)).await;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, token_id = token.id, "Failed to persist purchase")
                }
            }
        }

        sleep(ITEM_DELAY).await;
    }

    Ok(outcome)
}

/// Recompute realized PnL for every bought token of a user; persist only
/// non-null results (null means "no matching transactions", which must not
/// clobber a previously-computed value).
pub async fn refresh_pnl(
    pool: &PgPool,
    matcher: &WalletMatcher,
    user_id: i64,
) -> anyhow::Result<RecheckOutcome> {
    let Some(wallets) = settings_repo::get_wallets(pool, user_id).await? else {
        anyhow::bail!("wallets not configured for user {user_id}");
    };

    let tokens = token_repo::list_bought(pool, user_id).await?;
    let mut outcome = RecheckOutcome {
        checked: tokens.len(),
        ..RecheckOutcome::default()
    };

    for token in &tokens {
        let Some(chain) = Chain::parse(&token.chain) else {
            continue;
        };

        let pnl = matcher
            .realized_pnl(&token.contract_address, chain, &wallets, symbol_hint(token))
            .await;

        if let Some(amount) = pnl.pnl {
            match token_repo::set_pnl(pool, token.id, amount, &pnl.currency).await {
                Ok(()) => outcome.updated += 1,
                Err(e) => {
                    tracing::error!(error = %e, token_id = token.id, "Failed to persist pnl")
                }
            }
        }

        sleep(ITEM_DELAY).await;
    }

    Ok(outcome)
}

fn symbol_hint(token: &TrackedToken) -> Option<&str> {
    token.symbol.as_deref().or(token.name.as_deref())
}
