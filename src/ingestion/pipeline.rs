use metrics::counter;
use sqlx::PgPool;

use super::balance_diff::Direction;
use super::live_monitor::TransactionEvent;
use crate::db::token_repo;
use crate::fanout::Fanout;
use crate::models::{Chain, NotificationEvent};

/// Process one confirmed transaction from the live monitor.
///
/// A BUY of a tracked, not-yet-bought mint flips its bought flag immediately
/// (independent of the sweep cadence) and notifies the owner's live clients.
/// Sells are recorded by the periodic pnl refresh, not here.
pub async fn process_transaction_event(
    event: &TransactionEvent,
    pool: &PgPool,
    fanout: &Fanout,
) -> anyhow::Result<()> {
    for change in &event.changes {
        if change.direction != Direction::Buy {
            continue;
        }

        // The live stream is Solana-only; the monitored wallet is a Solana
        // wallet by construction.
        let tokens =
            token_repo::find_unbought_by_contract(pool, &change.mint, Chain::Solana).await?;

        for token in &tokens {
            token_repo::mark_bought(pool, token.id).await?;
            counter!("purchases_detected_total").increment(1);

            tracing::info!(
                token = token.name.as_deref().or(token.symbol.as_deref()).unwrap_or(&change.mint),
                signature = %event.signature,
                amount = change.ui_amount,
                "Purchase detected via live monitor"
            );

            let Some(updated) = token_repo::get(pool, token.id).await? else {
                continue;
            };

            fanout
                .broadcast(NotificationEvent::TokenUpdated(updated.clone()))
                .await;
            fanout
                .broadcast(NotificationEvent::PurchaseDetected {
                    token: updated,
                    transaction: event.signature.clone(),
                    amount: change.ui_amount,
                })
                .await;
        }
    }

    Ok(())
}
