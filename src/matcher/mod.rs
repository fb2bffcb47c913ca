pub mod legs;

use std::time::Duration;

use sqlx::PgPool;
use tokio::time::sleep;

use crate::cache::TtlCache;
use crate::db::trade_repo;
use crate::models::{Chain, MatchedTrade, PnlSummary, TradeAction, WalletConfig};
use crate::sources::{SwapRecord, WalletFeedClient};

pub use legs::{classify_swap, find_tracked_leg, matches_token, TrackedLeg};

pub const FEED_CACHE_TTL: Duration = Duration::from_secs(60);
const SYNC_ITEM_DELAY: Duration = Duration::from_millis(300);

/// Determines buy/sell evidence for a token from the configured wallet's
/// swap feed and computes realized PnL.
///
/// The raw feed is cached per chain+wallet for 60 seconds so a bulk recheck
/// over many tokens costs one upstream fetch per chain, not one per token.
pub struct WalletMatcher {
    feed: WalletFeedClient,
    cache: TtlCache<String, Vec<SwapRecord>>,
}

/// Outcome of a bulk trade sync.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncOutcome {
    pub synced: usize,
    pub errors: usize,
}

impl WalletMatcher {
    pub fn new(feed: WalletFeedClient) -> Self {
        Self {
            feed,
            cache: TtlCache::new(FEED_CACHE_TTL),
        }
    }

    /// True when any recent swap of the configured wallet involves the token.
    /// Feed failures and missing wallet config degrade to `false` — absence
    /// of evidence, not evidence of absence.
    pub async fn has_bought(
        &self,
        contract: &str,
        chain: Chain,
        wallets: &WalletConfig,
        symbol_hint: Option<&str>,
    ) -> bool {
        let records = self.recent_swaps(chain, wallets).await;
        let found = records
            .iter()
            .any(|r| matches_token(r, contract, symbol_hint));

        if found {
            tracing::info!(contract, %chain, "Purchase evidence found in wallet feed");
        }
        found
    }

    /// Realized PnL for one token: Σ(native sell proceeds) − Σ(native buy
    /// cost), in the currency of the first sell leg (first buy if no sells).
    /// `pnl: None` means no matching transactions at all.
    pub async fn realized_pnl(
        &self,
        contract: &str,
        chain: Chain,
        wallets: &WalletConfig,
        symbol_hint: Option<&str>,
    ) -> PnlSummary {
        let records = self.recent_swaps(chain, wallets).await;
        let trades: Vec<MatchedTrade> = records
            .iter()
            .filter(|r| matches_token(r, contract, symbol_hint))
            .map(|r| classify_swap(r, contract, symbol_hint))
            .collect();

        let summary = compute_pnl(&trades, chain.native_currency());
        if let Some(pnl) = summary.pnl {
            tracing::info!(
                contract,
                %chain,
                pnl,
                currency = %summary.currency,
                buys = summary.buys,
                sells = summary.sells,
                "Realized PnL computed"
            );
        }
        summary
    }

    /// All matched trades of one token, fetched directly (not via the recent
    /// cache), for persistence into the trade store.
    pub async fn token_trades(
        &self,
        contract: &str,
        chain: Chain,
        wallets: &WalletConfig,
        symbol_hint: Option<&str>,
    ) -> Vec<MatchedTrade> {
        let Some(wallet) = wallets.for_kind(chain.wallet_kind()) else {
            return Vec::new();
        };

        match self.feed.token_swaps(wallet, chain, contract).await {
            Ok(records) => records
                .iter()
                .map(|r| classify_swap(r, contract, symbol_hint))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, contract, %chain, "Token swap fetch failed");
                Vec::new()
            }
        }
    }

    /// Persist matched trades for a set of tokens, deduplicated by tx hash.
    /// `Unknown` legs are never persisted. One bad token does not abort the
    /// batch.
    pub async fn sync_trades(
        &self,
        pool: &PgPool,
        user_id: i64,
        tokens: &[(String, Chain, Option<String>)],
        wallets: &WalletConfig,
    ) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        for (contract, chain, symbol) in tokens {
            let trades = self
                .token_trades(contract, *chain, wallets, symbol.as_deref())
                .await;

            for trade in &trades {
                if trade.action == TradeAction::Unknown {
                    continue;
                }
                let Some(tx_hash) = trade.tx_hash.as_deref() else {
                    continue;
                };

                match trade_repo::insert_if_new(pool, user_id, contract, *chain, trade, tx_hash)
                    .await
                {
                    Ok(true) => {
                        outcome.synced += 1;
                        tracing::info!(
                            action = %trade.action,
                            quantity = trade.quantity,
                            contract,
                            value_native = trade.value_native,
                            currency = %trade.native_currency,
                            "Trade synced"
                        );
                    }
                    Ok(false) => {}
                    Err(e) => {
                        outcome.errors += 1;
                        tracing::error!(error = %e, contract, "Trade sync insert failed");
                    }
                }
            }

            sleep(SYNC_ITEM_DELAY).await;
        }

        outcome
    }

    async fn recent_swaps(&self, chain: Chain, wallets: &WalletConfig) -> Vec<SwapRecord> {
        let Some(wallet) = wallets.for_kind(chain.wallet_kind()) else {
            tracing::debug!(%chain, "No wallet configured for chain");
            return Vec::new();
        };

        let cache_key = format!("{}:{}", chain, wallet);
        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::debug!(%chain, "Using cached wallet feed");
            return cached;
        }

        match self.feed.recent_swaps(wallet, chain).await {
            Ok(records) => {
                tracing::debug!(%chain, count = records.len(), "Wallet feed refreshed");
                self.cache.insert(cache_key, records.clone()).await;
                records
            }
            Err(e) => {
                tracing::warn!(error = %e, %chain, "Wallet feed fetch failed");
                Vec::new()
            }
        }
    }
}

/// Aggregate matched trades into a realized PnL summary. Pure, so the math
/// is testable without the feed.
pub fn compute_pnl(trades: &[MatchedTrade], fallback_currency: &str) -> PnlSummary {
    let buys: Vec<&MatchedTrade> = trades
        .iter()
        .filter(|t| t.action == TradeAction::Buy)
        .collect();
    let sells: Vec<&MatchedTrade> = trades
        .iter()
        .filter(|t| t.action == TradeAction::Sell)
        .collect();

    if buys.is_empty() && sells.is_empty() {
        return PnlSummary::empty(fallback_currency);
    }

    let total_spent: f64 = buys.iter().map(|t| t.value_native).sum();
    let total_received: f64 = sells.iter().map(|t| t.value_native).sum();

    // The first sell's currency is canonical (first buy when nothing was
    // sold). Mixed currencies are a known limitation: flag, don't correct.
    let currency = sells
        .first()
        .or(buys.first())
        .map(|t| t.native_currency.clone())
        .unwrap_or_else(|| fallback_currency.to_string());

    let mixed = buys
        .iter()
        .chain(sells.iter())
        .any(|t| t.native_currency != currency);
    if mixed {
        tracing::warn!(
            currency = %currency,
            "Trades span multiple native currencies; PnL summed in the canonical one"
        );
    }

    PnlSummary {
        pnl: Some(total_received - total_spent),
        currency,
        buys: buys.len(),
        sells: sells.len(),
        total_spent,
        total_received,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn trade(action: TradeAction, value_native: f64, currency: &str) -> MatchedTrade {
        MatchedTrade {
            action,
            quantity: 100.0,
            price_per_unit: 0.0,
            value_usd: 0.0,
            value_native,
            native_currency: currency.into(),
            dex: None,
            tx_hash: None,
            traded_at: Utc::now(),
        }
    }

    #[test]
    fn buy_then_sell_yields_difference() {
        let trades = vec![
            trade(TradeAction::Buy, 0.10, "SOL"),
            trade(TradeAction::Sell, 0.25, "SOL"),
        ];
        let summary = compute_pnl(&trades, "SOL");
        assert!((summary.pnl.unwrap() - 0.15).abs() < 1e-9);
        assert_eq!(summary.currency, "SOL");
        assert_eq!(summary.buys, 1);
        assert_eq!(summary.sells, 1);
    }

    #[test]
    fn no_matching_trades_is_none_not_zero() {
        let summary = compute_pnl(&[], "SOL");
        assert!(summary.pnl.is_none());
    }

    #[test]
    fn unknown_legs_are_excluded() {
        let trades = vec![
            trade(TradeAction::Unknown, 99.0, "SOL"),
            trade(TradeAction::Buy, 1.0, "SOL"),
        ];
        let summary = compute_pnl(&trades, "SOL");
        assert!((summary.pnl.unwrap() + 1.0).abs() < 1e-9);
        assert_eq!(summary.buys, 1);
    }

    #[test]
    fn first_sell_currency_is_canonical() {
        let trades = vec![
            trade(TradeAction::Buy, 1.0, "ETH"),
            trade(TradeAction::Sell, 2.0, "SOL"),
            trade(TradeAction::Sell, 3.0, "ETH"),
        ];
        let summary = compute_pnl(&trades, "SOL");
        assert_eq!(summary.currency, "SOL");
        assert!((summary.pnl.unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn only_buys_uses_first_buy_currency() {
        let trades = vec![trade(TradeAction::Buy, 1.5, "BNB")];
        let summary = compute_pnl(&trades, "SOL");
        assert_eq!(summary.currency, "BNB");
        assert!((summary.pnl.unwrap() + 1.5).abs() < 1e-9);
    }
}
