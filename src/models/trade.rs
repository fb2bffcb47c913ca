use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Which side of a matched swap the tracked token was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    /// Neither leg matched the tracked token — excluded from all aggregation.
    Unknown,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
            TradeAction::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One matched buy or sell leg of the tracked token. Derived from the wallet
/// feed, never hand-edited; deduplicated by tx_hash when persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedTrade {
    pub action: TradeAction,
    pub quantity: f64,
    pub price_per_unit: f64,
    pub value_usd: f64,
    pub value_native: f64,
    pub native_currency: String,
    pub dex: Option<String>,
    pub tx_hash: Option<String>,
    pub traded_at: DateTime<Utc>,
}

/// Database row for my_trades.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TradeRow {
    pub id: i64,
    pub user_id: i64,
    pub contract_address: String,
    pub chain: String,
    pub action: String,
    pub quantity: f64,
    pub price_per_unit: f64,
    pub value_usd: f64,
    pub value_native: f64,
    pub native_currency: String,
    pub dex: Option<String>,
    pub tx_hash: String,
    pub traded_at: DateTime<Utc>,
}

/// Realized profit/loss for one token in its native currency.
///
/// `pnl: None` means "no matching transactions" — distinct from a true zero.
#[derive(Debug, Clone, Serialize)]
pub struct PnlSummary {
    pub pnl: Option<f64>,
    pub currency: String,
    pub buys: usize,
    pub sells: usize,
    pub total_spent: f64,
    pub total_received: f64,
}

impl PnlSummary {
    pub fn empty(currency: &str) -> Self {
        Self {
            pnl: None,
            currency: currency.to_string(),
            buys: 0,
            sells: 0,
            total_spent: 0.0,
            total_received: 0.0,
        }
    }
}
