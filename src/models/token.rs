use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row for viewed_tokens.
///
/// One row per user + token + view day. `bought` is monotonic false→true;
/// only an explicit reset clears it (and nulls the realized pnl with it).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrackedToken {
    pub id: i64,
    pub user_id: i64,
    pub contract_address: String,
    pub chain: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub price_when_viewed: Option<f64>,
    pub mcap_when_viewed: Option<f64>,
    pub viewed_at: DateTime<Utc>,
    pub source: Option<String>,
    pub url: Option<String>,
    pub bought: bool,
    pub pnl_native: Option<f64>,
    pub pnl_currency: Option<String>,
    pub ath_price: Option<f64>,
    pub ath_mcap: Option<f64>,
    pub ath_date: Option<DateTime<Utc>>,
    pub dev_dump_detected: bool,
    pub dev_dump_percent: Option<f64>,
    pub dev_dump_date: Option<DateTime<Utc>>,
}

/// Fields accepted when a view is recorded (extension or dashboard).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewedTokenInput {
    pub contract_address: String,
    pub chain: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub mcap: Option<f64>,
    pub source: Option<String>,
    pub url: Option<String>,
}

/// Append-only price_history row; written only by the price sweep.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PricePoint {
    pub id: i64,
    pub token_id: i64,
    pub price: Option<f64>,
    pub mcap: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub volume_24h: Option<f64>,
    pub checked_at: DateTime<Utc>,
}

/// Per-user wallet configuration, stored as a JSON settings value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default)]
    pub solana: Option<String>,
    #[serde(default)]
    pub evm: Option<String>,
}

impl WalletConfig {
    pub fn for_kind(&self, kind: super::chain::WalletKind) -> Option<&str> {
        match kind {
            super::chain::WalletKind::Solana => self.solana.as_deref(),
            super::chain::WalletKind::Evm => self.evm.as_deref(),
        }
    }
}
