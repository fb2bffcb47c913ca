use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::models::Chain;

const FEED_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum WalletFeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed rejected request: {0}")]
    Rejected(String),
}

/// One swap record from the wallet-activity feed. Two legs (token0/token1)
/// plus an `is_sell` flag meaning "this wallet sold token0 to receive token1".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwapRecord {
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub is_sell: bool,
    #[serde(default)]
    pub token0_address: Option<String>,
    #[serde(default)]
    pub token0_symbol: Option<String>,
    #[serde(default)]
    pub token0_amount: f64,
    #[serde(default)]
    pub token0_price_usd: f64,
    #[serde(default)]
    pub token0_amount_usd: f64,
    #[serde(default)]
    pub token1_address: Option<String>,
    #[serde(default)]
    pub token1_symbol: Option<String>,
    #[serde(default)]
    pub token1_amount: f64,
    #[serde(default)]
    pub token1_price_usd: f64,
    #[serde(default)]
    pub token1_amount_usd: f64,
    #[serde(default)]
    pub dex: Option<String>,
    /// Epoch seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    #[serde(default)]
    data: Option<FeedData>,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    #[serde(default)]
    items: Vec<SwapRecord>,
}

/// Client for the wallet-activity feed source (Cielo-style).
#[derive(Debug, Clone)]
pub struct WalletFeedClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl WalletFeedClient {
    pub fn new(http: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Recent swap records for a wallet on one chain, newest first.
    pub async fn recent_swaps(
        &self,
        wallet: &str,
        chain: Chain,
    ) -> Result<Vec<SwapRecord>, WalletFeedError> {
        self.query(&[
            ("wallet", wallet),
            ("chains", chain.feed_id()),
            ("txTypes", "swap"),
            ("limit", &FEED_PAGE_LIMIT.to_string()),
        ])
        .await
    }

    /// Swap records for one token only (used by trade sync).
    pub async fn token_swaps(
        &self,
        wallet: &str,
        chain: Chain,
        contract: &str,
    ) -> Result<Vec<SwapRecord>, WalletFeedError> {
        self.query(&[
            ("wallet", wallet),
            ("chains", chain.feed_id()),
            ("tokens", contract),
            ("txTypes", "swap"),
            ("limit", &FEED_PAGE_LIMIT.to_string()),
        ])
        .await
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Vec<SwapRecord>, WalletFeedError> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(params)
            .header("X-API-KEY", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(WalletFeedError::Rejected(format!("{status}: {body}")));
        }

        let envelope: FeedEnvelope = resp.json().await?;
        Ok(envelope.data.map(|d| d.items).unwrap_or_default())
    }
}
