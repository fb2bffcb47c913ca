use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceSourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Raw pair as returned by the price source. Missing numerics default to 0,
/// missing strings to `None` — a malformed pair must not fail the whole call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPair {
    #[serde(default)]
    pub chain_id: String,
    #[serde(default)]
    pub dex_id: Option<String>,
    #[serde(default)]
    pub pair_address: Option<String>,
    #[serde(default)]
    pub base_token: Option<ApiBaseToken>,
    /// The price source serializes USD price as a string.
    #[serde(default)]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub fdv: Option<f64>,
    #[serde(default)]
    pub price_change: Option<ApiPriceChange>,
    #[serde(default)]
    pub volume: Option<ApiVolume>,
    #[serde(default)]
    pub liquidity: Option<ApiLiquidity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiBaseToken {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPriceChange {
    #[serde(default)]
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiVolume {
    #[serde(default)]
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiLiquidity {
    #[serde(default)]
    pub usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PairsResponse {
    #[serde(default)]
    pairs: Option<Vec<ApiPair>>,
}

/// Client for the trading-pair price source (DexScreener).
#[derive(Debug, Clone)]
pub struct PriceSourceClient {
    http: Client,
    base_url: String,
}

impl PriceSourceClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Fetch every trading pair for a contract address, across all chains.
    pub async fn get_pairs(&self, contract: &str) -> Result<Vec<ApiPair>, PriceSourceError> {
        let url = format!("{}/tokens/{}", self.base_url, contract);
        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?;

        let body: PairsResponse = resp.json().await?;
        Ok(body.pairs.unwrap_or_default())
    }
}
