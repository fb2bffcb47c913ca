use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const HOLDER_ACCOUNT_LIMIT: u32 = 20;

#[derive(Debug, Error)]
pub enum HolderSourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error: {0}")]
    Rpc(String),
}

/// One token account returned by the holder introspection RPC.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenAccount {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<RpcResult>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcResult {
    #[serde(default)]
    token_accounts: Vec<TokenAccount>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: String,
}

/// Client for the holder-introspection RPC (Helius `getTokenAccounts`).
#[derive(Debug, Clone)]
pub struct HolderClient {
    http: Client,
    rpc_url: String,
}

impl HolderClient {
    pub fn new(http: Client, rpc_url: impl Into<String>) -> Self {
        Self {
            http,
            rpc_url: rpc_url.into(),
        }
    }

    /// Up to N largest token accounts for a mint, raw amounts.
    pub async fn largest_accounts(
        &self,
        mint: &str,
    ) -> Result<Vec<TokenAccount>, HolderSourceError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "paperhands",
            "method": "getTokenAccounts",
            "params": {
                "mint": mint,
                "limit": HOLDER_ACCOUNT_LIMIT,
                "options": { "showZeroBalance": false }
            }
        });

        let resp = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let envelope: RpcEnvelope = resp.json().await?;
        if let Some(err) = envelope.error {
            return Err(HolderSourceError::Rpc(err.message));
        }

        Ok(envelope
            .result
            .map(|r| r.token_accounts)
            .unwrap_or_default())
    }
}
