use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    /// Holder introspection + live transaction stream credentials.
    pub helius_api_key: Option<String>,
    /// Wallet-activity feed credentials.
    pub feed_api_key: Option<String>,

    /// Override for the live transaction stream endpoint.
    pub live_ws_url: Option<String>,
    /// Override for the holder introspection RPC endpoint.
    pub holder_rpc_url: Option<String>,
    /// Base URL of the trading-pair price source.
    pub price_api_base: String,
    /// Base URL of the wallet-activity feed.
    pub feed_api_base: String,

    pub price_sweep_interval_secs: u64,
    /// When true, live clients must present a credential and events are
    /// routed per owning user; when false every client receives everything.
    pub multi_tenant: bool,
    pub live_monitor_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,

            helius_api_key: env::var("HELIUS_API_KEY").ok(),
            feed_api_key: env::var("CIELO_API_KEY").ok(),

            live_ws_url: env::var("HELIUS_WS_URL").ok(),
            holder_rpc_url: env::var("HELIUS_RPC_URL").ok(),
            price_api_base: env::var("PRICE_API_BASE")
                .unwrap_or_else(|_| "https://api.dexscreener.com/latest/dex".into()),
            feed_api_base: env::var("FEED_API_BASE")
                .unwrap_or_else(|_| "https://feed-api.cielo.finance/api/v1/feed".into()),

            price_sweep_interval_secs: env::var("PRICE_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "900".into())
                .parse()
                .unwrap_or(900),
            multi_tenant: env::var("MULTI_TENANT")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
            live_monitor_enabled: env::var("LIVE_MONITOR_ENABLED")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
        })
    }

    /// Live transaction stream endpoint, derived from the API key unless
    /// overridden.
    pub fn live_stream_url(&self) -> Option<String> {
        if let Some(url) = &self.live_ws_url {
            return Some(url.clone());
        }
        self.helius_api_key
            .as_ref()
            .map(|key| format!("wss://atlas-mainnet.helius-rpc.com/?api-key={key}"))
    }

    /// Holder introspection RPC endpoint.
    pub fn holder_rpc(&self) -> Option<String> {
        if let Some(url) = &self.holder_rpc_url {
            return Some(url.clone());
        }
        self.helius_api_key
            .as_ref()
            .map(|key| format!("https://mainnet.helius-rpc.com/?api-key={key}"))
    }
}
