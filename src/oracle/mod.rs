use std::time::Duration;

use serde::Serialize;

use crate::cache::TtlCache;
use crate::models::Chain;
use crate::sources::{ApiPair, PriceSourceClient};

pub const PRICE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Current market data for one token, extracted from its best trading pair.
#[derive(Debug, Clone, Serialize)]
pub struct PriceData {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub price_usd: Option<f64>,
    pub mcap: Option<f64>,
    pub price_change_24h: f64,
    pub volume_24h: f64,
    pub liquidity: f64,
    pub pair_address: Option<String>,
    pub dex_id: Option<String>,
}

/// Resolves current market data for a token with a 5-minute TTL cache.
///
/// `get_price` returning `None` means "unknown", never "zero" — callers must
/// not treat a miss as a negative price signal.
pub struct PriceOracle {
    client: PriceSourceClient,
    cache: TtlCache<String, PriceData>,
}

impl PriceOracle {
    pub fn new(client: PriceSourceClient) -> Self {
        Self {
            client,
            cache: TtlCache::new(PRICE_CACHE_TTL),
        }
    }

    pub async fn get_price(&self, contract: &str, chain: Chain) -> Option<PriceData> {
        let cache_key = format!("{}:{}", chain, contract);
        if let Some(cached) = self.cache.get(&cache_key).await {
            return Some(cached);
        }

        let pairs = match self.client.get_pairs(contract).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, contract, %chain, "Price source request failed");
                return None;
            }
        };

        let pair = select_pair(&pairs, chain)?;
        let data = extract_price_data(pair);

        self.cache.insert(cache_key, data.clone()).await;
        Some(data)
    }

    /// Drop cache entries older than twice the TTL. Called by the periodic
    /// eviction sweep.
    pub async fn evict_stale(&self) {
        self.cache.evict_older_than(PRICE_CACHE_TTL * 2).await;
    }
}

/// Pick the pair with the greatest liquidity among pairs on the requested
/// chain; fall back to the first pair when no pair matches the chain.
fn select_pair(pairs: &[ApiPair], chain: Chain) -> Option<&ApiPair> {
    if pairs.is_empty() {
        return None;
    }

    let wanted = chain.price_source_id();
    pairs
        .iter()
        .filter(|p| p.chain_id == wanted)
        .max_by(|a, b| {
            let la = a.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
            let lb = b.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
            la.total_cmp(&lb)
        })
        .or_else(|| pairs.first())
}

fn extract_price_data(pair: &ApiPair) -> PriceData {
    PriceData {
        symbol: pair.base_token.as_ref().and_then(|t| t.symbol.clone()),
        name: pair.base_token.as_ref().and_then(|t| t.name.clone()),
        price_usd: pair.price_usd.as_ref().and_then(|p| p.parse().ok()),
        // Market cap, or fully-diluted value when the source has no mcap.
        mcap: pair.market_cap.or(pair.fdv),
        price_change_24h: pair.price_change.as_ref().and_then(|c| c.h24).unwrap_or(0.0),
        volume_24h: pair.volume.as_ref().and_then(|v| v.h24).unwrap_or(0.0),
        liquidity: pair.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0),
        pair_address: pair.pair_address.clone(),
        dex_id: pair.dex_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::dexscreener::ApiLiquidity;

    fn pair(chain_id: &str, liquidity: f64) -> ApiPair {
        ApiPair {
            chain_id: chain_id.into(),
            liquidity: Some(ApiLiquidity {
                usd: Some(liquidity),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn prefers_requested_chain_over_higher_liquidity() {
        let pairs = vec![pair("solana", 10.0), pair("base", 1000.0)];
        let selected = select_pair(&pairs, Chain::Solana).unwrap();
        assert_eq!(selected.chain_id, "solana");
    }

    #[test]
    fn picks_highest_liquidity_on_matching_chain() {
        let pairs = vec![
            pair("solana", 10.0),
            pair("solana", 500.0),
            pair("solana", 50.0),
        ];
        let selected = select_pair(&pairs, Chain::Solana).unwrap();
        assert_eq!(selected.liquidity.as_ref().unwrap().usd, Some(500.0));
    }

    #[test]
    fn falls_back_to_first_pair_when_chain_missing() {
        let pairs = vec![pair("base", 10.0), pair("bsc", 1000.0)];
        let selected = select_pair(&pairs, Chain::Solana).unwrap();
        assert_eq!(selected.chain_id, "base");
    }

    #[test]
    fn no_pairs_is_none() {
        assert!(select_pair(&[], Chain::Solana).is_none());
    }

    #[test]
    fn mcap_falls_back_to_fdv() {
        let p = ApiPair {
            fdv: Some(123_000.0),
            ..Default::default()
        };
        assert_eq!(extract_price_data(&p).mcap, Some(123_000.0));

        let p = ApiPair {
            market_cap: Some(77_000.0),
            fdv: Some(123_000.0),
            ..Default::default()
        };
        assert_eq!(extract_price_data(&p).mcap, Some(77_000.0));
    }

    #[test]
    fn price_usd_parses_from_string() {
        let p = ApiPair {
            price_usd: Some("0.0042".into()),
            ..Default::default()
        };
        assert_eq!(extract_price_data(&p).price_usd, Some(0.0042));
    }

    #[tokio::test]
    async fn cache_hit_skips_second_fetch() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/tokens/:contract",
            axum::routing::get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    axum::Json(serde_json::json!({
                        "pairs": [{
                            "chainId": "solana",
                            "priceUsd": "1.5",
                            "liquidity": { "usd": 100.0 }
                        }]
                    }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let oracle = PriceOracle::new(PriceSourceClient::new(
            reqwest::Client::new(),
            format!("http://{addr}"),
        ));

        let first = oracle
            .get_price("MintA", Chain::Solana)
            .await
            .expect("first lookup");
        let second = oracle
            .get_price("MintA", Chain::Solana)
            .await
            .expect("second lookup");

        assert_eq!(first.price_usd, Some(1.5));
        assert_eq!(second.price_usd, Some(1.5));
        // The second lookup is served from the cache.
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
