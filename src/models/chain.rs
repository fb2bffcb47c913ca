use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the user's configured wallets applies on a given chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletKind {
    Solana,
    Evm,
}

/// Closed set of supported chains.
///
/// Everything that used to be a loose chain string hangs off this enum:
/// price-source ids, wallet-feed ids, native currency, and whether the chain
/// offers holder introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Solana,
    Ethereum,
    Base,
    Bsc,
}

impl Chain {
    /// Parse the loose chain strings that arrive from the extension and feed
    /// payloads ("eth" and "ethereum" are both Ethereum).
    pub fn parse(s: &str) -> Option<Chain> {
        match s.to_ascii_lowercase().as_str() {
            "solana" | "sol" => Some(Chain::Solana),
            "eth" | "ethereum" => Some(Chain::Ethereum),
            "base" => Some(Chain::Base),
            "bsc" => Some(Chain::Bsc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Solana => "solana",
            Chain::Ethereum => "eth",
            Chain::Base => "base",
            Chain::Bsc => "bsc",
        }
    }

    /// Chain id used by the price source (DexScreener naming).
    pub fn price_source_id(&self) -> &'static str {
        match self {
            Chain::Solana => "solana",
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
            Chain::Bsc => "bsc",
        }
    }

    /// Chain id used by the wallet-feed source.
    pub fn feed_id(&self) -> &'static str {
        match self {
            Chain::Solana => "solana",
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
            Chain::Bsc => "bsc",
        }
    }

    /// Base asset used to price the counter-leg of a swap.
    pub fn native_currency(&self) -> &'static str {
        match self {
            Chain::Solana => "SOL",
            Chain::Ethereum => "ETH",
            Chain::Base => "ETH",
            Chain::Bsc => "BNB",
        }
    }

    /// Whether the holder-introspection source covers this chain.
    /// Currently Solana only.
    pub fn supports_holder_introspection(&self) -> bool {
        matches!(self, Chain::Solana)
    }

    pub fn wallet_kind(&self) -> WalletKind {
        match self {
            Chain::Solana => WalletKind::Solana,
            _ => WalletKind::Evm,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collapse wrapped native variants to the base asset symbol.
pub fn normalize_native_currency(symbol: &str) -> String {
    match symbol.to_ascii_uppercase().as_str() {
        "WSOL" | "SOL" => "SOL".into(),
        "WETH" | "ETH" => "ETH".into(),
        "WBNB" | "BNB" => "BNB".into(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(Chain::parse("eth"), Some(Chain::Ethereum));
        assert_eq!(Chain::parse("Ethereum"), Some(Chain::Ethereum));
        assert_eq!(Chain::parse("SOLANA"), Some(Chain::Solana));
        assert_eq!(Chain::parse("polygon"), None);
    }

    #[test]
    fn holder_introspection_is_solana_only() {
        assert!(Chain::Solana.supports_holder_introspection());
        assert!(!Chain::Ethereum.supports_holder_introspection());
        assert!(!Chain::Base.supports_holder_introspection());
        assert!(!Chain::Bsc.supports_holder_introspection());
    }

    #[test]
    fn wrapped_variants_collapse() {
        assert_eq!(normalize_native_currency("WSOL"), "SOL");
        assert_eq!(normalize_native_currency("weth"), "ETH");
        assert_eq!(normalize_native_currency("WBNB"), "BNB");
        assert_eq!(normalize_native_currency("USDC"), "USDC");
    }
}
