pub mod dexscreener;
pub mod holders;
pub mod wallet_feed;

pub use dexscreener::{ApiPair, PriceSourceClient, PriceSourceError};
pub use holders::{HolderClient, HolderSourceError, TokenAccount};
pub use wallet_feed::{SwapRecord, WalletFeedClient, WalletFeedError};
