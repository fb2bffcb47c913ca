pub mod chain;
pub mod events;
pub mod token;
pub mod trade;

pub use chain::{normalize_native_currency, Chain, WalletKind};
pub use events::NotificationEvent;
pub use token::{PricePoint, TrackedToken, ViewedTokenInput, WalletConfig};
pub use trade::{MatchedTrade, PnlSummary, TradeAction, TradeRow};
