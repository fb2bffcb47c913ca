pub mod price_sweep;
pub mod purchase_recheck;

pub use price_sweep::{run_price_sweep, sweep_once, SweepStats};
pub use purchase_recheck::{recheck_purchases, refresh_pnl, RecheckOutcome};
