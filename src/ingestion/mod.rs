pub mod balance_diff;
pub mod live_monitor;
pub mod pipeline;

pub use balance_diff::{diff_token_balances, BalanceChange, Direction};
pub use live_monitor::{
    reconnect_delay, run_live_monitor, MonitorCommand, MonitorState, TransactionEvent,
};
