pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod fanout;
pub mod holders;
pub mod ingestion;
pub mod matcher;
pub mod models;
pub mod oracle;
pub mod services;
pub mod sources;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::fanout::Fanout;
use crate::holders::HolderTracker;
use crate::ingestion::MonitorCommand;
use crate::matcher::WalletMatcher;
use crate::oracle::PriceOracle;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: AppConfig,
    pub fanout: Arc<Fanout>,
    pub oracle: Arc<PriceOracle>,
    pub matcher: Arc<WalletMatcher>,
    /// Holder tracker, when a holder RPC endpoint is configured.
    pub tracker: Option<Arc<HolderTracker>>,
    /// Control handle for the live transaction monitor, when it is running.
    pub monitor_tx: Option<mpsc::Sender<MonitorCommand>>,
}
