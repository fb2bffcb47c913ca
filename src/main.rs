use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use paperhands::api::create_router;
use paperhands::config::AppConfig;
use paperhands::db::{self, settings_repo};
use paperhands::fanout::Fanout;
use paperhands::holders::HolderTracker;
use paperhands::ingestion::{self, MonitorCommand};
use paperhands::matcher::WalletMatcher;
use paperhands::oracle::PriceOracle;
use paperhands::services;
use paperhands::sources::{HolderClient, PriceSourceClient, WalletFeedClient};
use paperhands::AppState;

const SWEEP_INITIAL_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    tracing::info!("Database connected");

    let http = reqwest::Client::new();
    let fanout = Arc::new(Fanout::new());

    let oracle = Arc::new(PriceOracle::new(PriceSourceClient::new(
        http.clone(),
        config.price_api_base.clone(),
    )));

    let matcher = Arc::new(WalletMatcher::new(WalletFeedClient::new(
        http.clone(),
        config.feed_api_key.clone().unwrap_or_default(),
        config.feed_api_base.clone(),
    )));
    if config.feed_api_key.is_none() {
        tracing::warn!("CIELO_API_KEY not set — wallet matching will find nothing");
    }

    let tracker = config
        .holder_rpc()
        .map(|rpc_url| Arc::new(HolderTracker::new(HolderClient::new(http.clone(), rpc_url))));
    if tracker.is_none() {
        tracing::warn!("HELIUS_API_KEY not set — dump detection disabled (no holder RPC)");
    }

    // --- Price sweep (+ holder dump detection when an RPC is configured) ---
    {
        let sweep_pool = pool.clone();
        let sweep_oracle = oracle.clone();
        let sweep_tracker = tracker.clone();
        let interval = Duration::from_secs(config.price_sweep_interval_secs);
        tokio::spawn(async move {
            services::run_price_sweep(
                sweep_pool,
                sweep_oracle,
                sweep_tracker,
                interval,
                SWEEP_INITIAL_DELAY,
            )
            .await;
        });
    }

    // --- Live transaction monitor → purchase pipeline ---
    let monitor_tx = if config.live_monitor_enabled && !config.multi_tenant {
        match config.live_stream_url() {
            Some(ws_url) => {
                let (cmd_tx, cmd_rx) = mpsc::channel::<MonitorCommand>(16);
                let (event_tx, mut event_rx) = mpsc::channel(256);

                tokio::spawn(async move {
                    ingestion::run_live_monitor(ws_url, cmd_rx, event_tx).await;
                });

                let pipeline_pool = pool.clone();
                let pipeline_fanout = fanout.clone();
                tokio::spawn(async move {
                    while let Some(event) = event_rx.recv().await {
                        if let Err(e) = ingestion::pipeline::process_transaction_event(
                            &event,
                            &pipeline_pool,
                            &pipeline_fanout,
                        )
                        .await
                        {
                            tracing::error!(
                                error = %e,
                                signature = %event.signature,
                                "Purchase pipeline failed"
                            );
                        }
                    }
                    tracing::warn!("Transaction event channel closed");
                });

                // Arm the monitor with the locally configured Solana wallet.
                match settings_repo::get_wallets(&pool, 1).await {
                    Ok(Some(wallets)) if wallets.solana.is_some() => {
                        let _ = cmd_tx.send(MonitorCommand::SetWallet(wallets.solana)).await;
                    }
                    Ok(_) => tracing::info!("No Solana wallet configured — monitor idle"),
                    Err(e) => tracing::error!(error = %e, "Failed to load wallet settings"),
                }

                Some(cmd_tx)
            }
            None => {
                tracing::warn!("HELIUS_API_KEY not set — live monitor disabled");
                None
            }
        }
    } else {
        // One wallet per subscription: the multi-tenant deployment would
        // need a monitor per user, which is out of scope.
        tracing::info!("Live monitor disabled");
        None
    };

    let state = AppState {
        db: pool,
        config,
        fanout,
        oracle,
        matcher,
        tracker,
        monitor_tx,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
