use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::balance_diff::{diff_token_balances, BalanceChange, TokenBalance};

const PING_INTERVAL: Duration = Duration::from_secs(30);
const BASE_RECONNECT_DELAY: Duration = Duration::from_secs(3);
const MAX_RECONNECT_ATTEMPTS: u32 = 10;
/// Grace period between tearing down a subscription and reconnecting with a
/// new wallet filter.
const WALLET_SWITCH_GRACE: Duration = Duration::from_secs(1);
const SUBSCRIBE_REQUEST_ID: u64 = 420;

/// Connection lifecycle of the live monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Disconnected,
    Connecting,
    Subscribed,
}

/// Control commands for the monitor task. Exactly one wallet is monitored at
/// a time; setting a new wallet tears down the current subscription first.
#[derive(Debug, Clone)]
pub enum MonitorCommand {
    SetWallet(Option<String>),
    Disconnect,
}

/// Normalized confirmed transaction emitted to the purchase pipeline.
#[derive(Debug, Clone)]
pub struct TransactionEvent {
    pub signature: String,
    pub slot: u64,
    pub changes: Vec<BalanceChange>,
}

/// Reconnect backoff: linear in the attempt number, capped at five times the
/// base delay.
pub fn reconnect_delay(attempt: u32) -> Duration {
    BASE_RECONNECT_DELAY * attempt.clamp(1, 5)
}

/// Attempt count after a transport close. A session that reached Subscribed
/// was healthy, so its eventual drop starts a fresh attempt series; only
/// consecutive failed sessions accumulate toward the give-up limit.
pub fn next_attempts(attempts: u32, was_subscribed: bool) -> u32 {
    if was_subscribed {
        1
    } else {
        attempts + 1
    }
}

enum SessionEnd {
    /// Transport closed or errored — reconnect unless attempts are exhausted.
    /// `was_subscribed` records whether the session ever reached Subscribed,
    /// which resets the attempt counter.
    TransportClosed { was_subscribed: bool },
    /// Explicit disconnect — reconnection suppressed.
    Teardown,
    /// Monitored wallet changed — reconnect with the new filter.
    WalletChanged(Option<String>),
    /// Command channel dropped — shut the task down.
    ChannelClosed,
}

/// Run the live transaction monitor.
///
/// Owns the whole Disconnected → Connecting → Subscribed state machine: the
/// heartbeat interval lives inside a session and the retry timer inside the
/// backoff wait, so both are dropped (cancelled) on every exit path.
pub async fn run_live_monitor(
    ws_url: String,
    mut cmd_rx: mpsc::Receiver<MonitorCommand>,
    event_tx: mpsc::Sender<TransactionEvent>,
) {
    let mut wallet: Option<String> = None;
    let mut attempts: u32 = 0;

    loop {
        let Some(current_wallet) = wallet.clone() else {
            // Disconnected and unarmed: nothing to do until a wallet arrives.
            match cmd_rx.recv().await {
                Some(MonitorCommand::SetWallet(w)) => {
                    wallet = w;
                    attempts = 0;
                }
                Some(MonitorCommand::Disconnect) => {}
                None => return,
            }
            continue;
        };

        if attempts >= MAX_RECONNECT_ATTEMPTS {
            // Terminal until an explicit wallet change re-arms the monitor.
            tracing::error!("Reconnect attempts exhausted; monitor idle until wallet change");
            match cmd_rx.recv().await {
                Some(MonitorCommand::SetWallet(w)) => {
                    wallet = w;
                    attempts = 0;
                }
                Some(MonitorCommand::Disconnect) => wallet = None,
                None => return,
            }
            continue;
        }

        match run_session(&ws_url, &current_wallet, &event_tx, &mut cmd_rx).await {
            SessionEnd::Teardown => {
                tracing::info!("Live monitor torn down");
                wallet = None;
            }
            SessionEnd::WalletChanged(new_wallet) => {
                tracing::info!(
                    wallet = new_wallet.as_deref().unwrap_or("none"),
                    "Monitored wallet changed — reconnecting"
                );
                wallet = new_wallet;
                attempts = 0;
                sleep(WALLET_SWITCH_GRACE).await;
            }
            SessionEnd::TransportClosed { was_subscribed } => {
                attempts = next_attempts(attempts, was_subscribed);
                if attempts >= MAX_RECONNECT_ATTEMPTS {
                    continue;
                }
                let delay = reconnect_delay(attempts);
                tracing::info!(
                    delay_secs = delay.as_secs(),
                    attempt = attempts,
                    max = MAX_RECONNECT_ATTEMPTS,
                    "Reconnecting..."
                );
                // The retry timer is cancellable: a command racing the sleep
                // wins and the timer is dropped.
                tokio::select! {
                    _ = sleep(delay) => {}
                    cmd = cmd_rx.recv() => match cmd {
                        Some(MonitorCommand::SetWallet(w)) => {
                            wallet = w;
                            attempts = 0;
                        }
                        Some(MonitorCommand::Disconnect) => wallet = None,
                        None => return,
                    },
                }
            }
            SessionEnd::ChannelClosed => return,
        }
    }
}

/// One connection attempt plus its read loop. Returns why the session ended.
async fn run_session(
    ws_url: &str,
    wallet: &str,
    event_tx: &mpsc::Sender<TransactionEvent>,
    cmd_rx: &mut mpsc::Receiver<MonitorCommand>,
) -> SessionEnd {
    let mut state = MonitorState::Connecting;
    tracing::info!(wallet = %truncated(wallet), "Connecting to transaction stream...");

    let ws_stream = match connect_async(ws_url).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::error!(error = %e, "Transaction stream connection failed");
            return SessionEnd::TransportClosed {
                was_subscribed: false,
            };
        }
    };

    let (mut write, mut read) = ws_stream.split();

    let subscribe = build_subscribe_request(wallet);
    if let Err(e) = write.send(Message::Text(subscribe.to_string().into())).await {
        tracing::error!(error = %e, "Failed to send subscribe request");
        return SessionEnd::TransportClosed {
            was_subscribed: false,
        };
    }

    let mut ping_timer = interval(PING_INTERVAL);
    ping_timer.tick().await; // consume the first immediate tick

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(text.as_ref(), wallet, &mut state, event_tx).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if write.send(Message::Pong(data)).await.is_err() {
                            return SessionEnd::TransportClosed {
                                was_subscribed: state == MonitorState::Subscribed,
                            };
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::warn!("Transaction stream sent close frame");
                        return SessionEnd::TransportClosed {
                            was_subscribed: state == MonitorState::Subscribed,
                        };
                    }
                    Some(Ok(_)) => {} // Binary, Pong, Frame — ignore
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Transaction stream read error");
                        return SessionEnd::TransportClosed {
                            was_subscribed: state == MonitorState::Subscribed,
                        };
                    }
                    None => {
                        tracing::warn!("Transaction stream ended");
                        return SessionEnd::TransportClosed {
                            was_subscribed: state == MonitorState::Subscribed,
                        };
                    }
                }
            }
            _ = ping_timer.tick() => {
                // Heartbeat only once the subscription is acknowledged.
                if state == MonitorState::Subscribed {
                    if let Err(e) = write.send(Message::Ping(vec![].into())).await {
                        tracing::warn!(error = %e, "Heartbeat ping failed");
                        return SessionEnd::TransportClosed {
                            was_subscribed: state == MonitorState::Subscribed,
                        };
                    }
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(MonitorCommand::SetWallet(new_wallet)) => {
                        if new_wallet.as_deref() == Some(wallet) {
                            continue;
                        }
                        let _ = write.send(Message::Close(None)).await;
                        return SessionEnd::WalletChanged(new_wallet);
                    }
                    Some(MonitorCommand::Disconnect) => {
                        let _ = write.send(Message::Close(None)).await;
                        return SessionEnd::Teardown;
                    }
                    None => return SessionEnd::ChannelClosed,
                }
            }
        }
    }
}

/// JSON-RPC subscription filtered to the target wallet, confirmed commitment,
/// full transaction detail, failed transactions excluded.
fn build_subscribe_request(wallet: &str) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": SUBSCRIBE_REQUEST_ID,
        "method": "transactionSubscribe",
        "params": [
            {
                "accountInclude": [wallet],
                "failed": false
            },
            {
                "commitment": "confirmed",
                "encoding": "jsonParsed",
                "transactionDetails": "full",
                "showRewards": false,
                "maxSupportedTransactionVersion": 0
            }
        ]
    })
}

#[derive(Debug, Deserialize)]
struct RpcFrame {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<NotifyParams>,
}

#[derive(Debug, Deserialize)]
struct NotifyParams {
    #[serde(default)]
    result: Option<NotifyResult>,
}

#[derive(Debug, Deserialize)]
struct NotifyResult {
    #[serde(default)]
    value: Option<TxValue>,
    #[serde(default)]
    slot: u64,
}

#[derive(Debug, Deserialize)]
struct TxValue {
    #[serde(default)]
    slot: u64,
    #[serde(default)]
    transaction: Option<TxEnvelope>,
    #[serde(default)]
    meta: Option<TxMeta>,
}

#[derive(Debug, Deserialize)]
struct TxEnvelope {
    #[serde(default)]
    signatures: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxMeta {
    #[serde(default)]
    pre_token_balances: Vec<TokenBalance>,
    #[serde(default)]
    post_token_balances: Vec<TokenBalance>,
}

async fn handle_frame(
    text: &str,
    wallet: &str,
    state: &mut MonitorState,
    event_tx: &mpsc::Sender<TransactionEvent>,
) {
    let frame: RpcFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable stream frame");
            return;
        }
    };

    // Subscription ack: Connecting → Subscribed.
    if frame.id == Some(SUBSCRIBE_REQUEST_ID) && frame.result.is_some() {
        *state = MonitorState::Subscribed;
        tracing::info!(
            wallet = %truncated(wallet),
            subscription = %frame.result.unwrap_or_default(),
            "Transaction subscription confirmed"
        );
        return;
    }

    if frame.method.as_deref() != Some("transactionNotification") {
        return;
    }

    let Some(result) = frame.params.and_then(|p| p.result) else {
        return;
    };
    let slot = result.slot;
    let Some(value) = result.value else { return };
    let Some(envelope) = value.transaction else {
        tracing::debug!("Transaction notification without transaction body");
        return;
    };
    let Some(signature) = envelope.signatures.first().cloned() else {
        return;
    };
    let meta = value.meta.unwrap_or_default();

    let changes = diff_token_balances(
        &meta.pre_token_balances,
        &meta.post_token_balances,
        wallet,
    );
    if changes.is_empty() {
        return;
    }

    tracing::info!(
        signature = %truncated(&signature),
        change_count = changes.len(),
        "Token balance changes detected"
    );

    let event = TransactionEvent {
        signature,
        slot: if value.slot != 0 { value.slot } else { slot },
        changes,
    };
    if let Err(e) = event_tx.send(event).await {
        tracing::error!(error = %e, "Failed to send transaction event to pipeline");
    }
}

fn truncated(s: &str) -> &str {
    s.get(..8).unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_non_decreasing_and_capped() {
        let mut last = Duration::ZERO;
        for attempt in 1..=5 {
            let delay = reconnect_delay(attempt);
            assert!(delay >= last);
            last = delay;
        }
        // Beyond attempt 5 the delay stays at the attempt-5 value.
        for attempt in 6..MAX_RECONNECT_ATTEMPTS {
            assert_eq!(reconnect_delay(attempt), reconnect_delay(5));
        }
    }

    #[test]
    fn healthy_session_resets_attempt_counter() {
        // Consecutive failed sessions accumulate...
        let mut attempts = 0;
        for _ in 0..3 {
            attempts = next_attempts(attempts, false);
        }
        assert_eq!(attempts, 3);

        // ...but a drop after a subscribed session starts over, so
        // occasional disconnects over a long process lifetime never reach
        // the give-up limit.
        attempts = next_attempts(attempts, true);
        assert_eq!(attempts, 1);
        assert!(attempts < MAX_RECONNECT_ATTEMPTS);
    }

    #[test]
    fn truncation_is_safe_on_any_input() {
        assert_eq!(truncated("abc"), "abc");
        assert_eq!(truncated("abcdefghij"), "abcdefgh");
        // Byte 8 lands mid-character here; the full string comes back
        // instead of a panic.
        assert_eq!(truncated("€€€"), "€€€");
    }

    #[test]
    fn subscribe_request_targets_wallet() {
        let req = build_subscribe_request("WalletAbc");
        assert_eq!(req["method"], "transactionSubscribe");
        assert_eq!(req["params"][0]["accountInclude"][0], "WalletAbc");
        assert_eq!(req["params"][1]["commitment"], "confirmed");
        assert_eq!(req["params"][1]["transactionDetails"], "full");
    }

    #[tokio::test]
    async fn ack_frame_moves_state_to_subscribed() {
        let (tx, _rx) = mpsc::channel(8);
        let mut state = MonitorState::Connecting;
        let ack = format!(r#"{{"jsonrpc":"2.0","id":{SUBSCRIBE_REQUEST_ID},"result":99}}"#);
        handle_frame(&ack, "WalletAbc", &mut state, &tx).await;
        assert_eq!(state, MonitorState::Subscribed);
    }

    #[tokio::test]
    async fn notification_emits_balance_changes() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut state = MonitorState::Subscribed;
        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "transactionNotification",
            "params": {
                "result": {
                    "slot": 123,
                    "value": {
                        "transaction": { "signatures": ["sigXYZ"] },
                        "meta": {
                            "preTokenBalances": [],
                            "postTokenBalances": [{
                                "mint": "mintA",
                                "owner": "WalletAbc",
                                "uiTokenAmount": { "uiAmount": 5.0 }
                            }]
                        }
                    }
                }
            }
        });
        handle_frame(&frame.to_string(), "WalletAbc", &mut state, &tx).await;

        let event = rx.try_recv().expect("event should be emitted");
        assert_eq!(event.signature, "sigXYZ");
        assert_eq!(event.slot, 123);
        assert_eq!(event.changes.len(), 1);
        assert_eq!(event.changes[0].mint, "mintA");
    }

    #[tokio::test]
    async fn non_trade_frames_are_ignored() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut state = MonitorState::Subscribed;
        handle_frame(r#"{"jsonrpc":"2.0","method":"ping"}"#, "W", &mut state, &tx).await;
        handle_frame("not json at all", "W", &mut state, &tx).await;
        assert!(rx.try_recv().is_err());
    }
}
