use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, Mutex};

use crate::models::NotificationEvent;

const CLIENT_CHANNEL_CAPACITY: usize = 64;

struct ClientChannel {
    /// Owning user resolved at connect time. `None` means the connection is
    /// untagged (single-tenant/local mode) and receives everything.
    user_id: Option<i64>,
    tx: mpsc::Sender<NotificationEvent>,
}

/// Registry of open client channels, keyed by connection id.
///
/// `broadcast` delivers an event to every channel tagged with the event's
/// owning user (untagged channels always receive). A channel that cannot be
/// written to is removed from the registry.
pub struct Fanout {
    next_id: AtomicU64,
    channels: Mutex<HashMap<u64, ClientChannel>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Register a client; returns the connection id and the receiving end.
    pub async fn register(
        &self,
        user_id: Option<i64>,
    ) -> (u64, mpsc::Receiver<NotificationEvent>) {
        let (tx, rx) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut channels = self.channels.lock().await;
        channels.insert(id, ClientChannel { user_id, tx });
        tracing::info!(
            connection = id,
            user = ?user_id,
            total = channels.len(),
            "Live client connected"
        );
        (id, rx)
    }

    pub async fn unregister(&self, id: u64) {
        let mut channels = self.channels.lock().await;
        if channels.remove(&id).is_some() {
            tracing::info!(connection = id, total = channels.len(), "Live client disconnected");
        }
    }

    /// Deliver an event to the channels of its owning user. Failed writes
    /// evict the channel.
    pub async fn broadcast(&self, event: NotificationEvent) {
        let owner = event.owner();
        let mut dead = Vec::new();

        let channels = self.channels.lock().await;
        for (id, client) in channels.iter() {
            if let Some(tag) = client.user_id {
                if tag != owner {
                    continue;
                }
            }
            if client.tx.try_send(event.clone()).is_err() {
                dead.push(*id);
            }
        }
        drop(channels);

        if !dead.is_empty() {
            let mut channels = self.channels.lock().await;
            for id in dead {
                channels.remove(&id);
                tracing::warn!(connection = id, "Evicted unwritable live client");
            }
        }
    }

    pub async fn client_count(&self) -> usize {
        self.channels.lock().await.len()
    }
}

impl Default for Fanout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationEvent;

    fn deleted_event(user_id: i64) -> NotificationEvent {
        NotificationEvent::TokenDeleted { id: 7, user_id }
    }

    #[tokio::test]
    async fn broadcast_reaches_matching_user_only() {
        let fanout = Fanout::new();
        let (_id_a, mut rx_a) = fanout.register(Some(1)).await;
        let (_id_b, mut rx_b) = fanout.register(Some(2)).await;

        fanout.broadcast(deleted_event(1)).await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn untagged_channel_receives_everything() {
        let fanout = Fanout::new();
        let (_id, mut rx) = fanout.register(None).await;

        fanout.broadcast(deleted_event(1)).await;
        fanout.broadcast(deleted_event(2)).await;

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn dropped_receiver_is_evicted_on_broadcast() {
        let fanout = Fanout::new();
        let (_id, rx) = fanout.register(Some(1)).await;
        drop(rx);
        assert_eq!(fanout.client_count().await, 1);

        fanout.broadcast(deleted_event(1)).await;
        assert_eq!(fanout.client_count().await, 0);
    }

    #[tokio::test]
    async fn unregister_removes_channel() {
        let fanout = Fanout::new();
        let (id, _rx) = fanout.register(Some(1)).await;
        fanout.unregister(id).await;
        assert_eq!(fanout.client_count().await, 0);
    }
}
