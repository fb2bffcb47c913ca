use serde::Serialize;

use super::token::TrackedToken;

/// Events fanned out to connected dashboard clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum NotificationEvent {
    #[serde(rename = "new-token")]
    NewToken(TrackedToken),

    #[serde(rename = "token-updated")]
    TokenUpdated(TrackedToken),

    #[serde(rename = "token-deleted")]
    TokenDeleted {
        id: i64,
        #[serde(skip)]
        user_id: i64,
    },

    #[serde(rename = "purchase-detected")]
    PurchaseDetected {
        token: TrackedToken,
        transaction: String,
        amount: f64,
    },
}

impl NotificationEvent {
    /// User the event belongs to, used for fan-out routing.
    pub fn owner(&self) -> i64 {
        match self {
            NotificationEvent::NewToken(t) => t.user_id,
            NotificationEvent::TokenUpdated(t) => t.user_id,
            NotificationEvent::TokenDeleted { user_id, .. } => *user_id,
            NotificationEvent::PurchaseDetected { token, .. } => token.user_id,
        }
    }
}
