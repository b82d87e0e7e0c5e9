//! Real-time event fan-out.
//!
//! The engine treats the broadcaster as a fire-and-forget notification sink:
//! delivery failure never rolls back a committed economic transaction. The
//! trait exists so services can be tested without a network layer.

use crate::types::{AccountId, CoinSide, ItemInstance, RoundSnapshot};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Events pushed to connected clients. Event names match the original
/// platform's socket channel so existing clients keep working.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum GameEvent {
    /// Full round snapshot, sent to everyone on every round mutation.
    #[serde(rename = "coinFlip:gameState")]
    RoundState(RoundSnapshot),

    /// Round outcome reveal, sent to everyone.
    #[serde(rename = "coinFlip:result")]
    RoundResult { outcome: CoinSide },

    /// Balance/progression update for one account.
    #[serde(rename = "userDataUpdated")]
    UserDataUpdated {
        #[serde(rename = "walletBalance")]
        wallet_balance: f64,
        xp: u64,
        level: u32,
    },

    /// A case was opened, shown in the global live feed.
    #[serde(rename = "caseOpened")]
    CaseOpened {
        #[serde(rename = "winningItems")]
        winning_items: Vec<ItemInstance>,
        user: OpenerInfo,
        #[serde(rename = "caseImage")]
        case_image: String,
    },

    /// Targeted notification (marketplace sale, etc.).
    #[serde(rename = "newNotifications")]
    Notification { message: String },
}

/// Public info about the account shown in the case-opening feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenerInfo {
    pub id: AccountId,
    pub name: String,
}

/// An event together with its delivery scope.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// `None` broadcasts to every connected client.
    pub target: Option<AccountId>,
    pub event: GameEvent,
}

/// Notification sink injected into every service that emits events.
pub trait EventBroadcaster: Send + Sync {
    /// Push an event to all connected clients.
    fn broadcast(&self, event: GameEvent);

    /// Push an event to one account's connections.
    fn send_to(&self, account: AccountId, event: GameEvent);
}

/// Production broadcaster over a tokio broadcast channel; the websocket layer
/// subscribes and filters targeted envelopes per connection.
#[derive(Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<Envelope>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBroadcaster for ChannelBroadcaster {
    fn broadcast(&self, event: GameEvent) {
        if let Err(e) = self.tx.send(Envelope {
            target: None,
            event,
        }) {
            debug!("No clients to receive broadcast event: {}", e);
        }
    }

    fn send_to(&self, account: AccountId, event: GameEvent) {
        if let Err(e) = self.tx.send(Envelope {
            target: Some(account),
            event,
        }) {
            debug!("No clients to receive targeted event: {}", e);
        }
    }
}

/// Sink that drops everything. Used by tests exercising the economy without a
/// channel.
#[derive(Debug, Default, Clone)]
pub struct NullBroadcaster;

impl EventBroadcaster for NullBroadcaster {
    fn broadcast(&self, _event: GameEvent) {}
    fn send_to(&self, _account: AccountId, _event: GameEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Round, RoundPhase};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_event_wire_names() {
        let event = GameEvent::UserDataUpdated {
            wallet_balance: 400.0,
            xp: 120,
            level: 1,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "userDataUpdated");
        assert_eq!(json["data"]["walletBalance"], 400.0);

        let event = GameEvent::RoundState(Round::fresh(Utc::now()).snapshot());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "coinFlip:gameState");
        assert_eq!(json["data"]["phase"], "open_for_bets");
        let _ = RoundPhase::OpenForBets;
    }

    #[tokio::test]
    async fn test_channel_broadcaster_delivers_envelopes() {
        let broadcaster = ChannelBroadcaster::new(16);
        let mut rx = broadcaster.subscribe();
        let account = Uuid::new_v4();

        broadcaster.send_to(
            account,
            GameEvent::Notification {
                message: "Your Hakkero has been sold".to_string(),
            },
        );

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.target, Some(account));
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let broadcaster = ChannelBroadcaster::new(16);
        // Must not panic or error with zero receivers.
        broadcaster.broadcast(GameEvent::RoundResult {
            outcome: CoinSide::Heads,
        });
    }
}
