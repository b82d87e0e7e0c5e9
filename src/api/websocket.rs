//! WebSocket endpoint for real-time game events.
//!
//! Every connection subscribes to the engine's broadcast channel. Untargeted
//! envelopes go to everyone; targeted envelopes are dropped unless the
//! connection identified itself with the matching `accountId` query
//! parameter. Inbound messages carry coin-flip bets and game-state requests.

use super::handlers::AppState;
use crate::broadcast::GameEvent;
use crate::types::{AccountId, CoinSide};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Identifies the connection for targeted events and inbound bets.
    #[serde(rename = "accountId")]
    pub account_id: Option<AccountId>,
}

/// Messages clients may send over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
enum ClientMessage {
    #[serde(rename = "coinFlip:bet")]
    Bet { bet: f64, choice: CoinSide },
    #[serde(rename = "requestGameState")]
    RequestGameState,
}

/// GET /ws
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state, query.account_id))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>, account: Option<AccountId>) {
    info!(?account, "WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.broadcaster.subscribe();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Message>();

    // Every connection starts with the current round so late joiners can
    // render immediately.
    let snapshot = state.round.snapshot().await;
    if let Ok(text) = serde_json::to_string(&GameEvent::RoundState(snapshot)) {
        if sender.send(Message::Text(text)).await.is_err() {
            return;
        }
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => {
                    let envelope = match event {
                        Ok(envelope) => envelope,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "WebSocket client lagging, events dropped");
                            continue;
                        }
                        Err(_) => break,
                    };
                    if let Some(target) = envelope.target {
                        if account != Some(target) {
                            continue;
                        }
                    }
                    let text = match serde_json::to_string(&envelope.event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                reply = reply_rx.recv() => {
                    match reply {
                        Some(message) => {
                            if sender.send(message).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_client_message(&recv_state, account, &text, &reply_tx).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(payload)) => {
                    let _ = reply_tx.send(Message::Pong(payload));
                }
                Err(e) => {
                    debug!("WebSocket receive error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    info!(?account, "WebSocket client disconnected");
}

async fn handle_client_message(
    state: &Arc<AppState>,
    account: Option<AccountId>,
    text: &str,
    reply_tx: &mpsc::UnboundedSender<Message>,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(_) => {
            send_error(reply_tx, "Unrecognized message");
            return;
        }
    };

    match message {
        ClientMessage::Bet { bet, choice } => {
            let Some(account) = account else {
                send_error(reply_tx, "Connect with accountId to place bets");
                return;
            };
            if let Err(e) = state.round.place_bet(account, bet, choice).await {
                send_error(reply_tx, &e.to_string());
            }
        }
        ClientMessage::RequestGameState => {
            let snapshot = state.round.snapshot().await;
            if let Ok(text) = serde_json::to_string(&GameEvent::RoundState(snapshot)) {
                let _ = reply_tx.send(Message::Text(text));
            }
        }
    }
}

fn send_error(reply_tx: &mpsc::UnboundedSender<Message>, message: &str) {
    let payload = serde_json::json!({
        "event": "error",
        "data": { "message": message },
    });
    let _ = reply_tx.send(Message::Text(payload.to_string()));
}
