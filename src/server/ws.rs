use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::api::SharedState;
use crate::campaign::CampaignStatus;
use crate::campaign::hub::Snapshot;

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── WebSocket message types ──────────────────────────────────────────

/// Server → client frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsMessage {
    Status(CampaignStatus),
    Pong,
}

/// Client → server frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping,
}

fn encode(msg: &WsMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(error = %e, "failed to serialize WsMessage");
            None
        }
    }
}

fn status_frame(snapshot: &Snapshot) -> Option<String> {
    encode(&WsMessage::Status(CampaignStatus::clone(snapshot)))
}

// ── WebSocket handler ────────────────────────────────────────────────

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (sender, receiver) = socket.split();
    let orchestrator = Arc::clone(&state.orchestrator);
    let subscription = orchestrator.subscribe();
    debug!(observer = subscription.id, "websocket observer connected");
    run_socket_loop(sender, receiver, subscription.rx).await;
    orchestrator.unsubscribe(subscription.id);
    debug!(observer = subscription.id, "websocket observer disconnected");
}

/// Core WebSocket loop with ping/pong keepalive.
///
/// Sends the current snapshot first, then every snapshot the hub publishes.
/// Coalesced snapshots are fine: the latest is always delivered. If no Pong
/// is received within [`PONG_TIMEOUT`] after a Ping is sent, the connection
/// is considered dead and the loop exits.
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: watch::Receiver<Snapshot>,
) {
    let initial = status_frame(&rx.borrow_and_update());
    if let Some(json) = initial
        && sender.send(Message::Text(json.into())).await.is_err()
    {
        return;
    }

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately; consume it so the first real
    // ping fires after PING_INTERVAL has elapsed.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            // ── Periodic ping ───────────────────────────────────────
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    break;
                }
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            // ── Snapshot forwarding ─────────────────────────────────
            changed = rx.changed() => {
                if changed.is_err() {
                    // Hub dropped us (orchestrator gone)
                    break;
                }
                let frame = status_frame(&rx.borrow_and_update());
                if let Some(json) = frame
                    && sender.send(Message::Text(json.into())).await.is_err()
                {
                    break;
                }
            }

            // ── Client messages ─────────────────────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(ClientMessage::Ping) = serde_json::from_str(text.as_str())
                            && let Some(json) = encode(&WsMessage::Pong)
                            && sender.send(Message::Text(json.into())).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    // Best-effort close frame
    let _ = sender.send(Message::Close(None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_frame_wraps_full_snapshot() {
        let status = CampaignStatus {
            connections_sent: 3,
            current_action: "Searching for job postings".into(),
            ..CampaignStatus::default()
        };
        let json = encode(&WsMessage::Status(status)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "status");
        assert_eq!(parsed["data"]["connections_sent"], 3);
        assert_eq!(parsed["data"]["current_action"], "Searching for job postings");
        assert!(parsed["data"]["log"].is_array());
    }

    #[test]
    fn pong_frame_has_no_data() {
        let json = encode(&WsMessage::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }

    #[test]
    fn client_ping_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn test_keepalive_constants() {
        assert!(PONG_TIMEOUT > PING_INTERVAL);
        assert_eq!(PING_INTERVAL, Duration::from_secs(30));
        assert_eq!(PONG_TIMEOUT, Duration::from_secs(60));
    }
}
