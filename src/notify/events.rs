use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct BroadcastEvent {
    pub event: String,
    pub payload: Value,
}

/// Process-wide fan-out channel for realtime listeners. Initialized
/// once at startup and handed to the dispatcher; delivery is
/// best-effort and lagging receivers lose events.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<BroadcastEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: &str, payload: Value) {
        // Err means nobody is listening right now, which is fine.
        let _ = self.tx.send(BroadcastEvent {
            event: event.to_string(),
            payload,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(64)
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let rx = state.notifier.subscribe();
    ws.on_upgrade(move |socket| relay_events(socket, rx))
}

async fn relay_events(mut socket: WebSocket, mut rx: broadcast::Receiver<BroadcastEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let Ok(text) = serde_json::to_string(&event) else {
                    continue;
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    debug!("websocket client disconnected");
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("websocket listener lagged, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = EventHub::default();
        let mut rx = hub.subscribe();

        hub.publish("ticket.assigned", serde_json::json!({ "ticket_id": "t-1" }));

        let event = rx.recv().await.expect("event lost");
        assert_eq!(event.event, "ticket.assigned");
        assert_eq!(event.payload["ticket_id"], "t-1");
    }

    #[test]
    fn publish_without_listeners_is_harmless() {
        let hub = EventHub::default();
        hub.publish("notification", serde_json::json!({}));
    }
}
