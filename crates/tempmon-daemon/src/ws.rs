//! WebSocket handler for live scene updates

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tempmon_core::{SceneSnapshot, SceneUpdate};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// WebSocket message types
#[derive(Serialize)]
#[serde(tag = "type", content = "data")]
enum WsMessage {
    /// Full scene, sent on connect
    #[serde(rename = "snapshot")]
    Snapshot(SceneSnapshot),
    #[serde(rename = "scene")]
    Scene(SceneUpdate),
    #[serde(rename = "pong")]
    Pong,
}

impl WsMessage {
    fn to_text(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Message::Text(json.into())),
            Err(e) => {
                warn!(error = %e, "Failed to serialize WebSocket message");
                None
            }
        }
    }
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut scene_events = state.subscribe();

    info!("WebSocket client connected");

    // Send current scene on connect
    if let Some(msg) = WsMessage::Snapshot(state.scene.snapshot()).to_text() {
        if sender.send(msg).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = scene_events.recv() => {
                match event {
                    Ok(update) => {
                        if let Some(msg) = WsMessage::Scene(update).to_text() {
                            if sender.send(msg).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        // Refresh ticks supersede each other
                        debug!(skipped = n, "Scene event channel lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Scene event channel closed");
                        break;
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        if text.as_str() == "ping" {
                            if let Some(pong) = WsMessage::Pong.to_text() {
                                if sender.send(pong).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_shape() {
        let json = serde_json::to_value(WsMessage::Pong).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "pong" }));

        let json = serde_json::to_value(WsMessage::Snapshot(SceneSnapshot::default())).unwrap();
        assert_eq!(json["type"], "snapshot");
        assert!(json["data"]["viewables"].as_array().unwrap().is_empty());
    }
}
