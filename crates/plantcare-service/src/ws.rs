//! WebSocket handler for live snapshots.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use plantcare_core::Snapshot;

use crate::state::AppState;

/// Create the WebSocket router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/ws", get(ws_handler))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(snapshot: &Snapshot) -> Option<Message> {
    match serde_json::to_string(snapshot) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to serialize snapshot: {}", e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the latest snapshot so nothing published in between is lost.
    let mut rx = state.snapshots_tx.subscribe();

    info!("WebSocket client connected");

    let latest = state.latest.read().await.clone();
    if let Some(message) = latest.as_deref().and_then(encode)
        && sender.send(message).await.is_err()
    {
        info!("WebSocket client disconnected during initial snapshot");
        return;
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            let snapshot = match rx.recv().await {
                Ok(snapshot) => snapshot,
                Err(RecvError::Lagged(skipped)) => {
                    debug!("WebSocket client lagged, skipped {} snapshots", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let Some(message) = encode(&snapshot) else {
                continue;
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        },
        _ = &mut recv_task => {
            send_task.abort();
        },
    }

    info!("WebSocket client disconnected");
}
