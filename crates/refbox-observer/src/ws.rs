//! `WebSocket` handler for live match state streaming.
//!
//! Clients connect to `GET /ws/state`. They receive the newest
//! [`PublishedState`](crate::state::PublishedState) immediately, then one
//! JSON text frame per publish. A client that falls behind skips straight
//! to the newest snapshot.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::state::{AppState, PublishedState};

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming match state.
///
/// # Route
///
/// `GET /ws/state`
pub async fn ws_state(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Send the receiver's current value as a text frame.
///
/// Returns `false` when the client is gone. A snapshot that fails to
/// serialize is skipped.
async fn send_current(socket: &mut WebSocket, rx: &mut watch::Receiver<PublishedState>) -> bool {
    let json = match serde_json::to_string(&*rx.borrow_and_update()) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize match state: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!(viewers = state.hub.receiver_count(), "WebSocket client connected");

    let mut rx = state.hub.subscribe();

    // Initial snapshot so a fresh viewer does not wait for the next tick.
    if !send_current(&mut socket, &mut rx).await {
        debug!("WebSocket client disconnected (initial send failed)");
        return;
    }

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    debug!("State hub dropped, shutting down WebSocket");
                    return;
                }
                if !send_current(&mut socket, &mut rx).await {
                    debug!("WebSocket client disconnected (send failed)");
                    return;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    // Viewers are read-only; events go through the REST API.
                    _ => {}
                }
            }
        }
    }
}
