//! Real-time channel: websocket transport binding identities to presence
//!
//! A client opens the socket and announces itself with a `user_login`
//! event; from then on it receives location and friendship events until it
//! logs out or the socket closes. The binding is per-connection: closing
//! the socket unbinds only if no fresher login took over the username.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::presence::ConnectionHandle;
use crate::state::AppState;

/// Events sent by clients over the websocket
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Bind this connection to a username
    #[serde(rename_all = "camelCase")]
    UserLogin { username: String },
    /// Drop the binding without closing the socket
    UserLogout,
}

/// Upgrade handler for `GET /ws`
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    info!(%conn_id, "Client connected");

    // Forward queued events to the socket until the client goes away.
    let forward_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(%conn_id, "Failed to encode event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut username: Option<String> = None;
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(ClientEvent::UserLogin { username: name }) => {
                    state
                        .presence
                        .bind(&name, ConnectionHandle::new(conn_id, tx.clone()))
                        .await;
                    let connections = state.presence.len().await;
                    info!(
                        %conn_id,
                        username = %name,
                        connections,
                        "User bound to connection"
                    );
                    username = Some(name);
                }
                Ok(ClientEvent::UserLogout) => {
                    if let Some(name) = username.take() {
                        state.presence.unbind(&name, conn_id).await;
                        info!(%conn_id, username = %name, "User logged out");
                    }
                }
                Err(e) => debug!(%conn_id, "Ignoring malformed client event: {}", e),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    if let Some(name) = username {
        if state.presence.unbind(&name, conn_id).await {
            info!(%conn_id, username = %name, "User unbound on disconnect");
        }
    }
    forward_task.abort();
    info!(%conn_id, "Client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_parsing() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event": "user_login", "data": {"username": "alice"}}"#)
                .unwrap();
        assert!(matches!(event, ClientEvent::UserLogin { username } if username == "alice"));

        let event: ClientEvent = serde_json::from_str(r#"{"event": "user_logout"}"#).unwrap();
        assert!(matches!(event, ClientEvent::UserLogout));

        assert!(serde_json::from_str::<ClientEvent>(r#"{"event": "unknown"}"#).is_err());
    }
}
