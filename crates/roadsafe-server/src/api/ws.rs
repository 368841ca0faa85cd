//! WebSocket streaming for real-time alert delivery.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::sync::mpsc;

use roadsafe_core::models::{ClientMessage, Coordinate, ServerEvent};

use crate::state::AppState;

/// Handler for WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
        .into_response()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session_id = state.hub.register(tx);
    tracing::info!(session_id, "websocket connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_client_message(&state, session_id, &text) {
                            let Ok(payload) = serde_json::to_string(&reply) else {
                                continue;
                            };
                            if socket.send(Message::Text(payload)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        let Ok(payload) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    // Hub dropped the session (reaped as dead).
                    None => break,
                }
            }
        }
    }

    state.hub.unregister(session_id);
    tracing::info!(session_id, "websocket disconnected");
}

/// Parse and apply one inbound client message. Unknown or malformed messages
/// are ignored; a well-formed message yields a direct reply.
fn handle_client_message(
    state: &AppState,
    session_id: u64,
    text: &str,
) -> Option<ServerEvent> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            tracing::debug!(session_id, %err, "ignoring malformed client message");
            return None;
        }
    };

    match message {
        ClientMessage::LocationUpdate {
            latitude,
            longitude,
        } => {
            let location = Coordinate::new(latitude, longitude);
            if location.validate().is_err() {
                tracing::debug!(session_id, latitude, longitude, "rejected location update");
                return Some(ServerEvent::LocationUpdated {
                    status: "invalid".to_string(),
                });
            }
            state.hub.update_location(session_id, location);
            Some(ServerEvent::LocationUpdated {
                status: "success".to_string(),
            })
        }
        ClientMessage::Ping { timestamp } => Some(ServerEvent::Pong { timestamp }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::sync::mpsc;

    fn state_with_session() -> (AppState, u64, mpsc::UnboundedReceiver<ServerEvent>) {
        let state = AppState::new(Config::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let session_id = state.hub.register(tx);
        (state, session_id, rx)
    }

    #[tokio::test]
    async fn location_update_stores_and_acknowledges() {
        // The receiver must stay alive or the hub reaps the session on send.
        let (state, session_id, mut rx) = state_with_session();

        let reply = handle_client_message(
            &state,
            session_id,
            r#"{"type": "location_update", "latitude": 40.0, "longitude": -74.0}"#,
        );
        assert!(matches!(
            reply,
            Some(ServerEvent::LocationUpdated { ref status }) if status == "success"
        ));

        // The stored location now receives geofenced pushes.
        let delivered = state.hub.broadcast_to_area(
            Coordinate::new(40.001, -74.0),
            5.0,
            &ServerEvent::AlertDismissed { alert_id: 1 },
        );
        assert_eq!(delivered, 1);
        assert!(matches!(
            rx.recv().await,
            Some(ServerEvent::AlertDismissed { alert_id: 1 })
        ));
    }

    #[tokio::test]
    async fn out_of_range_location_is_rejected() {
        let (state, session_id, _rx) = state_with_session();

        let reply = handle_client_message(
            &state,
            session_id,
            r#"{"type": "location_update", "latitude": 95.0, "longitude": 0.0}"#,
        );
        assert!(matches!(
            reply,
            Some(ServerEvent::LocationUpdated { ref status }) if status == "invalid"
        ));

        let delivered = state.hub.broadcast_to_area(
            Coordinate::new(0.0, 0.0),
            20_000.0,
            &ServerEvent::AlertDismissed { alert_id: 1 },
        );
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn ping_echoes_timestamp() {
        let (state, session_id, _rx) = state_with_session();

        let reply = handle_client_message(
            &state,
            session_id,
            r#"{"type": "ping", "timestamp": 1234.5}"#,
        );
        assert!(matches!(
            reply,
            Some(ServerEvent::Pong { timestamp: Some(ts) }) if ts == 1234.5
        ));
    }

    #[tokio::test]
    async fn malformed_messages_are_ignored() {
        let (state, session_id, _rx) = state_with_session();
        assert!(handle_client_message(&state, session_id, "not json").is_none());
        assert!(handle_client_message(&state, session_id, r#"{"type": "unknown"}"#).is_none());
    }
}

