mod admin;
pub mod handlers;
mod portal;
mod voter;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage, SessionInfo};
use crate::state::AppState;
use crate::types::{Role, Session};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request (token: {})",
        if params.token.is_some() { "yes" } else { "no" }
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params.token, state))
}

/// Look the token up again. A logged-out token turns the connection anonymous.
async fn current_session(state: &AppState, token: Option<&str>) -> Option<Session> {
    state.resolve_session(token?).await.ok()
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, token: Option<String>, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let session = current_session(&state, token.as_deref()).await;
    if token.is_some() && session.is_none() {
        tracing::info!("WebSocket token not recognized, continuing anonymously");
    }
    let is_admin = session.as_ref().is_some_and(|s| s.role == Role::Admin);

    tracing::info!(
        "WebSocket connected: {}",
        session
            .as_ref()
            .map(|s| format!("{} ({:?})", s.name, s.role))
            .unwrap_or_else(|| "anonymous".to_string())
    );

    let settings = match state.get_settings().await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Failed to read settings for welcome: {}", e);
            let _ = send_json(&mut sender, &e.to_message()).await;
            return;
        }
    };

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        session: session.as_ref().map(SessionInfo::from),
        settings,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send_json(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    // Subscribe to general broadcast (all clients)
    let mut broadcast_rx = state.broadcast.subscribe();

    // Subscribe to admin-only broadcast if admin
    let mut admin_broadcast_rx = if is_admin {
        Some(state.admin_broadcast.subscribe())
    } else {
        None
    };

    loop {
        tokio::select! {
            broadcast_msg = broadcast_rx.recv() => {
                if let Ok(msg) = broadcast_msg {
                    if !send_json(&mut sender, &msg).await {
                        break;
                    }
                }
            }

            admin_msg = async {
                match &mut admin_broadcast_rx {
                    Some(rx) => rx.recv().await.ok(),
                    None => std::future::pending::<Option<ServerMessage>>().await,
                }
            } => {
                if let Some(msg) = admin_msg {
                    if !send_json(&mut sender, &msg).await {
                        break;
                    }
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                let session = current_session(&state, token.as_deref()).await;
                                handlers::handle_message(client_msg, session.as_ref(), &state).await
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(response) = response {
                            if !send_json(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!("WebSocket connection closed");
}
