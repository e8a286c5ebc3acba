//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    domain::{
        MessageContent, Notification, RoomId, SessionId, SessionIdFactory, SignalKind, Username,
        notification::error_code,
    },
    infrastructure::dto::websocket::ClientMessage,
    ui::state::AppState,
    usecase::ConnectError,
};

/// Identity bound to one WebSocket connection by its URL path
#[derive(Debug, Clone)]
struct Connection {
    room_id: RoomId,
    session_id: SessionId,
    username: Username,
}

/// `GET /ws/studyroom/{room_id}/{username}/{session_id}`
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path((room_id, username, session_id)): Path<(String, String, String)>,
) -> Result<Response, StatusCode> {
    let session_id = SessionId::new(session_id).map_err(|e| {
        tracing::warn!("Invalid session id: {}", e);
        StatusCode::BAD_REQUEST
    })?;
    accept(ws, state, room_id, username, session_id).await
}

/// `GET /ws/studyroom/{room_id}/{username}` (clients without a session id)
pub async fn legacy_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path((room_id, username)): Path<(String, String)>,
) -> Result<Response, StatusCode> {
    let session_id = SessionIdFactory::generate().map_err(|e| {
        tracing::error!("Failed to generate session id: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    accept(ws, state, room_id, username, session_id).await
}

async fn accept(
    ws: WebSocketUpgrade,
    state: Arc<AppState>,
    room_id: String,
    username: String,
    session_id: SessionId,
) -> Result<Response, StatusCode> {
    // Convert String -> Domain Model
    let (room_id, username) = match (RoomId::new(room_id), Username::new(username)) {
        (Ok(room_id), Ok(username)) => (room_id, username),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Rejecting connection with invalid path: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };
    let connection = Connection {
        room_id,
        session_id,
        username,
    };

    // Create a channel for this client to receive messages
    let (tx, rx) = mpsc::unbounded_channel();

    // Join before upgrading so that 409 / 503 can be answered over HTTP.
    // Initial frames are queued in `tx` and flushed once the socket is up.
    match state
        .connect_participant_usecase
        .execute(
            connection.room_id.clone(),
            connection.session_id.clone(),
            connection.username.clone(),
            tx,
        )
        .await
    {
        Ok(_) => {
            tracing::info!(
                "'{}' ({}) joined room '{}'",
                connection.username,
                connection.session_id,
                connection.room_id
            );
            let failed_state = state.clone();
            let failed_connection = connection.clone();
            Ok(ws
                .on_failed_upgrade(move |e| {
                    tracing::warn!("WebSocket upgrade failed: {}", e);
                    tokio::spawn(async move {
                        disconnect(&failed_state, &failed_connection).await;
                    });
                })
                .on_upgrade(move |socket| handle_socket(socket, state, connection, rx))
                .into_response())
        }
        Err(ConnectError::DuplicateSession(id)) => {
            tracing::warn!(
                "Session '{}' is already connected to room '{}'. Rejecting connection.",
                id,
                connection.room_id
            );
            Err(StatusCode::CONFLICT)
        }
        Err(ConnectError::RoomCapacityExceeded) => {
            tracing::warn!(
                "Room '{}' is full. Cannot add '{}'",
                connection.room_id,
                connection.username
            );
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
        Err(ConnectError::Repository(e)) => {
            tracing::error!("Failed to join room: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// # Arguments
///
/// * `rx` - Channel receiver for frames addressed to this connection
/// * `sender` - WebSocket sink to send messages to this client
///
/// # Returns
///
/// A `JoinHandle` for the spawned task
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    connection: Connection,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (sender, mut receiver) = socket.split();

    let recv_state = state.clone();
    let recv_connection = connection.clone();

    // Spawn a task to receive frames from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    dispatch(&recv_state, &recv_connection, text.as_str()).await;
                }
                Message::Close(_) => {
                    tracing::info!("'{}' requested close", recv_connection.session_id);
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                _ => {}
            }
        }
    });

    // Spawn a task to flush queued frames to this client
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    disconnect(&state, &connection).await;
}

async fn disconnect(state: &AppState, connection: &Connection) {
    match state
        .disconnect_participant_usecase
        .execute(&connection.room_id, &connection.session_id)
        .await
    {
        Ok(notified) => tracing::info!(
            "'{}' ({}) left room '{}', {} connection(s) notified",
            connection.username,
            connection.session_id,
            connection.room_id,
            notified.len()
        ),
        Err(e) => tracing::warn!("Failed to disconnect: {}", e),
    }
}

/// Routes one inbound text frame to its usecase
async fn dispatch(state: &AppState, connection: &Connection, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            reject(state, connection, format!("malformed frame: {}", e)).await;
            return;
        }
    };

    match message {
        ClientMessage::UserJoin {
            username,
            session_id,
            room_id,
        } => {
            tracing::debug!(
                "user_join from '{}' (sessionId={}, roomId={})",
                username,
                session_id,
                room_id
            );
        }
        ClientMessage::TimerUpdate { data } => {
            if let Err(e) = state
                .update_timer_usecase
                .execute(
                    &connection.room_id,
                    &connection.session_id,
                    &connection.username,
                    data.into(),
                )
                .await
            {
                tracing::debug!("Timer update not applied: {}", e);
            }
        }
        ClientMessage::ChatMessage { message, .. } => {
            let content = match MessageContent::new(message) {
                Ok(content) => content,
                Err(e) => {
                    reject(state, connection, e.to_string()).await;
                    return;
                }
            };
            if let Err(e) = state
                .send_message_usecase
                .execute(&connection.room_id, connection.username.clone(), content)
                .await
            {
                tracing::warn!("Failed to send message: {}", e);
            }
        }
        ClientMessage::WebrtcOffer { sdp, to, .. } => {
            relay(state, connection, SignalKind::Offer, sdp, to).await;
        }
        ClientMessage::WebrtcAnswer { sdp, to, .. } => {
            relay(state, connection, SignalKind::Answer, sdp, to).await;
        }
        ClientMessage::WebrtcIce { candidate, to, .. } => {
            relay(state, connection, SignalKind::IceCandidate, candidate, to).await;
        }
        ClientMessage::Unknown => {
            tracing::debug!("Ignoring frame with unknown type: {}", text);
        }
    }
}

async fn relay(
    state: &AppState,
    connection: &Connection,
    kind: SignalKind,
    payload: Value,
    to: String,
) {
    let to = match Username::new(to) {
        Ok(to) => to,
        Err(e) => {
            reject(state, connection, e.to_string()).await;
            return;
        }
    };
    if let Err(e) = state
        .relay_signal_usecase
        .execute(
            &connection.room_id,
            &connection.session_id,
            connection.username.clone(),
            to,
            kind,
            payload,
        )
        .await
    {
        tracing::debug!("Signal not relayed: {}", e);
    }
}

/// Answers a frame that could not be processed with an `invalid_payload` error
async fn reject(state: &AppState, connection: &Connection, reason: String) {
    tracing::warn!("Invalid frame from '{}': {}", connection.session_id, reason);
    let notification = Notification::Error {
        code: error_code::INVALID_PAYLOAD,
        message: reason,
    };
    if let Err(e) = state
        .message_pusher
        .push_to(&connection.session_id, &notification)
        .await
    {
        tracing::warn!("Failed to send error frame: {}", e);
    }
}
