//! Room WebSocket transport.
//!
//! One connection per session. Inbound frames are decoded and queued on an
//! mpsc channel; outbound frames go through an [`Outbox`], which silently
//! drops frames once the socket is no longer open. There is no reconnect.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures_util::{SinkExt, StreamExt};
use studyroom_server::infrastructure::dto::websocket::{ClientMessage, ServerMessage};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, http::StatusCode, protocol::Message},
};

use crate::error::ClientError;

/// Build the room URL `<base>/ws/studyroom/<room>/<username>/<session>`.
///
/// Each segment is percent-encoded so that names with spaces or slashes stay
/// a single path segment.
pub fn room_url(base: &str, room_id: &str, username: &str, session_id: &str) -> String {
    format!(
        "{}/ws/studyroom/{}/{}/{}",
        base.trim_end_matches('/'),
        urlencoding::encode(room_id),
        urlencoding::encode(username),
        urlencoding::encode(session_id)
    )
}

/// Frame queued for the writer task
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Frame(ClientMessage),
    Close,
}

/// Fire-and-forget send side of the connection
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: UnboundedSender<Outgoing>,
    connected: Arc<AtomicBool>,
}

impl Outbox {
    /// Create an open outbox and the receiving end of its queue
    pub fn channel() -> (Self, UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let outbox = Self {
            tx,
            connected: Arc::new(AtomicBool::new(true)),
        };
        (outbox, rx)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queue a frame.
    ///
    /// # Returns
    ///
    /// `false` when the connection is not open and the frame was dropped
    pub fn send(&self, message: ClientMessage) -> bool {
        if !self.is_connected() {
            tracing::debug!("Not connected, dropping outgoing frame");
            return false;
        }
        self.tx.send(Outgoing::Frame(message)).is_ok()
    }

    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.tx.send(Outgoing::Close);
    }

    fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// An open room connection
pub struct Connection {
    pub outbox: Outbox,
    /// Decoded server frames; yields `None` once the socket has closed
    pub inbound: UnboundedReceiver<ServerMessage>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    /// Close the socket and wait for the close frame to be written
    pub async fn close(self) {
        self.outbox.close();
        let _ = self.writer.await;
        self.reader.abort();
    }
}

/// Open the room WebSocket.
///
/// # Errors
///
/// * `DuplicateSession` - the server answered 409 (session already connected)
/// * `RoomFull` - the server answered 503
/// * `ConnectionError` - any other failure
pub async fn connect(url: &str, room_id: &str, session_id: &str) -> Result<Connection, ClientError> {
    let (ws_stream, _response) = connect_async(url).await.map_err(|e| match e {
        WsError::Http(response) if response.status() == StatusCode::CONFLICT => {
            ClientError::DuplicateSession(session_id.to_string())
        }
        WsError::Http(response) if response.status() == StatusCode::SERVICE_UNAVAILABLE => {
            ClientError::RoomFull(room_id.to_string())
        }
        e => ClientError::ConnectionError(e.to_string()),
    })?;
    tracing::info!("Connected to {}", url);

    let (mut write, mut read) = ws_stream.split();
    let (outbox, mut outgoing) = Outbox::channel();
    let (inbound_tx, inbound) = mpsc::unbounded_channel::<ServerMessage>();

    let reader_outbox = outbox.clone();
    let reader = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(frame) => {
                        if inbound_tx.send(frame).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Ignoring malformed frame: {}", e),
                },
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
                _ => {}
            }
        }
        reader_outbox.mark_disconnected();
    });

    let writer_outbox = outbox.clone();
    let writer = tokio::spawn(async move {
        while let Some(item) = outgoing.recv().await {
            match item {
                Outgoing::Frame(frame) => {
                    let json = match serde_json::to_string(&frame) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!("Failed to serialize frame: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = write.send(Message::Text(json.into())).await {
                        tracing::warn!("Failed to send frame: {}", e);
                        break;
                    }
                }
                Outgoing::Close => {
                    write.send(Message::Close(None)).await.ok();
                    break;
                }
            }
        }
        writer_outbox.mark_disconnected();
    });

    Ok(Connection {
        outbox,
        inbound,
        reader,
        writer,
    })
}
