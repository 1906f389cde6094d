//! Client connection handling

use crate::protocol::{serialize, ServerMessage};
use anyhow::{anyhow, Result};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::{self, Message};
use uuid::Uuid;

/// Handle to a connected client
///
/// Cheap to clone; every clone feeds the same outbound queue. The queue closes
/// once the last handle is dropped, which lets the writer task finish.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    /// Unique client identifier
    id: Uuid,

    /// Channel to send messages to this client
    sender: mpsc::Sender<ServerMessage>,

    /// Raised when a broadcast found the outbound queue full
    evicted: Arc<Notify>,
}

impl ClientConnection {
    /// Create a new client connection
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            evicted: Arc::new(Notify::new()),
        }
    }

    /// Create a connection together with the receiving end of its queue
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Get client ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Send a message to the client
    pub async fn send(&self, msg: ServerMessage) -> Result<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| anyhow!("Failed to send message to client {}", self.id))
    }

    /// Queue a message without waiting for room in the outbound queue
    pub fn try_send(&self, msg: ServerMessage) -> Result<(), TrySendError<ServerMessage>> {
        self.sender.try_send(msg)
    }

    /// Tell the connection's handler to stop serving this client
    pub fn evict(&self) {
        self.evicted.notify_one();
    }

    /// Resolves once [`evict`](Self::evict) has been called on any clone
    pub async fn evicted(&self) {
        self.evicted.notified().await;
    }
}

/// Task to write outgoing messages to the client
///
/// Drains the queue until every [`ClientConnection`] handle is dropped, then
/// closes the socket.
pub async fn client_writer_task<S>(mut sink: S, mut receiver: mpsc::Receiver<ServerMessage>)
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(msg) = receiver.recv().await {
        match serialize(&msg) {
            Ok(text) => {
                if let Err(e) = sink.send(Message::text(text)).await {
                    tracing::debug!("Failed to write message to client: {}", e);
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Failed to serialize message: {}", e);
            }
        }
    }

    if let Err(e) = sink.close().await {
        tracing::debug!("Failed to close client socket: {}", e);
    }

    tracing::debug!("Client writer task finished");
}

/// Task to forward inbound text frames to the dispatcher
///
/// Ends on a close frame, a transport error, or when the dispatcher stops
/// listening. Dropping `sender` is how the dispatcher learns the client left.
pub async fn client_reader_task<S>(mut stream: S, sender: mpsc::Sender<String>)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if sender.send(text.as_str().to_owned()).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(data)) => {
                tracing::debug!("Ignoring {}-byte binary frame", data.len());
            }
            // Ping/pong are answered by tungstenite itself.
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Error reading from client: {}", e);
                break;
            }
        }
    }

    tracing::debug!("Client reader task finished");
}

/// Create an error message
pub fn create_error_message(message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error {
        message: message.into(),
    }
}
