//! TCP listener and server main loop

use super::connection::{client_reader_task, client_writer_task, ClientConnection};
use super::error::RelayError;
use super::registry::Registry;
use super::relay::Relay;
use crate::config::Config;
use anyhow::{Context, Result};
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// WebSocket relay server
pub struct RelayServer {
    listener: TcpListener,
    relay: Relay,
    outbound_buffer: usize,
}

impl RelayServer {
    /// Bind the listening socket described by the configuration
    pub async fn bind(config: &Config) -> Result<Self> {
        config.validate()?;

        let addr = config.server.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        let relay = Relay::new(Arc::new(Registry::new()))
            .with_max_message_size(config.relay.max_message_size);

        Ok(Self {
            listener,
            relay,
            outbound_buffer: config.relay.outbound_buffer,
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.relay.registry()
    }

    /// Run the server
    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        tracing::info!("Server listening on {}", self.local_addr()?);

        // Main server loop
        loop {
            tokio::select! {
                // Handle shutdown signal; a dropped sender leaves the server running
                Some(()) = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }

                // Accept new connections
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let relay = self.relay.clone();
                            let outbound_buffer = self.outbound_buffer;
                            tokio::spawn(async move {
                                if let Err(e) = handle_client(stream, addr, relay, outbound_buffer).await {
                                    tracing::error!("Client error: {:#}", e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        tracing::info!(
            sessions = self.registry().len(),
            "Server stopped accepting connections"
        );

        Ok(())
    }
}

/// Handle a single client connection
async fn handle_client(
    stream: TcpStream,
    addr: SocketAddr,
    relay: Relay,
    outbound_buffer: usize,
) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake with {} failed", addr))?;
    let (sink, stream) = ws.split();

    let (conn, outbound_rx) = ClientConnection::channel(outbound_buffer);
    let (inbound_tx, inbound_rx) = mpsc::channel::<String>(outbound_buffer);
    let client_id = conn.id();

    tracing::info!("Client connected: {} ({})", client_id, addr);

    let writer_handle = tokio::spawn(client_writer_task(sink, outbound_rx));
    let reader_handle = tokio::spawn(client_reader_task(stream, inbound_tx));

    match relay.handle_connection(conn, inbound_rx).await {
        Ok(()) => {}
        Err(RelayError::NotFound) => {
            tracing::debug!("Client {} presented an unknown token", client_id);
        }
        Err(e) => {
            tracing::warn!("Dropping client {}: {}", client_id, e);
        }
    }

    // The writer flushes queued messages, then closes the socket once the
    // last connection handle is gone.
    let _ = writer_handle.await;
    reader_handle.abort();

    tracing::info!("Client handler finished: {}", client_id);

    Ok(())
}
