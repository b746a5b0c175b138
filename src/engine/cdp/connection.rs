//! CDP WebSocket connection
//!
//! JSON-RPC over WebSocket to a single DevTools target. Commands are matched to
//! responses through a pending-command map keyed by id; a background reader task
//! owns the receive half of the stream and resolves waiters through oneshot
//! channels.

use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::types::{CdpRequest, CdpRpcResponse};
use crate::Error;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Pending command waiting for its response
#[derive(Debug)]
struct PendingCommand {
    sender: tokio::sync::oneshot::Sender<CdpRpcResponse>,
    method: String,
}

/// WebSocket connection to one CDP target
#[derive(Debug)]
pub struct CdpConnection {
    url: String,
    writer: Mutex<WsSink>,
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, PendingCommand>>>,
    is_active: Arc<AtomicBool>,
    command_timeout: Duration,
}

impl CdpConnection {
    /// Connect to a target WebSocket URL
    pub async fn connect(url: &str, command_timeout: Duration) -> Result<Arc<Self>, Error> {
        debug!("Connecting to CDP target: {}", url);

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::websocket(format!("Failed to connect to {}: {}", url, e)))?;

        let (writer, reader) = ws_stream.split();

        let pending = Arc::new(Mutex::new(HashMap::new()));
        let is_active = Arc::new(AtomicBool::new(true));

        let connection = Arc::new(Self {
            url: url.to_string(),
            writer: Mutex::new(writer),
            next_id: AtomicU64::new(1),
            pending: Arc::clone(&pending),
            is_active: Arc::clone(&is_active),
            command_timeout,
        });

        tokio::spawn(Self::read_loop(reader, pending, is_active));

        Ok(connection)
    }

    /// Background task resolving responses and draining events
    async fn read_loop(
        mut reader: futures::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
        pending: Arc<Mutex<HashMap<u64, PendingCommand>>>,
        is_active: Arc<AtomicBool>,
    ) {
        while let Some(message) = reader.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if let Ok(response) = serde_json::from_str::<CdpRpcResponse>(&text) {
                        let mut pending = pending.lock().await;
                        if let Some(cmd) = pending.remove(&response.id) {
                            debug!("Response for command {} ({})", response.id, cmd.method);
                            let _ = cmd.sender.send(response);
                        }
                        // Events and unmatched responses are ignored; nothing in
                        // this crate subscribes to CDP notifications.
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("CDP target sent close frame");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("CDP read error: {}", e);
                    break;
                }
            }
        }

        is_active.store(false, Ordering::SeqCst);
        // Fail any waiters left behind by dropping their senders.
        pending.lock().await.clear();
    }

    /// Send a CDP command and wait for its response result
    pub async fn send_command(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket(format!(
                "Connection to {} is not active",
                self.url
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
        };

        let json = serde_json::to_string(&request)?;
        debug!("Sending CDP command {}: {}", id, method);

        let (sender, receiver) = tokio::sync::oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(
                id,
                PendingCommand {
                    sender,
                    method: method.to_string(),
                },
            );
        }

        {
            let mut writer = self.writer.lock().await;
            writer
                .send(Message::Text(json))
                .await
                .map_err(|e| Error::websocket(format!("Failed to send command: {}", e)))?;
        }

        match tokio::time::timeout(self.command_timeout, receiver).await {
            Ok(Ok(response)) => {
                if let Some(error) = response.error {
                    return Err(Error::engine(format!(
                        "{} failed: {} (code {})",
                        method, error.message, error.code
                    )));
                }
                Ok(response.result)
            }
            Ok(Err(_)) => Err(Error::websocket(format!(
                "Connection closed while waiting for {} response",
                method
            ))),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(Error::engine(format!(
                    "Command {} timed out after {:?}",
                    method, self.command_timeout
                )))
            }
        }
    }

    /// Close the connection
    pub async fn close(&self) -> Result<(), Error> {
        debug!("Closing CDP connection to {}", self.url);
        self.is_active.store(false, Ordering::SeqCst);

        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Close(None))
            .await
            .map_err(|e| Error::websocket(format!("Failed to close WebSocket: {}", e)))?;

        Ok(())
    }

    /// Whether the connection is usable
    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
