//! WebSocket transport.
//!
//! Each `connect()` spawns one tokio task that:
//! 1. Opens the WebSocket (TLS when the URL is `wss://`).
//! 2. Flips the connection status to open.
//! 3. Forwards text and binary frames to the inbound broadcast.
//! 4. Drains the outbound queue onto the socket.
//! 5. Answers pings.
//!
//! A close frame, read error or send error flips the status to closed and ends
//! the task. There is no automatic reconnect: the owner decides when to call
//! `connect()` again.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::{Transport, TransportChannels, TransportFailure, WireMessage};
use crate::error::PtError;

/// Public echo endpoint used when no URL is configured.
pub const DEFAULT_ECHO_URL: &str = "wss://ws.postman-echo.com/raw";

/// Configuration for a [`WsTransport`].
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Full WebSocket URL (e.g. `wss://ws.postman-echo.com/raw`).
    pub url: String,
    /// Extra HTTP headers for the handshake.
    pub extra_headers: HashMap<String, String>,
    /// Capacity of the outbound queue; frames beyond it are dropped.
    pub outbound_capacity: usize,
    /// Capacity of the inbound broadcast.
    pub inbound_capacity: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ECHO_URL.to_string(),
            extra_headers: HashMap::new(),
            outbound_capacity: 256,
            inbound_capacity: super::DEFAULT_INBOUND_CAPACITY,
        }
    }
}

struct Session {
    alive: Arc<AtomicBool>,
    outbound_tx: mpsc::Sender<String>,
    shutdown_tx: watch::Sender<bool>,
}

impl Session {
    fn close(self) {
        self.alive.store(false, Ordering::SeqCst);
        // the task sends a close frame and exits on its own
        let _ = self.shutdown_tx.send(true);
    }
}

/// WebSocket client transport.
pub struct WsTransport {
    config: WsConfig,
    channels: TransportChannels,
    session: Mutex<Option<Session>>,
}

impl WsTransport {
    /// Validate the URL and build an unconnected transport.
    pub fn new(config: WsConfig) -> Result<Self, PtError> {
        let url = url::Url::parse(&config.url)
            .map_err(|e| PtError::Transport(format!("invalid url {}: {e}", config.url)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(PtError::Transport(format!(
                "unsupported scheme '{}' (expected ws or wss)",
                url.scheme()
            )));
        }
        let channels = TransportChannels::new(config.inbound_capacity);
        Ok(Self {
            config,
            channels,
            session: Mutex::new(None),
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

impl Transport for WsTransport {
    fn name(&self) -> &str {
        "websocket"
    }

    fn connect(&self) {
        let mut guard = self.session.lock();
        if let Some(old) = guard.take() {
            debug!("[ws] tearing down previous connection");
            old.close();
        }
        self.channels.set_open(false);

        let alive = Arc::new(AtomicBool::new(true));
        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(connection_task(
            self.config.clone(),
            self.channels.clone(),
            alive.clone(),
            outbound_rx,
            shutdown_rx,
        ));

        *guard = Some(Session {
            alive,
            outbound_tx,
            shutdown_tx,
        });
    }

    fn disconnect(&self) {
        if let Some(session) = self.session.lock().take() {
            info!("[ws] disconnecting from {}", self.config.url);
            session.close();
        }
        self.channels.set_open(false);
    }

    fn send(&self, message: String) {
        let guard = self.session.lock();
        let Some(session) = guard.as_ref() else {
            debug!("[ws] not connected, dropping outbound frame");
            return;
        };
        if !self.channels.is_open() {
            debug!("[ws] handshake pending, dropping outbound frame");
            return;
        }
        if let Err(e) = session.outbound_tx.try_send(message) {
            warn!("[ws] outbound queue rejected frame: {e}");
        }
    }

    fn connection_status(&self) -> watch::Receiver<bool> {
        self.channels.status()
    }

    fn messages(&self) -> broadcast::Receiver<WireMessage> {
        self.channels.subscribe()
    }

    fn failures(&self) -> broadcast::Receiver<TransportFailure> {
        self.channels.subscribe_failures()
    }
}

/// One connection's lifetime: connect, pump frames both ways, report closure.
async fn connection_task(
    config: WsConfig,
    channels: TransportChannels,
    alive: Arc<AtomicBool>,
    mut outbound_rx: mpsc::Receiver<String>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!("[ws] connecting to {}", config.url);

    let ws_stream = tokio::select! {
        res = connect_ws(&config) => match res {
            Ok(s) => s,
            Err(e) => {
                error!("[ws] connection failed: {e}");
                if alive.load(Ordering::SeqCst) {
                    channels.report_failure(e.to_string());
                }
                return;
            }
        },
        _ = shutdown_rx.changed() => {
            debug!("[ws] shutdown before handshake completed");
            return;
        }
    };

    if !alive.load(Ordering::SeqCst) {
        return;
    }
    channels.set_open(true);
    info!("[ws] connected");

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!("[ws] shutdown signal received");
                let _ = ws_write.close().await;
                return;
            }

            msg = ws_read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if alive.load(Ordering::SeqCst) {
                            channels.publish(WireMessage::Text(text.as_str().to_owned()));
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        if alive.load(Ordering::SeqCst) {
                            channels.publish(WireMessage::Binary(data.to_vec()));
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        warn!("[ws] received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        error!("[ws] read error: {e}");
                        break;
                    }
                    None => {
                        warn!("[ws] stream ended");
                        break;
                    }
                    _ => {} // Pong, Frame
                }
            }

            Some(frame) = outbound_rx.recv() => {
                if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                    error!("[ws] send error: {e}");
                    break;
                }
            }
        }
    }

    if alive.load(Ordering::SeqCst) {
        channels.set_open(false);
    }
}

/// Open the WebSocket, attaching any extra handshake headers.
async fn connect_ws(
    config: &WsConfig,
) -> anyhow::Result<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
> {
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};

    let mut request = config.url.as_str().into_client_request()?;
    for (key, value) in &config.extra_headers {
        request
            .headers_mut()
            .insert(HeaderName::from_bytes(key.as_bytes())?, HeaderValue::from_str(value)?);
    }

    let (stream, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(stream)
}
