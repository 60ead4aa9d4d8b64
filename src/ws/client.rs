//! Reconnecting WebSocket transport

use super::types::{WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

/// Reusable WebSocket client with fixed-delay reconnection and idle detection
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Client for one endpoint; nothing connects until `connect_bidirectional`
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Client with default timings
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(WsConfig::new(url))
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect and return both a receiver and a sender
    ///
    /// A background task owns the socket. It reconnects after every failure
    /// until `cancel` fires, the receiver is dropped, or the attempt limit is
    /// hit, and emits `Connected`/`Reconnecting`/`Disconnected` events
    /// alongside the data frames. Text pushed into the sender is written to
    /// the socket while connected and queued otherwise.
    pub fn connect_bidirectional(
        &self,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<WsMessage>, mpsc::Sender<String>) {
        let (msg_tx, msg_rx) = mpsc::channel(1024);
        let (send_tx, send_rx) = mpsc::channel(self.config.send_buffer.max(1));
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::run_loop(config, msg_tx, send_rx, cancel).await {
                tracing::error!(error = %e, "WebSocket loop failed");
            }
        });

        (msg_rx, send_tx)
    }

    async fn run_loop(
        config: WsConfig,
        tx: mpsc::Sender<WsMessage>,
        mut send_rx: mpsc::Receiver<String>,
        cancel: CancellationToken,
    ) -> Result<(), WsError> {
        let mut attempts = 0;

        loop {
            match Self::connect_and_stream(&config, &tx, &mut send_rx, &cancel).await {
                Ok(()) => {
                    tracing::info!(url = %config.url, "WebSocket closed");
                    break;
                }
                Err(e) => {
                    attempts += 1;
                    tracing::warn!(
                        url = %config.url,
                        error = %e,
                        attempt = attempts,
                        "WebSocket connection error, reconnecting"
                    );

                    let limit = config.max_reconnect_attempts;
                    if limit > 0 && attempts >= limit {
                        tracing::error!(url = %config.url, "Max reconnection attempts reached");
                        let _ = tx.send(WsMessage::Disconnected).await;
                        return Err(WsError::MaxReconnectsExceeded);
                    }

                    if tx.is_closed() {
                        break;
                    }

                    let _ = tx.send(WsMessage::Reconnecting { attempt: attempts }).await;

                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = sleep(config.reconnect_delay) => {}
                    }
                }
            }
        }

        let _ = tx.send(WsMessage::Disconnected).await;
        Ok(())
    }

    /// One connection lifetime. `Ok` means a local shutdown; every remote
    /// ending is an error so the caller reconnects.
    async fn connect_and_stream(
        config: &WsConfig,
        tx: &mpsc::Sender<WsMessage>,
        send_rx: &mut mpsc::Receiver<String>,
        cancel: &CancellationToken,
    ) -> Result<(), WsError> {
        tracing::info!(url = %config.url, "Connecting to WebSocket");

        let (ws_stream, _response) = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = timeout(config.read_timeout, connect_async(&config.url)) => result
                .map_err(|_| WsError::ConnectionFailed("connect timed out".into()))?
                .map_err(|e| WsError::ConnectionFailed(e.to_string()))?,
        };

        let (mut write, mut read) = ws_stream.split();

        tracing::info!(url = %config.url, "WebSocket connected");

        if tx.send(WsMessage::Connected).await.is_err() {
            return Ok(());
        }

        let mut pinged_since_last_message = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }

                msg = timeout(config.read_timeout, read.next()) => {
                    let msg = match msg {
                        Ok(msg) => msg,
                        Err(_) if pinged_since_last_message => {
                            return Err(WsError::Stalled(config.read_timeout));
                        }
                        Err(_) => {
                            let ping = match &config.idle_ping {
                                Some(text) => Message::Text(text.clone()),
                                None => Message::Ping(Vec::new()),
                            };
                            write.send(ping).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                            pinged_since_last_message = true;
                            continue;
                        }
                    };
                    pinged_since_last_message = false;

                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Binary(data))) => {
                            if tx.send(WsMessage::Binary(data)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            return Err(WsError::ClosedByServer);
                        }
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            let reason = "Stream ended unexpectedly".to_string();
                            return Err(WsError::ConnectionFailed(reason));
                        }
                        _ => {}
                    }
                }

                outbound = send_rx.recv() => {
                    match outbound {
                        Some(text) => {
                            write.send(Message::Text(text)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        None => {
                            let _ = write.send(Message::Close(None)).await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
