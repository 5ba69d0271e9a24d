//! WebSocket client with automatic reconnection

use super::types::{WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reconnecting WebSocket client
///
/// Reconnects with exponential backoff (doubling from the initial delay up to
/// the configured cap) and resets to the initial delay after any successful
/// connection. The shared connected flag backs the ingestion health surface.
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect and return a message receiver plus a live connected flag
    ///
    /// Spawns a background task that owns the connection, sends the
    /// configured subscribe payload after each (re)connect, and keeps the
    /// connection alive with ping frames.
    pub fn connect(&self) -> (mpsc::Receiver<WsMessage>, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::channel(1024);
        let connected = Arc::new(AtomicBool::new(false));
        let config = self.config.clone();
        let flag = connected.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::run_connection_loop(config, tx, flag).await {
                tracing::error!(error = %e, "WebSocket connection loop terminated");
            }
        });

        (rx, connected)
    }

    async fn run_connection_loop(
        config: WsConfig,
        tx: mpsc::Sender<WsMessage>,
        connected: Arc<AtomicBool>,
    ) -> Result<(), WsError> {
        let mut reconnect_attempts = 0u32;
        let mut reconnect_delay = config.initial_reconnect_delay;

        loop {
            match connect_async(&config.url).await {
                Ok((ws_stream, _response)) => {
                    tracing::info!(url = %config.url, "WebSocket connected");
                    // Successful connection resets the backoff schedule
                    reconnect_attempts = 0;
                    reconnect_delay = config.initial_reconnect_delay;
                    connected.store(true, Ordering::SeqCst);

                    if tx.send(WsMessage::Connected).await.is_err() {
                        return Ok(());
                    }

                    let result = Self::stream_messages(ws_stream, &config, &tx).await;
                    connected.store(false, Ordering::SeqCst);

                    match result {
                        Ok(()) => {
                            tracing::info!("WebSocket closed cleanly");
                            let _ = tx.send(WsMessage::Disconnected).await;
                            return Ok(());
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "WebSocket stream error");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, url = %config.url, "WebSocket connect failed");
                }
            }

            reconnect_attempts += 1;

            if config.max_reconnect_attempts > 0
                && reconnect_attempts >= config.max_reconnect_attempts
            {
                tracing::error!("Max reconnection attempts reached");
                let _ = tx.send(WsMessage::Disconnected).await;
                return Err(WsError::MaxReconnectsExceeded);
            }

            if tx.is_closed() {
                tracing::debug!("Receiver dropped, stopping reconnection");
                return Ok(());
            }

            let _ = tx
                .send(WsMessage::Reconnecting {
                    attempt: reconnect_attempts,
                })
                .await;

            sleep(reconnect_delay).await;
            reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay);
        }
    }

    /// Pump messages from an established connection until it closes
    async fn stream_messages(
        ws_stream: WsStream,
        config: &WsConfig,
        tx: &mpsc::Sender<WsMessage>,
    ) -> Result<(), WsError> {
        let (mut write, mut read) = ws_stream.split();

        if let Some(ref payload) = config.subscribe_message {
            write
                .send(Message::Text(payload.clone()))
                .await
                .map_err(|e| WsError::SendFailed(e.to_string()))?;
        }

        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut waiting_for_pong = false;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            waiting_for_pong = false;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Received close frame");
                            return Ok(());
                        }
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(WsError::ConnectionFailed("stream ended unexpectedly".into()));
                        }
                        _ => {}
                    }
                }

                _ = ping_interval.tick() => {
                    if waiting_for_pong {
                        return Err(WsError::ConnectionFailed("pong timeout".into()));
                    }
                    write.send(Message::Ping(vec![])).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    waiting_for_pong = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ws_client_creation() {
        let client = WsClient::new(WsConfig::new("wss://example.com/pricing"));
        assert_eq!(client.url(), "wss://example.com/pricing");
    }

    #[tokio::test]
    async fn test_connection_failure_reports_disconnect() {
        let client = WsClient::new(
            WsConfig::new("wss://invalid.localhost.test:1")
                .max_reconnects(2)
                .initial_delay(Duration::from_millis(10)),
        );

        let (mut rx, connected) = client.connect();

        let mut reconnect_seen = false;
        let mut disconnect_seen = false;
        let timeout = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(msg) = rx.recv().await {
                match msg {
                    WsMessage::Reconnecting { .. } => reconnect_seen = true,
                    WsMessage::Disconnected => {
                        disconnect_seen = true;
                        break;
                    }
                    _ => {}
                }
            }
        });

        timeout.await.expect("test timed out");
        assert!(reconnect_seen, "should have attempted reconnection");
        assert!(disconnect_seen, "should report Disconnected after giving up");
        assert!(!connected.load(Ordering::SeqCst));
    }
}
