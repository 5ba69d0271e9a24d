//! WebSocket client types and configuration

use std::time::Duration;
use thiserror::Error;

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Maximum reconnection attempts before giving up (0 = infinite)
    pub max_reconnect_attempts: u32,
    /// Initial delay before the first reconnection attempt
    pub initial_reconnect_delay: Duration,
    /// Maximum delay between reconnection attempts
    pub max_reconnect_delay: Duration,
    /// Interval for sending ping frames
    pub ping_interval: Duration,
    /// Payload sent immediately after every (re)connection, e.g. a
    /// subscription request for the monitored instrument set
    pub subscribe_message: Option<String>,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0,
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
            subscribe_message: None,
        }
    }
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set maximum reconnection attempts (0 = retry forever)
    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.max_reconnect_attempts = n;
        self
    }

    /// Set initial reconnection delay
    pub fn initial_delay(mut self, d: Duration) -> Self {
        self.initial_reconnect_delay = d;
        self
    }

    /// Set maximum reconnection delay
    pub fn max_delay(mut self, d: Duration) -> Self {
        self.max_reconnect_delay = d;
        self
    }

    /// Set ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }

    /// Set the payload sent after each connection is established
    pub fn subscribe_with(mut self, payload: impl Into<String>) -> Self {
        self.subscribe_message = Some(payload.into());
        self
    }
}

/// Messages delivered to stream consumers
#[derive(Debug, Clone)]
pub enum WsMessage {
    /// Text frame from the server
    Text(String),
    /// Connection established (also after a reconnect)
    Connected,
    /// Connection closed for good
    Disconnected,
    /// Reconnecting after a failure
    Reconnecting { attempt: u32 },
}

/// WebSocket client errors
#[derive(Debug, Clone, Error)]
pub enum WsError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectsExceeded,
    #[error("send failed: {0}")]
    SendFailed(String),
}
