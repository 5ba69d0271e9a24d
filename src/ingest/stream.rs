//! Push-based venue streams
//!
//! Normalizes the venue's pricing and transaction stream messages, riding the
//! reconnecting WebSocket client.

use super::types::{PriceUpdate, TransactionEvent};
use crate::ws::{WsClient, WsConfig, WsMessage};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One side of a streamed quote
#[derive(Debug, Deserialize)]
struct PriceLevel {
    price: String,
}

/// Raw pricing stream message
#[derive(Debug, Deserialize)]
struct RawPriceMessage {
    #[serde(rename = "type")]
    kind: String,
    instrument: Option<String>,
    time: Option<String>,
    bids: Option<Vec<PriceLevel>>,
    asks: Option<Vec<PriceLevel>>,
}

/// Raw transaction stream message
#[derive(Debug, Deserialize)]
struct RawTransactionMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "tradeID")]
    trade_id: Option<String>,
}

/// Pricing stream for a set of instruments
pub struct PriceStream {
    url: String,
}

impl PriceStream {
    /// Create a stream for the given instruments
    pub fn new(base_url: &str, instruments: &[String]) -> Self {
        let url = format!("{}?instruments={}", base_url, instruments.join(","));
        Self { url }
    }

    /// Parse a pricing stream message into a normalized update
    ///
    /// HEARTBEAT and malformed messages yield `None`.
    fn parse_message(text: &str) -> Option<PriceUpdate> {
        let raw: RawPriceMessage = serde_json::from_str(text).ok()?;
        if raw.kind != "PRICE" {
            return None;
        }

        let symbol = raw.instrument?;
        let bid = Decimal::from_str(&raw.bids?.first()?.price).ok()?;
        let ask = Decimal::from_str(&raw.asks?.first()?.price).ok()?;
        let time = raw
            .time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Some(PriceUpdate {
            symbol,
            bid,
            ask,
            time,
        })
    }

    /// Connect and return normalized updates plus the connected flag
    pub fn subscribe(&self) -> (mpsc::Receiver<PriceUpdate>, Arc<AtomicBool>) {
        let (tick_tx, tick_rx) = mpsc::channel(1024);

        tracing::info!(url = %self.url, "Subscribing to pricing stream");
        let client = WsClient::new(WsConfig::new(&self.url));
        let (ws_rx, connected) = client.connect();

        tokio::spawn(async move {
            Self::run_message_loop(ws_rx, tick_tx).await;
        });

        (tick_rx, connected)
    }

    async fn run_message_loop(
        mut ws_rx: mpsc::Receiver<WsMessage>,
        tick_tx: mpsc::Sender<PriceUpdate>,
    ) {
        while let Some(msg) = ws_rx.recv().await {
            match msg {
                WsMessage::Text(text) => {
                    if let Some(update) = Self::parse_message(&text) {
                        if tick_tx.send(update).await.is_err() {
                            tracing::debug!("Price receiver dropped, stopping stream loop");
                            break;
                        }
                    }
                }
                WsMessage::Connected => {
                    tracing::info!("Pricing stream connected");
                }
                WsMessage::Disconnected => {
                    tracing::warn!("Pricing stream disconnected");
                    break;
                }
                WsMessage::Reconnecting { attempt } => {
                    tracing::warn!(attempt, "Pricing stream reconnecting...");
                }
            }
        }
    }
}

/// Transaction/fill stream
pub struct TransactionStream {
    url: String,
}

impl TransactionStream {
    /// Create a transaction stream
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    /// Parse a transaction stream message into an event
    fn parse_message(text: &str) -> Option<TransactionEvent> {
        let raw: RawTransactionMessage = serde_json::from_str(text).ok()?;
        let trade_id = raw.trade_id?;

        match raw.kind.as_str() {
            "ORDER_FILL" => Some(TransactionEvent::OrderFill { trade_id }),
            "STOP_LOSS_FILLED" => Some(TransactionEvent::StopLossFilled { trade_id }),
            "TAKE_PROFIT_FILLED" => Some(TransactionEvent::TakeProfitFilled { trade_id }),
            "TRADE_CLOSE" => Some(TransactionEvent::TradeClose { trade_id }),
            _ => None,
        }
    }

    /// Connect and return parsed events plus the connected flag
    pub fn subscribe(&self) -> (mpsc::Receiver<TransactionEvent>, Arc<AtomicBool>) {
        let (event_tx, event_rx) = mpsc::channel(256);

        tracing::info!(url = %self.url, "Subscribing to transaction stream");
        let client = WsClient::new(WsConfig::new(&self.url));
        let (mut ws_rx, connected) = client.connect();

        tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                match msg {
                    WsMessage::Text(text) => {
                        if let Some(event) = Self::parse_message(&text) {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    WsMessage::Disconnected => {
                        tracing::warn!("Transaction stream disconnected");
                        break;
                    }
                    _ => {}
                }
            }
        });

        (event_rx, connected)
    }
}
