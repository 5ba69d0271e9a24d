//! Ingestion layer types

use crate::resilience::BreakerState;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outbound data sources, each with its own breaker and rate limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// The trading venue's REST surface
    Venue,
    /// The advisory analysis endpoint
    Advisory,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Venue => write!(f, "venue"),
            DataSource::Advisory => write!(f, "advisory"),
        }
    }
}

/// A normalized price update from the pricing stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdate {
    /// Instrument identifier (e.g. "EUR_USD")
    pub symbol: String,
    /// Best bid
    pub bid: Decimal,
    /// Best ask
    pub ask: Decimal,
    /// Venue timestamp
    pub time: DateTime<Utc>,
}

impl PriceUpdate {
    /// Mid price between bid and ask
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

/// A fill/close event from the transaction stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionEvent {
    /// An order filled, opening or extending a trade
    OrderFill { trade_id: String },
    /// A stop-loss order filled, closing a trade
    StopLossFilled { trade_id: String },
    /// A take-profit order filled, closing a trade
    TakeProfitFilled { trade_id: String },
    /// A trade closed for any other reason
    TradeClose { trade_id: String },
}

impl TransactionEvent {
    /// Venue trade id the event refers to
    pub fn trade_id(&self) -> &str {
        match self {
            TransactionEvent::OrderFill { trade_id }
            | TransactionEvent::StopLossFilled { trade_id }
            | TransactionEvent::TakeProfitFilled { trade_id }
            | TransactionEvent::TradeClose { trade_id } => trade_id,
        }
    }
}

/// Health of a single pull-path data source
#[derive(Debug, Clone)]
pub struct SourceHealth {
    pub source: DataSource,
    pub breaker: BreakerState,
}

/// Health snapshot of the whole ingestion layer
#[derive(Debug, Clone)]
pub struct IngestHealth {
    pub sources: Vec<SourceHealth>,
    pub price_stream_connected: bool,
    pub transaction_stream_connected: bool,
}

/// Pull-path fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source's circuit breaker rejected the call
    #[error("circuit breaker open for {0}")]
    BreakerOpen(DataSource),
    /// Transport-level failure (connect, timeout, TLS)
    #[error("request failed: {0}")]
    Http(String),
    /// Non-2xx response
    #[error("unexpected status {0}")]
    Status(u16),
    /// Body was not valid JSON
    #[error("failed to decode response: {0}")]
    Decode(String),
}
