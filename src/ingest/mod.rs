//! Market data ingestion layer
//!
//! Maintains reconnecting push subscriptions for prices and transactions,
//! serves pull-based fetches through the resilience primitives with a
//! short-TTL cache in front, and exposes a per-source health surface.

mod cache;
mod fetch;
mod stream;
mod types;

pub use cache::QuoteCache;
pub use fetch::ResilientFetcher;
pub use stream::{PriceStream, TransactionStream};
pub use types::{
    DataSource, FetchError, IngestHealth, PriceUpdate, SourceHealth, TransactionEvent,
};

use crate::config::IngestConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Market data service
///
/// Single owner of the latest-price map and the per-symbol history buffers;
/// stream tasks and the control loop share it behind `Arc`.
pub struct MarketData {
    config: IngestConfig,
    fetcher: ResilientFetcher,
    latest: RwLock<HashMap<String, PriceUpdate>>,
    history: RwLock<HashMap<String, VecDeque<f64>>>,
    price_connected: std::sync::RwLock<Arc<AtomicBool>>,
    transaction_connected: std::sync::RwLock<Arc<AtomicBool>>,
}

impl MarketData {
    /// Create a new market data service
    pub fn new(config: IngestConfig) -> Self {
        let fetcher = ResilientFetcher::new(&config);
        Self {
            config,
            fetcher,
            latest: RwLock::new(HashMap::new()),
            history: RwLock::new(HashMap::new()),
            price_connected: std::sync::RwLock::new(Arc::new(AtomicBool::new(false))),
            transaction_connected: std::sync::RwLock::new(Arc::new(AtomicBool::new(false))),
        }
    }

    /// Record a normalized price update into the latest map and history
    pub async fn record_update(&self, update: PriceUpdate) {
        let mid: f64 = update.mid().try_into().unwrap_or(0.0);

        {
            let mut history = self.history.write().await;
            let buf = history.entry(update.symbol.clone()).or_default();
            buf.push_back(mid);
            while buf.len() > self.config.history_capacity {
                buf.pop_front();
            }
        }

        let mut latest = self.latest.write().await;
        latest.insert(update.symbol.clone(), update);
    }

    /// Latest price update for a symbol, if any has been seen
    pub async fn latest_price(&self, symbol: &str) -> Option<PriceUpdate> {
        self.latest.read().await.get(symbol).cloned()
    }

    /// Latest mid price for a symbol
    pub async fn latest_mid(&self, symbol: &str) -> Option<rust_decimal::Decimal> {
        self.latest.read().await.get(symbol).map(|u| u.mid())
    }

    /// Latest mid price per symbol, for conversion-rate lookups
    pub async fn latest_mids(&self) -> HashMap<String, rust_decimal::Decimal> {
        self.latest
            .read()
            .await
            .iter()
            .map(|(symbol, update)| (symbol.clone(), update.mid()))
            .collect()
    }

    /// Mid-price history samples for a symbol, oldest first
    pub async fn price_history(&self, symbol: &str) -> Vec<f64> {
        self.history
            .read()
            .await
            .get(symbol)
            .map(|buf| buf.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Pull-path fetch: cache, then rate limiter, then circuit breaker
    pub async fn fetch(
        &self,
        source: DataSource,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, FetchError> {
        self.fetcher.fetch(source, url, params).await
    }

    /// Start the price and transaction stream tasks
    ///
    /// Price updates are recorded into this service before being forwarded,
    /// so consumers always observe the latest map at least as fresh as the
    /// update they receive.
    pub fn start_streams(
        self: Arc<Self>,
        instruments: &[String],
    ) -> (mpsc::Receiver<PriceUpdate>, mpsc::Receiver<TransactionEvent>) {
        let price_stream = PriceStream::new(&self.config.price_stream_url, instruments);
        let (mut raw_rx, price_flag) = price_stream.subscribe();
        *self.price_connected.write().expect("flag lock poisoned") = price_flag;

        let (price_tx, price_rx) = mpsc::channel(1024);
        let service = self.clone();
        tokio::spawn(async move {
            while let Some(update) = raw_rx.recv().await {
                service.record_update(update.clone()).await;
                if price_tx.send(update).await.is_err() {
                    tracing::debug!("Price subscriber dropped, stopping forwarder");
                    break;
                }
            }
        });

        let transaction_stream = TransactionStream::new(&self.config.transaction_stream_url);
        let (transaction_rx, transaction_flag) = transaction_stream.subscribe();
        *self
            .transaction_connected
            .write()
            .expect("flag lock poisoned") = transaction_flag;

        (price_rx, transaction_rx)
    }

    /// Per-source breaker states and stream connectivity
    pub async fn health(&self) -> IngestHealth {
        IngestHealth {
            sources: vec![
                SourceHealth {
                    source: DataSource::Venue,
                    breaker: self.fetcher.breaker_state(DataSource::Venue),
                },
                SourceHealth {
                    source: DataSource::Advisory,
                    breaker: self.fetcher.breaker_state(DataSource::Advisory),
                },
            ],
            price_stream_connected: self
                .price_connected
                .read()
                .expect("flag lock poisoned")
                .load(Ordering::SeqCst),
            transaction_stream_connected: self
                .transaction_connected
                .read()
                .expect("flag lock poisoned")
                .load(Ordering::SeqCst),
        }
    }
}
