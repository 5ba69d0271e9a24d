//! HTTP-backed advisory client

use super::types::{AdvisoryError, AdvisoryResponse, RawAdvisory};
use super::AdvisoryService;
use crate::config::AdvisoryConfig;
use crate::ingest::{DataSource, MarketData};
use async_trait::async_trait;
use std::sync::Arc;

/// Advisory client calling an analysis endpoint through the resilient
/// fetch path (cache, rate limiter, circuit breaker)
pub struct HttpAdvisory {
    config: AdvisoryConfig,
    market_data: Arc<MarketData>,
}

impl HttpAdvisory {
    /// Create a client for the configured endpoint
    pub fn new(config: AdvisoryConfig, market_data: Arc<MarketData>) -> Self {
        Self {
            config,
            market_data,
        }
    }
}

#[async_trait]
impl AdvisoryService for HttpAdvisory {
    async fn analyze(&self, symbol: &str) -> Result<AdvisoryResponse, AdvisoryError> {
        let params = [
            ("pair", symbol.to_string()),
            ("timeframe", self.config.timeframe.clone()),
        ];

        let value = self
            .market_data
            .fetch(DataSource::Advisory, &self.config.base_url, &params)
            .await?;

        let raw: RawAdvisory = serde_json::from_value(value)
            .map_err(|e| AdvisoryError::Invalid(format!("malformed body: {e}")))?;

        AdvisoryResponse::validate(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error_not_a_panic() {
        let market_data = Arc::new(MarketData::new(IngestConfig {
            price_stream_url: String::new(),
            transaction_stream_url: String::new(),
            cache_ttl_secs: 30,
            max_requests: 100,
            rate_window_secs: 60,
            failure_threshold: 5,
            recovery_timeout_secs: 60,
            request_timeout_secs: 1,
            history_capacity: 100,
        }));
        let advisory = HttpAdvisory::new(
            AdvisoryConfig {
                base_url: "http://127.0.0.1:1/analyze".to_string(),
                timeframe: "1h".to_string(),
            },
            market_data,
        );

        let result = advisory.analyze("EUR_USD").await;
        assert!(matches!(result, Err(AdvisoryError::Fetch(_))));
    }
}
