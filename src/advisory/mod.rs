//! Advisory service capability
//!
//! Consumes an external analysis endpoint returning a recommendation and a
//! confidence score. Responses are untrusted input: they are validated at
//! this boundary, and any failure is "no opportunity", never an order.

mod http;
mod types;

pub use http::HttpAdvisory;
pub use types::{AdvisoryError, AdvisoryResponse, Recommendation};

use async_trait::async_trait;

/// Contract the control loop requires from a signal provider
#[async_trait]
pub trait AdvisoryService: Send + Sync {
    /// Analyze a symbol and recommend an action
    async fn analyze(&self, symbol: &str) -> Result<AdvisoryResponse, AdvisoryError>;
}
