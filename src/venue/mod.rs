//! Trading venue capability
//!
//! The venue-specific wire protocol lives behind this trait; the core only
//! depends on the contract. All calls are network I/O and assumed to fail.

mod paper;
mod types;

pub use paper::PaperVenue;
pub use types::{margin_rate, AccountSummary, OrderRequest, OrderResult, VenueError};

use crate::risk::Position;
use async_trait::async_trait;

/// Contract the control loop requires from a trading venue
#[async_trait]
pub trait TradingVenue: Send + Sync {
    /// Current account balance, equity, and available margin
    async fn account_summary(&self) -> Result<AccountSummary, VenueError>;

    /// Positions currently open at the venue
    async fn positions(&self) -> Result<Vec<Position>, VenueError>;

    /// Place a market order; returns the fill and the venue's trade id
    async fn place_market_order(&self, request: OrderRequest) -> Result<OrderResult, VenueError>;

    /// Close an open trade by the venue's trade id
    async fn close_position(&self, venue_id: &str) -> Result<(), VenueError>;
}
