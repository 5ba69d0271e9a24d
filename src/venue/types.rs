//! Venue interface types

use crate::risk::Side;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account state snapshot from the venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub balance: Decimal,
    pub equity: Decimal,
    pub margin_available: Decimal,
}

/// A market order to be placed
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    /// Size in base-currency units
    pub units: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

/// Result of a market order
#[derive(Debug, Clone)]
pub struct OrderResult {
    pub filled: bool,
    pub fill_price: Decimal,
    /// The venue's trade id
    pub id: String,
}

/// Venue call errors
#[derive(Debug, Error)]
pub enum VenueError {
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error("venue request failed: {0}")]
    Network(String),
    #[error("venue request timed out")]
    Timeout,
    #[error("unknown trade id: {0}")]
    UnknownTrade(String),
}

/// Margin rate for an instrument
///
/// Conservative estimates for the majors; anything unknown margins at 5%.
pub fn margin_rate(symbol: &str) -> Decimal {
    match symbol {
        "EUR_USD" | "USD_JPY" | "AUD_USD" | "USD_CAD" => dec!(0.02),
        "GBP_USD" | "USD_CHF" => dec!(0.05),
        _ => dec!(0.05),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_rates() {
        assert_eq!(margin_rate("EUR_USD"), dec!(0.02));
        assert_eq!(margin_rate("GBP_USD"), dec!(0.05));
        assert_eq!(margin_rate("NZD_SGD"), dec!(0.05));
    }

    #[test]
    fn test_venue_error_display() {
        let err = VenueError::Rejected("insufficient margin".to_string());
        assert_eq!(err.to_string(), "order rejected: insufficient margin");
        assert_eq!(
            VenueError::UnknownTrade("42".to_string()).to_string(),
            "unknown trade id: 42"
        );
    }
}
