//! Advisory response types and validation

use crate::ingest::FetchError;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Recommended action for a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl Recommendation {
    /// Parse a recommendation string, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Some(Recommendation::Buy),
            "SELL" => Some(Recommendation::Sell),
            "HOLD" => Some(Recommendation::Hold),
            _ => None,
        }
    }
}

/// Validated advisory response
#[derive(Debug, Clone)]
pub struct AdvisoryResponse {
    pub recommendation: Recommendation,
    /// Confidence in [0, 1]
    pub confidence: Decimal,
    /// Stop-loss placement as a price distance from entry
    pub stop_distance: Decimal,
    /// Take-profit placement as a price distance from entry
    pub take_profit_distance: Decimal,
}

/// Raw wire shape of the analysis endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct RawAdvisory {
    pub recommendation: String,
    pub confidence: f64,
    #[serde(default)]
    pub stop_loss_distance: Option<f64>,
    #[serde(default)]
    pub take_profit_distance: Option<f64>,
}

impl AdvisoryResponse {
    /// Validate a raw response into a typed one
    ///
    /// Malformed fields fail here at the boundary rather than propagating
    /// into sizing or order placement. A `hold` needs no distances; an
    /// actionable recommendation needs both, strictly positive.
    pub(crate) fn validate(raw: RawAdvisory) -> Result<Self, AdvisoryError> {
        let recommendation = Recommendation::parse(&raw.recommendation).ok_or_else(|| {
            AdvisoryError::Invalid(format!("unknown recommendation {:?}", raw.recommendation))
        })?;

        if !(0.0..=1.0).contains(&raw.confidence) {
            return Err(AdvisoryError::Invalid(format!(
                "confidence {} outside [0, 1]",
                raw.confidence
            )));
        }
        let confidence = Decimal::try_from(raw.confidence)
            .map_err(|e| AdvisoryError::Invalid(format!("confidence: {e}")))?;

        let (stop_distance, take_profit_distance) = match recommendation {
            Recommendation::Hold => (Decimal::ZERO, Decimal::ZERO),
            _ => {
                let stop = raw
                    .stop_loss_distance
                    .filter(|d| *d > 0.0)
                    .ok_or_else(|| {
                        AdvisoryError::Invalid("missing or non-positive stop distance".to_string())
                    })?;
                let take = raw
                    .take_profit_distance
                    .filter(|d| *d > 0.0)
                    .ok_or_else(|| {
                        AdvisoryError::Invalid(
                            "missing or non-positive take-profit distance".to_string(),
                        )
                    })?;
                (
                    Decimal::try_from(stop)
                        .map_err(|e| AdvisoryError::Invalid(format!("stop distance: {e}")))?,
                    Decimal::try_from(take)
                        .map_err(|e| AdvisoryError::Invalid(format!("take profit: {e}")))?,
                )
            }
        };

        Ok(Self {
            recommendation,
            confidence,
            stop_distance,
            take_profit_distance,
        })
    }
}

/// Advisory call errors
#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("invalid advisory response: {0}")]
    Invalid(String),
}
