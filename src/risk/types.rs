//! Risk management types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    StopLoss,
    TakeProfit,
    TimeLimit,
    Manual,
    EmergencyStop,
    Shutdown,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::StopLoss => write!(f, "Stop Loss"),
            CloseReason::TakeProfit => write!(f, "Take Profit"),
            CloseReason::TimeLimit => write!(f, "Time Limit"),
            CloseReason::Manual => write!(f, "Manual"),
            CloseReason::EmergencyStop => write!(f, "Emergency Stop"),
            CloseReason::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Outcome of the per-tick limit evaluation
///
/// Categories are checked in order: drawdown (fires the emergency stop),
/// aggregate account risk (denies new trades only). The per-candidate
/// correlation gate is a separate query.
#[derive(Debug, Clone, Copy)]
pub struct LimitCheck {
    /// The drawdown limit was breached and the emergency stop fired
    pub stop_triggered: bool,
    /// Whether new risk may be taken this cycle
    pub new_trades_allowed: bool,
}

/// Risk engine errors
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("maximum concurrent positions reached")]
    MaxPositionsReached,
    #[error("aggregate account risk limit reached")]
    AccountRiskExceeded,
    #[error("correlation between {a} and {b} is {value:.2}, above the limit")]
    CorrelationTooHigh { a: String, b: String, value: f64 },
    #[error("trading halted: {0}")]
    TradingHalted(String),
}
