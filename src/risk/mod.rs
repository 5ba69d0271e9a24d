//! Risk and position engine
//!
//! Positions, limits, live metrics, correlation gating, and the emergency
//! stop protocol

mod correlation;
mod engine;
mod limits;
mod metrics;
mod position;
mod sizing;
mod stop;
mod types;

pub use correlation::CorrelationMatrix;
pub use engine::RiskEngine;
pub use limits::{DrawdownMonitor, RiskLimits};
pub use metrics::{EquityCurve, RiskMetrics};
pub use position::{pnl, ClosedTrade, Position, PositionBook};
pub use sizing::{quote_currency, quote_to_account_rate, PositionSizer};
pub use stop::{EmergencyStop, StopInfo};
pub use types::{CloseReason, LimitCheck, RiskError, Side};
