//! Operational status snapshot

use crate::ingest::{IngestHealth, MarketData};
use crate::risk::RiskEngine;
use rust_decimal::Decimal;

/// Point-in-time view of the agent for operators
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub open_positions: usize,
    pub total_pnl: Decimal,
    pub win_rate: f64,
    pub equity: Decimal,
    pub current_drawdown: Decimal,
    pub stop_triggered: bool,
    pub stop_reason: Option<String>,
    pub ingest: IngestHealth,
}

impl StatusReport {
    /// Gather a fresh snapshot
    pub async fn collect(risk: &RiskEngine, market_data: &MarketData) -> Self {
        let metrics = risk.refresh_metrics().await;
        let stop_info = risk.stop().info();

        Self {
            open_positions: metrics.open_positions,
            total_pnl: metrics.total_pnl,
            win_rate: metrics.win_rate,
            equity: risk.current_equity().await,
            current_drawdown: metrics.current_drawdown,
            stop_triggered: risk.stop().is_triggered(),
            stop_reason: stop_info.map(|i| i.reason),
            ingest: market_data.health().await,
        }
    }

    /// Emit the snapshot as a structured log line
    pub fn log(&self) {
        tracing::info!(
            open_positions = self.open_positions,
            total_pnl = %self.total_pnl,
            win_rate = self.win_rate,
            equity = %self.equity,
            drawdown = %self.current_drawdown,
            stop_triggered = self.stop_triggered,
            price_stream = self.ingest.price_stream_connected,
            "Status"
        );
    }
}
