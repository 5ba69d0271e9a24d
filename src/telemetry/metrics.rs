//! Prometheus metrics

use std::time::Duration;

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Current equity
    Equity,
    /// Total P&L (realized + unrealized)
    TotalPnl,
    /// Open position count
    OpenPositions,
    /// Total exposure
    TotalExposure,
    /// Current drawdown fraction
    DrawdownPct,
    /// Win rate over closed trades
    WinRate,
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::Equity => "fxpilot_equity",
            GaugeMetric::TotalPnl => "fxpilot_total_pnl",
            GaugeMetric::OpenPositions => "fxpilot_open_positions",
            GaugeMetric::TotalExposure => "fxpilot_total_exposure",
            GaugeMetric::DrawdownPct => "fxpilot_drawdown_pct",
            GaugeMetric::WinRate => "fxpilot_win_rate",
        }
    }
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}

/// Record how long a trading cycle took
pub fn record_cycle_duration(duration: Duration) {
    metrics::histogram!("fxpilot_cycle_duration_ms").record(duration.as_millis() as f64);
}
