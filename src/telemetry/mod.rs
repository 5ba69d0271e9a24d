//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{record_cycle_duration, set_gauge, GaugeMetric};

use crate::config::TelemetryConfig;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Guard that keeps telemetry alive for the process lifetime
pub struct TelemetryGuard {
    _priv: (),
}

/// Initialize logging and the metrics exporter
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    let format = config.log_format.parse::<LogFormat>().unwrap_or_else(|_| {
        eprintln!(
            "Unknown log format {:?}, falling back to pretty",
            config.log_format
        );
        LogFormat::Pretty
    });
    init_logging(&config.log_level, format)?;

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port))
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(port = config.metrics_port, "Metrics exporter listening");
    Ok(TelemetryGuard { _priv: () })
}
