//! Configuration types for fx-pilot

use rust_decimal::Decimal;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub trader: TraderConfig,
    pub risk: RiskConfig,
    pub ingest: IngestConfig,
    pub venue: VenueConfig,
    pub advisory: AdvisoryConfig,
    pub telemetry: TelemetryConfig,
}

/// Control loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TraderConfig {
    /// Instruments to monitor and trade (venue format, e.g. "EUR_USD")
    pub instruments: Vec<String>,

    /// Seconds between trading cycles
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,

    /// Minimum advisory confidence to act on a recommendation
    #[serde(default = "default_min_confidence")]
    pub min_confidence: Decimal,

    /// Seconds between correlation matrix refreshes
    #[serde(default = "default_correlation_refresh")]
    pub correlation_refresh_secs: u64,

    /// Maximum holding duration before a position is force-closed (hours)
    #[serde(default = "default_max_holding_hours")]
    pub max_holding_hours: i64,

    /// Ratchet stop-losses toward price as a position moves into profit
    #[serde(default)]
    pub use_trailing_stops: bool,

    /// Trailing stop distance as a price distance (e.g. 0.0050)
    #[serde(default = "default_trailing_distance")]
    pub trailing_stop_distance: Decimal,
}

fn default_cycle_interval() -> u64 {
    60
}
fn default_min_confidence() -> Decimal {
    Decimal::new(7, 1) // 0.7
}
fn default_correlation_refresh() -> u64 {
    900
}
fn default_max_holding_hours() -> i64 {
    4
}
fn default_trailing_distance() -> Decimal {
    Decimal::new(50, 4) // 0.0050
}

/// Risk limit configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Maximum concurrent open positions
    #[serde(default = "default_max_positions")]
    pub max_concurrent_positions: usize,

    /// Risk fraction of equity per trade
    #[serde(default = "default_risk_per_trade")]
    pub max_risk_per_trade: Decimal,

    /// Maximum aggregate risk fraction across all open positions
    #[serde(default = "default_account_risk")]
    pub max_account_risk: Decimal,

    /// Maximum drawdown fraction before the emergency stop fires
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: Decimal,

    /// Maximum pairwise correlation between a candidate and any open position
    #[serde(default = "default_max_correlation")]
    pub max_correlation: f64,

    /// Maximum open positions per instrument
    #[serde(default = "default_per_symbol_cap")]
    pub max_positions_per_symbol: usize,
}

fn default_max_positions() -> usize {
    3
}
fn default_risk_per_trade() -> Decimal {
    Decimal::new(2, 2) // 0.02
}
fn default_account_risk() -> Decimal {
    Decimal::new(6, 2) // 0.06
}
fn default_max_drawdown() -> Decimal {
    Decimal::new(15, 2) // 0.15
}
fn default_max_correlation() -> f64 {
    0.7
}
fn default_per_symbol_cap() -> usize {
    1
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_concurrent_positions: default_max_positions(),
            max_risk_per_trade: default_risk_per_trade(),
            max_account_risk: default_account_risk(),
            max_drawdown: default_max_drawdown(),
            max_correlation: default_max_correlation(),
            max_positions_per_symbol: default_per_symbol_cap(),
        }
    }
}

/// Market data ingestion configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// WebSocket URL for the venue pricing stream
    pub price_stream_url: String,

    /// WebSocket URL for the venue transaction stream
    pub transaction_stream_url: String,

    /// TTL for cached pull-path responses (seconds)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Maximum requests per source inside the rate limit window
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Rate limit window (seconds)
    #[serde(default = "default_rate_window")]
    pub rate_window_secs: u64,

    /// Consecutive failures before a source's breaker opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds an open breaker waits before permitting a trial call
    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout_secs: u64,

    /// Timeout for outbound HTTP requests (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Price samples retained per symbol for correlation
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_cache_ttl() -> u64 {
    30
}
fn default_max_requests() -> usize {
    100
}
fn default_rate_window() -> u64 {
    60
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_recovery_timeout() -> u64 {
    60
}
fn default_request_timeout() -> u64 {
    10
}
fn default_history_capacity() -> usize {
    500
}

/// Trading venue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    pub mode: VenueMode,

    /// Account denomination currency
    #[serde(default = "default_account_currency")]
    pub account_currency: String,

    /// Starting balance for the paper venue
    #[serde(default = "default_paper_balance")]
    pub paper_balance: Decimal,
}

fn default_account_currency() -> String {
    "USD".to_string()
}
fn default_paper_balance() -> Decimal {
    Decimal::new(100_000, 0)
}

/// Venue mode: paper simulation or live
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VenueMode {
    Paper,
    Live,
}

/// Advisory service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AdvisoryConfig {
    /// Base URL of the analysis endpoint
    pub base_url: String,

    /// Timeframe passed to the analysis endpoint
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

fn default_timeframe() -> String {
    "1h".to_string()
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub metrics_port: u16,
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
