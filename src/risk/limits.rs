//! Risk limits and drawdown tracking

use crate::config::RiskConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Immutable risk limit configuration
#[derive(Debug, Clone)]
pub struct RiskLimits {
    /// Maximum concurrent open positions
    pub max_concurrent_positions: usize,
    /// Risk fraction of equity per trade
    pub max_risk_per_trade: Decimal,
    /// Maximum aggregate risk fraction across open positions
    pub max_account_risk: Decimal,
    /// Maximum drawdown fraction before the emergency stop fires
    pub max_drawdown: Decimal,
    /// Maximum pairwise correlation between a candidate and open positions
    pub max_correlation: f64,
    /// Maximum open positions per instrument
    pub max_positions_per_symbol: usize,
}

impl From<&RiskConfig> for RiskLimits {
    fn from(config: &RiskConfig) -> Self {
        Self {
            max_concurrent_positions: config.max_concurrent_positions,
            max_risk_per_trade: config.max_risk_per_trade,
            max_account_risk: config.max_account_risk,
            max_drawdown: config.max_drawdown,
            max_correlation: config.max_correlation,
            max_positions_per_symbol: config.max_positions_per_symbol,
        }
    }
}

/// Tracks equity against its historical peak
pub struct DrawdownMonitor {
    peak_equity: Decimal,
    current_equity: Decimal,
    max_drawdown: Decimal,
}

impl DrawdownMonitor {
    /// Create a monitor seeded with the starting equity
    pub fn new(initial_equity: Decimal) -> Self {
        Self {
            peak_equity: initial_equity,
            current_equity: initial_equity,
            max_drawdown: dec!(0),
        }
    }

    /// Record a new equity observation
    pub fn update(&mut self, equity: Decimal) {
        self.current_equity = equity;
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        let drawdown = self.current_drawdown();
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
    }

    /// Current drawdown from peak: `max(0, (peak − equity) / peak)`
    pub fn current_drawdown(&self) -> Decimal {
        if self.peak_equity <= dec!(0) {
            return dec!(0);
        }
        ((self.peak_equity - self.current_equity) / self.peak_equity).max(dec!(0))
    }

    /// Historical maximum drawdown; never decreases
    pub fn max_drawdown(&self) -> Decimal {
        self.max_drawdown
    }

    /// Latest equity observation
    pub fn current_equity(&self) -> Decimal {
        self.current_equity
    }

    /// Historical equity peak
    pub fn peak_equity(&self) -> Decimal {
        self.peak_equity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawdown_from_peak() {
        let mut monitor = DrawdownMonitor::new(dec!(100000));

        monitor.update(dec!(110000));
        assert_eq!(monitor.peak_equity(), dec!(110000));
        assert_eq!(monitor.current_drawdown(), dec!(0));

        monitor.update(dec!(99000));
        assert_eq!(monitor.current_drawdown(), dec!(0.10));
    }

    #[test]
    fn test_max_drawdown_never_decreases() {
        let mut monitor = DrawdownMonitor::new(dec!(100000));

        monitor.update(dec!(85000));
        assert_eq!(monitor.max_drawdown(), dec!(0.15));

        // Recovery shrinks current drawdown but not the historical max
        monitor.update(dec!(98000));
        assert_eq!(monitor.current_drawdown(), dec!(0.02));
        assert_eq!(monitor.max_drawdown(), dec!(0.15));

        monitor.update(dec!(80000));
        assert_eq!(monitor.max_drawdown(), dec!(0.20));
    }

    #[test]
    fn test_new_peak_resets_current_drawdown() {
        let mut monitor = DrawdownMonitor::new(dec!(100000));
        monitor.update(dec!(90000));
        monitor.update(dec!(120000));

        assert_eq!(monitor.current_drawdown(), dec!(0));
        assert_eq!(monitor.peak_equity(), dec!(120000));
    }

    #[test]
    fn test_zero_peak_is_safe() {
        let monitor = DrawdownMonitor::new(dec!(0));
        assert_eq!(monitor.current_drawdown(), dec!(0));
    }

    #[test]
    fn test_limits_from_config() {
        let config = RiskConfig::default();
        let limits = RiskLimits::from(&config);
        assert_eq!(limits.max_concurrent_positions, 3);
        assert_eq!(limits.max_risk_per_trade, dec!(0.02));
        assert_eq!(limits.max_correlation, 0.7);
    }
}
