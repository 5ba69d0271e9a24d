//! Derived risk metrics

use super::limits::DrawdownMonitor;
use super::position::PositionBook;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Trading days used to annualize per-sample statistics
const ANNUALIZATION_PERIODS: f64 = 252.0;
/// Annual risk-free rate assumed for the Sharpe ratio
const RISK_FREE_RATE: f64 = 0.02;

/// Point-in-time risk snapshot, recomputed every cycle
#[derive(Debug, Clone)]
pub struct RiskMetrics {
    pub total_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub total_exposure: Decimal,
    pub current_drawdown: Decimal,
    pub max_drawdown: Decimal,
    /// Historical 95% value-at-risk of per-cycle returns (a negative return)
    pub var_95: f64,
    /// Annualized volatility of per-cycle returns
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    pub open_positions: usize,
    pub timestamp: DateTime<Utc>,
}

impl RiskMetrics {
    /// Compute a fresh snapshot from the book, drawdown state, and equity curve
    pub fn compute(
        book: &PositionBook,
        drawdown: &DrawdownMonitor,
        equity: &EquityCurve,
    ) -> Self {
        let returns = equity.returns();

        let (volatility, var_95, sharpe_ratio) = if returns.len() >= 2 {
            let vol = std_dev(&returns) * ANNUALIZATION_PERIODS.sqrt();
            let var = percentile(&returns, 5.0);
            let rf_per_period = RISK_FREE_RATE / ANNUALIZATION_PERIODS;
            let excess: Vec<f64> = returns.iter().map(|r| r - rf_per_period).collect();
            let excess_std = std_dev(&excess);
            let sharpe = if excess_std > 0.0 {
                mean(&excess) / excess_std
            } else {
                0.0
            };
            (vol, var, sharpe)
        } else {
            (0.0, 0.0, 0.0)
        };

        Self {
            total_pnl: book.total_pnl(),
            unrealized_pnl: book.unrealized_pnl(),
            realized_pnl: book.realized_pnl(),
            total_exposure: book.total_exposure(),
            current_drawdown: drawdown.current_drawdown(),
            max_drawdown: drawdown.max_drawdown(),
            var_95,
            volatility,
            sharpe_ratio,
            win_rate: book.win_rate(),
            open_positions: book.open_count(),
            timestamp: Utc::now(),
        }
    }

    /// Empty snapshot for a freshly constructed engine
    pub fn empty() -> Self {
        Self {
            total_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            total_exposure: Decimal::ZERO,
            current_drawdown: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            var_95: 0.0,
            volatility: 0.0,
            sharpe_ratio: 0.0,
            win_rate: 0.0,
            open_positions: 0,
            timestamp: Utc::now(),
        }
    }
}

/// Bounded equity observations feeding return statistics
pub struct EquityCurve {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl EquityCurve {
    /// Create a curve retaining at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            capacity,
        }
    }

    /// Append an equity observation
    pub fn push(&mut self, equity: Decimal) {
        let value: f64 = equity.try_into().unwrap_or(0.0);
        self.samples.push_back(value);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Per-sample fractional returns
    pub fn returns(&self) -> Vec<f64> {
        let mut returns = Vec::new();
        for i in 1..self.samples.len() {
            let prev = self.samples[i - 1];
            if prev != 0.0 {
                returns.push((self.samples[i] - prev) / prev);
            }
        }
        returns
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples have been recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Linear-interpolated percentile of an unsorted sample
fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("no NaN in returns"));

    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let weight = rank - lo as f64;
        sorted[lo] * (1.0 - weight) + sorted[hi] * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::position::Position;
    use crate::risk::types::{CloseReason, Side};
    use rust_decimal_macros::dec;

    #[test]
    fn test_equity_curve_returns() {
        let mut curve = EquityCurve::new(10);
        curve.push(dec!(100000));
        curve.push(dec!(101000));
        curve.push(dec!(100000));

        let returns = curve.returns();
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.01).abs() < 1e-9);
        assert!(returns[1] < 0.0);
    }

    #[test]
    fn test_equity_curve_is_bounded() {
        let mut curve = EquityCurve::new(3);
        for i in 0..10 {
            curve.push(Decimal::new(100_000 + i, 0));
        }
        assert_eq!(curve.len(), 3);
    }

    #[test]
    fn test_percentile() {
        let values = vec![5.0, 1.0, 3.0, 2.0, 4.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[1.0]), 0.0);
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&values) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_with_sparse_history_have_zero_stats() {
        let book = PositionBook::new();
        let drawdown = DrawdownMonitor::new(dec!(100000));
        let mut curve = EquityCurve::new(10);
        curve.push(dec!(100000));

        let metrics = RiskMetrics::compute(&book, &drawdown, &curve);
        assert_eq!(metrics.volatility, 0.0);
        assert_eq!(metrics.var_95, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.open_positions, 0);
    }

    #[test]
    fn test_metrics_reflect_book_state() {
        let mut book = PositionBook::new();
        let id = book.insert(Position::open(
            "EUR_USD",
            Side::Long,
            dec!(10000),
            dec!(1.0850),
            None,
            None,
            None,
        ));
        book.update_price("EUR_USD", dec!(1.0900));
        book.close(id, dec!(1.0900), CloseReason::TakeProfit);

        let mut drawdown = DrawdownMonitor::new(dec!(100000));
        drawdown.update(dec!(100050));

        let mut curve = EquityCurve::new(10);
        for equity in [100000, 100010, 99990, 100050] {
            curve.push(Decimal::new(equity, 0));
        }

        let metrics = RiskMetrics::compute(&book, &drawdown, &curve);
        assert_eq!(metrics.realized_pnl, dec!(50.00));
        assert_eq!(metrics.win_rate, 1.0);
        assert!(metrics.volatility > 0.0);
        assert!(metrics.var_95 < 0.0);
    }
}
