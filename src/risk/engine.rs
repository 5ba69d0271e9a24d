//! Risk engine facade
//!
//! Single owner of the position book, drawdown state, equity curve, and
//! correlation snapshot. The control loop and the stream tasks share it
//! behind `Arc`; all state lives under one lock so readers never observe a
//! position whose price moved but whose P&L has not.

use super::correlation::CorrelationMatrix;
use super::limits::{DrawdownMonitor, RiskLimits};
use super::metrics::{EquityCurve, RiskMetrics};
use super::position::{ClosedTrade, Position, PositionBook};
use super::sizing::PositionSizer;
use super::stop::EmergencyStop;
use super::types::{CloseReason, LimitCheck, RiskError, Side};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Equity samples retained for return statistics
const EQUITY_CURVE_CAPACITY: usize = 1440;

struct EngineState {
    book: PositionBook,
    drawdown: DrawdownMonitor,
    equity_curve: EquityCurve,
    correlation: CorrelationMatrix,
    metrics: RiskMetrics,
}

/// Real-time risk and position engine
pub struct RiskEngine {
    limits: RiskLimits,
    stop: Arc<EmergencyStop>,
    sizer: PositionSizer,
    state: RwLock<EngineState>,
}

impl RiskEngine {
    /// Create an engine seeded with the starting equity
    pub fn new(limits: RiskLimits, stop: Arc<EmergencyStop>, initial_equity: Decimal) -> Self {
        let sizer = PositionSizer::new(limits.max_risk_per_trade);
        let mut equity_curve = EquityCurve::new(EQUITY_CURVE_CAPACITY);
        equity_curve.push(initial_equity);

        Self {
            limits,
            stop,
            sizer,
            state: RwLock::new(EngineState {
                book: PositionBook::new(),
                drawdown: DrawdownMonitor::new(initial_equity),
                equity_curve,
                correlation: CorrelationMatrix::new(),
                metrics: RiskMetrics::empty(),
            }),
        }
    }

    /// The emergency stop shared with the rest of the process
    pub fn stop(&self) -> &Arc<EmergencyStop> {
        &self.stop
    }

    /// Configured limits
    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Track a newly opened position
    pub async fn open_position(&self, position: Position) -> Uuid {
        self.state.write().await.book.insert(position)
    }

    /// Apply a price update to every open position on the symbol
    pub async fn update_price(&self, symbol: &str, price: Decimal) {
        self.state.write().await.book.update_price(symbol, price);
    }

    /// Ratchet stop-losses on a symbol toward the current price
    ///
    /// Long stops only move up, short stops only move down; a position
    /// without a stop-loss is left alone.
    pub async fn trail_stops(&self, symbol: &str, distance: Decimal) {
        let mut state = self.state.write().await;
        let ids: Vec<Uuid> = state
            .book
            .open_positions()
            .filter(|p| p.symbol == symbol && p.stop_loss.is_some())
            .map(|p| p.id)
            .collect();

        for id in ids {
            if let Some(position) = state.book.get_mut(id) {
                let current = position.current_price;
                let stop = position.stop_loss.expect("filtered on stop_loss");
                let candidate = match position.side {
                    Side::Long => current - distance,
                    Side::Short => current + distance,
                };
                let improves = match position.side {
                    Side::Long => candidate > stop,
                    Side::Short => candidate < stop,
                };
                if improves {
                    position.stop_loss = Some(candidate);
                    tracing::info!(
                        %id,
                        symbol = %position.symbol,
                        new_stop = %candidate,
                        "Trailing stop ratcheted"
                    );
                }
            }
        }
    }

    /// Close a position; idempotent, `None` when the id is not open
    pub async fn close_position(
        &self,
        id: Uuid,
        exit_price: Decimal,
        reason: CloseReason,
    ) -> Option<ClosedTrade> {
        self.state.write().await.book.close(id, exit_price, reason)
    }

    /// Find an open position id by the venue's trade id
    pub async fn find_by_venue_id(&self, venue_id: &str) -> Option<Uuid> {
        self.state.read().await.book.find_by_venue_id(venue_id)
    }

    /// Close every open position at its current price
    pub async fn close_all(&self, reason: CloseReason) -> Vec<ClosedTrade> {
        let mut state = self.state.write().await;
        let targets: Vec<(Uuid, Decimal)> = state
            .book
            .open_positions()
            .map(|p| (p.id, p.current_price))
            .collect();

        let mut closed = vec![];
        for (id, price) in targets {
            if let Some(trade) = state.book.close(id, price, reason) {
                closed.push(trade);
            }
        }
        closed
    }

    /// Record a fresh equity observation
    pub async fn update_equity(&self, equity: Decimal) {
        let mut state = self.state.write().await;
        state.drawdown.update(equity);
        state.equity_curve.push(equity);
    }

    /// Recompute and store the metrics snapshot
    pub async fn refresh_metrics(&self) -> RiskMetrics {
        let mut state = self.state.write().await;
        let metrics = RiskMetrics::compute(&state.book, &state.drawdown, &state.equity_curve);
        state.metrics = metrics.clone();
        metrics
    }

    /// Latest metrics snapshot
    pub async fn metrics(&self) -> RiskMetrics {
        self.state.read().await.metrics.clone()
    }

    /// Replace the correlation snapshot from per-symbol price histories
    pub async fn refresh_correlation(&self, histories: &HashMap<String, Vec<f64>>) {
        let matrix = CorrelationMatrix::from_histories(histories);
        tracing::debug!(pairs = matrix.len(), "Correlation matrix refreshed");
        self.state.write().await.correlation = matrix;
    }

    /// Evaluate limits in order: drawdown (may fire the emergency stop),
    /// then aggregate account risk (denies new trades only)
    pub async fn evaluate_limits(&self) -> LimitCheck {
        let (current_drawdown, open_risk) = {
            let state = self.state.read().await;
            let open_risk =
                Decimal::from(state.book.open_count() as i64) * self.limits.max_risk_per_trade;
            (state.drawdown.current_drawdown(), open_risk)
        };

        // Strictly greater than the limit breaches; equality is allowed
        if current_drawdown > self.limits.max_drawdown && !self.stop.is_triggered() {
            self.stop
                .trigger(&format!("max drawdown exceeded: {current_drawdown:.4}"))
                .await;
        }

        let stop_triggered = self.stop.is_triggered();
        let within_account_risk =
            open_risk + self.limits.max_risk_per_trade <= self.limits.max_account_risk;

        if !within_account_risk {
            tracing::warn!(
                %open_risk,
                limit = %self.limits.max_account_risk,
                "Aggregate risk limit reached, denying new trades"
            );
        }

        LimitCheck {
            stop_triggered,
            new_trades_allowed: !stop_triggered && within_account_risk,
        }
    }

    /// Correlation gate for a candidate symbol against every open position
    pub async fn correlation_allows(&self, candidate: &str) -> Result<(), RiskError> {
        let state = self.state.read().await;
        for position in state.book.open_positions() {
            if position.symbol == candidate {
                continue;
            }
            if let Some(coefficient) = state.correlation.get(&position.symbol, candidate) {
                if coefficient.abs() > self.limits.max_correlation {
                    return Err(RiskError::CorrelationTooHigh {
                        a: position.symbol.clone(),
                        b: candidate.to_string(),
                        value: coefficient,
                    });
                }
            }
        }
        Ok(())
    }

    /// Open positions whose exit conditions are met, with the exit fill price
    ///
    /// Stop-loss and take-profit exits fill at their level; time-limit exits
    /// fill at the current price.
    pub async fn positions_due_for_exit(
        &self,
        max_holding: Duration,
    ) -> Vec<(Uuid, Decimal, CloseReason)> {
        let now = Utc::now();
        let state = self.state.read().await;
        state
            .book
            .open_positions()
            .filter_map(|position| {
                if let Some((level, reason)) = position.exit_level_hit() {
                    Some((position.id, level, reason))
                } else if now - position.entry_time > max_holding {
                    Some((position.id, position.current_price, CloseReason::TimeLimit))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Clones of all open positions
    pub async fn open_positions(&self) -> Vec<Position> {
        self.state.read().await.book.open_positions().cloned().collect()
    }

    /// Number of open positions
    pub async fn open_count(&self) -> usize {
        self.state.read().await.book.open_count()
    }

    /// Open positions on a symbol
    pub async fn count_for_symbol(&self, symbol: &str) -> usize {
        self.state.read().await.book.count_for_symbol(symbol)
    }

    /// Latest equity observation
    pub async fn current_equity(&self) -> Decimal {
        self.state.read().await.drawdown.current_equity()
    }

    /// Size an order from equity, stop distance, and the quote conversion rate
    pub fn size_units(
        &self,
        equity: Decimal,
        stop_distance: Decimal,
        quote_rate: Decimal,
    ) -> Decimal {
        self.sizer.units(equity, stop_distance, quote_rate)
    }
}
