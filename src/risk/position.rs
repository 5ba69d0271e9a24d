//! Position tracking

use super::types::{CloseReason, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// An open exposure on a single instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Position identifier
    pub id: Uuid,
    /// The venue's trade id, needed for close calls
    pub venue_id: Option<String>,
    /// Instrument identifier
    pub symbol: String,
    /// Direction
    pub side: Side,
    /// Size in base-currency units
    pub size: Decimal,
    /// Entry price
    pub entry_price: Decimal,
    /// Latest observed price
    pub current_price: Decimal,
    /// Entry timestamp
    pub entry_time: DateTime<Utc>,
    /// Stop-loss price level
    pub stop_loss: Option<Decimal>,
    /// Take-profit price level
    pub take_profit: Option<Decimal>,
    /// Unrealized P&L in quote-currency units
    pub unrealized_pnl: Decimal,
}

impl Position {
    /// Open a new position at the given fill price
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        symbol: impl Into<String>,
        side: Side,
        size: Decimal,
        entry_price: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
        venue_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            venue_id,
            symbol: symbol.into(),
            side,
            size,
            entry_price,
            current_price: entry_price,
            entry_time: Utc::now(),
            stop_loss,
            take_profit,
            unrealized_pnl: dec!(0),
        }
    }

    /// Recompute unrealized P&L from the current price
    fn mark(&mut self, price: Decimal) {
        self.current_price = price;
        self.unrealized_pnl = pnl(self.side, self.entry_price, price, self.size);
    }

    /// Price level whose crossing should close this position, with the reason
    pub fn exit_level_hit(&self) -> Option<(Decimal, CloseReason)> {
        if let Some(sl) = self.stop_loss {
            let hit = match self.side {
                Side::Long => self.current_price <= sl,
                Side::Short => self.current_price >= sl,
            };
            if hit {
                return Some((sl, CloseReason::StopLoss));
            }
        }
        if let Some(tp) = self.take_profit {
            let hit = match self.side {
                Side::Long => self.current_price >= tp,
                Side::Short => self.current_price <= tp,
            };
            if hit {
                return Some((tp, CloseReason::TakeProfit));
            }
        }
        None
    }
}

/// P&L in quote currency: `(current − entry) × size` for long, negated short
pub fn pnl(side: Side, entry: Decimal, current: Decimal, size: Decimal) -> Decimal {
    match side {
        Side::Long => (current - entry) * size,
        Side::Short => (entry - current) * size,
    }
}

/// A closed position retained for history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    /// The position as it was at close
    pub position: Position,
    /// Exit fill price
    pub exit_price: Decimal,
    /// Exit timestamp
    pub exit_time: DateTime<Utc>,
    /// Realized P&L in quote-currency units
    pub realized_pnl: Decimal,
    /// Why the position closed
    pub reason: CloseReason,
}

/// Authoritative set of open positions plus closed-trade history
///
/// Positions transition `OPEN → CLOSED` exactly once; closing an id that is
/// no longer open is a no-op so that racing close paths (exit rules vs.
/// emergency stop vs. venue fills) cannot double-book a trade.
pub struct PositionBook {
    open: HashMap<Uuid, Position>,
    history: Vec<ClosedTrade>,
}

impl PositionBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self {
            open: HashMap::new(),
            history: vec![],
        }
    }

    /// Add an open position
    pub fn insert(&mut self, position: Position) -> Uuid {
        let id = position.id;
        tracing::info!(
            %id,
            symbol = %position.symbol,
            side = ?position.side,
            size = %position.size,
            entry = %position.entry_price,
            "Position opened"
        );
        self.open.insert(id, position);
        id
    }

    /// Update every open position on `symbol` with a new price
    pub fn update_price(&mut self, symbol: &str, price: Decimal) {
        for position in self.open.values_mut() {
            if position.symbol == symbol {
                position.mark(price);
            }
        }
    }

    /// Close a position, recording it in history
    ///
    /// Idempotent: a second close of the same id returns `None` and leaves
    /// exactly one history record.
    pub fn close(
        &mut self,
        id: Uuid,
        exit_price: Decimal,
        reason: CloseReason,
    ) -> Option<ClosedTrade> {
        let mut position = self.open.remove(&id)?;
        position.mark(exit_price);

        let closed = ClosedTrade {
            realized_pnl: pnl(position.side, position.entry_price, exit_price, position.size),
            exit_price,
            exit_time: Utc::now(),
            reason,
            position,
        };

        tracing::info!(
            %id,
            symbol = %closed.position.symbol,
            exit = %exit_price,
            pnl = %closed.realized_pnl,
            reason = %reason,
            "Position closed"
        );
        self.history.push(closed.clone());
        Some(closed)
    }

    /// Look up an open position id by the venue's trade id
    pub fn find_by_venue_id(&self, venue_id: &str) -> Option<Uuid> {
        self.open
            .values()
            .find(|p| p.venue_id.as_deref() == Some(venue_id))
            .map(|p| p.id)
    }

    /// Get an open position
    pub fn get(&self, id: Uuid) -> Option<&Position> {
        self.open.get(&id)
    }

    /// Mutable access to an open position
    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Position> {
        self.open.get_mut(&id)
    }

    /// All open positions
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.open.values()
    }

    /// Closed-trade history
    pub fn history(&self) -> &[ClosedTrade] {
        &self.history
    }

    /// Number of open positions
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Open positions on a given symbol
    pub fn count_for_symbol(&self, symbol: &str) -> usize {
        self.open.values().filter(|p| p.symbol == symbol).count()
    }

    /// Total absolute exposure in quote-currency units
    pub fn total_exposure(&self) -> Decimal {
        self.open
            .values()
            .map(|p| (p.size * p.current_price).abs())
            .sum()
    }

    /// Unrealized P&L across open positions
    pub fn unrealized_pnl(&self) -> Decimal {
        self.open.values().map(|p| p.unrealized_pnl).sum()
    }

    /// Realized P&L across closed trades
    pub fn realized_pnl(&self) -> Decimal {
        self.history.iter().map(|t| t.realized_pnl).sum()
    }

    /// Total P&L (realized + unrealized)
    pub fn total_pnl(&self) -> Decimal {
        self.realized_pnl() + self.unrealized_pnl()
    }

    /// Fraction of closed trades with positive P&L, in [0, 1]
    pub fn win_rate(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        let wins = self
            .history
            .iter()
            .filter(|t| t.realized_pnl > dec!(0))
            .count();
        wins as f64 / self.history.len() as f64
    }
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::new()
    }
}
