//! Paper trading venue with simulated fills

use super::types::{margin_rate, AccountSummary, OrderRequest, OrderResult, VenueError};
use super::TradingVenue;
use crate::ingest::MarketData;
use crate::risk::{pnl, Position, Side};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

struct PaperTrade {
    symbol: String,
    side: Side,
    units: Decimal,
    entry_price: Decimal,
    stop_loss: Option<Decimal>,
    take_profit: Option<Decimal>,
}

struct Ledger {
    balance: Decimal,
    open: HashMap<String, PaperTrade>,
}

/// Simulated venue filling market orders at the latest streamed mid price
pub struct PaperVenue {
    account_currency: String,
    market_data: Arc<MarketData>,
    ledger: RwLock<Ledger>,
    next_id: AtomicU64,
}

impl PaperVenue {
    /// Create a paper venue with the given starting balance
    pub fn new(
        starting_balance: Decimal,
        account_currency: impl Into<String>,
        market_data: Arc<MarketData>,
    ) -> Self {
        Self {
            account_currency: account_currency.into(),
            market_data,
            ledger: RwLock::new(Ledger {
                balance: starting_balance,
                open: HashMap::new(),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    async fn mark_to_market(&self, ledger: &Ledger) -> (Decimal, Decimal) {
        let mids = self.market_data.latest_mids().await;
        let mut unrealized = dec!(0);
        let mut margin_used = dec!(0);

        for trade in ledger.open.values() {
            let current = mids.get(&trade.symbol).copied().unwrap_or(trade.entry_price);
            let quote_rate = crate::risk::quote_to_account_rate(
                &trade.symbol,
                &self.account_currency,
                &mids,
            );
            unrealized += pnl(trade.side, trade.entry_price, current, trade.units) * quote_rate;
            margin_used += trade.units * current * margin_rate(&trade.symbol);
        }

        (unrealized, margin_used)
    }
}

#[async_trait]
impl TradingVenue for PaperVenue {
    async fn account_summary(&self) -> Result<AccountSummary, VenueError> {
        let ledger = self.ledger.read().await;
        let (unrealized, margin_used) = self.mark_to_market(&ledger).await;
        let equity = ledger.balance + unrealized;

        Ok(AccountSummary {
            balance: ledger.balance,
            equity,
            margin_available: (equity - margin_used).max(dec!(0)),
        })
    }

    async fn positions(&self) -> Result<Vec<Position>, VenueError> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .open
            .iter()
            .map(|(venue_id, trade)| {
                Position::open(
                    trade.symbol.clone(),
                    trade.side,
                    trade.units,
                    trade.entry_price,
                    trade.stop_loss,
                    trade.take_profit,
                    Some(venue_id.clone()),
                )
            })
            .collect())
    }

    async fn place_market_order(&self, request: OrderRequest) -> Result<OrderResult, VenueError> {
        if request.units <= dec!(0) {
            return Err(VenueError::Rejected("non-positive order size".to_string()));
        }

        let Some(fill_price) = self.market_data.latest_mid(&request.symbol).await else {
            return Err(VenueError::Rejected(format!(
                "no price available for {}",
                request.symbol
            )));
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let mut ledger = self.ledger.write().await;
        ledger.open.insert(
            id.clone(),
            PaperTrade {
                symbol: request.symbol.clone(),
                side: request.side,
                units: request.units,
                entry_price: fill_price,
                stop_loss: request.stop_loss,
                take_profit: request.take_profit,
            },
        );

        tracing::info!(
            trade_id = %id,
            symbol = %request.symbol,
            side = ?request.side,
            units = %request.units,
            price = %fill_price,
            "Paper order filled"
        );

        Ok(OrderResult {
            filled: true,
            fill_price,
            id,
        })
    }

    async fn close_position(&self, venue_id: &str) -> Result<(), VenueError> {
        let mut ledger = self.ledger.write().await;
        let trade = ledger
            .open
            .remove(venue_id)
            .ok_or_else(|| VenueError::UnknownTrade(venue_id.to_string()))?;

        let mids = self.market_data.latest_mids().await;
        let exit = mids.get(&trade.symbol).copied().unwrap_or(trade.entry_price);
        let quote_rate =
            crate::risk::quote_to_account_rate(&trade.symbol, &self.account_currency, &mids);
        let realized = pnl(trade.side, trade.entry_price, exit, trade.units) * quote_rate;
        ledger.balance += realized;

        tracing::info!(
            trade_id = %venue_id,
            symbol = %trade.symbol,
            exit = %exit,
            realized = %realized,
            "Paper trade closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::ingest::PriceUpdate;
    use chrono::Utc;

    fn market_data() -> Arc<MarketData> {
        Arc::new(MarketData::new(IngestConfig {
            price_stream_url: String::new(),
            transaction_stream_url: String::new(),
            cache_ttl_secs: 30,
            max_requests: 100,
            rate_window_secs: 60,
            failure_threshold: 5,
            recovery_timeout_secs: 60,
            request_timeout_secs: 2,
            history_capacity: 100,
        }))
    }

    async fn seed_price(md: &MarketData, symbol: &str, bid: Decimal) {
        md.record_update(PriceUpdate {
            symbol: symbol.to_string(),
            bid,
            ask: bid,
            time: Utc::now(),
        })
        .await;
    }

    #[tokio::test]
    async fn test_order_fills_at_latest_mid() {
        let md = market_data();
        seed_price(&md, "EUR_USD", dec!(1.0850)).await;
        let venue = PaperVenue::new(dec!(100000), "USD", md);

        let result = venue
            .place_market_order(OrderRequest {
                symbol: "EUR_USD".to_string(),
                side: Side::Long,
                units: dec!(10000),
                stop_loss: Some(dec!(1.0820)),
                take_profit: None,
            })
            .await
            .unwrap();

        assert!(result.filled);
        assert_eq!(result.fill_price, dec!(1.0850));
        assert_eq!(venue.positions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_order_rejected_without_price() {
        let venue = PaperVenue::new(dec!(100000), "USD", market_data());

        let result = venue
            .place_market_order(OrderRequest {
                symbol: "EUR_USD".to_string(),
                side: Side::Long,
                units: dec!(10000),
                stop_loss: None,
                take_profit: None,
            })
            .await;

        assert!(matches!(result, Err(VenueError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_close_realizes_into_balance() {
        let md = market_data();
        seed_price(&md, "EUR_USD", dec!(1.0850)).await;
        let venue = PaperVenue::new(dec!(100000), "USD", md.clone());

        let order = venue
            .place_market_order(OrderRequest {
                symbol: "EUR_USD".to_string(),
                side: Side::Long,
                units: dec!(10000),
                stop_loss: None,
                take_profit: None,
            })
            .await
            .unwrap();

        seed_price(&md, "EUR_USD", dec!(1.0900)).await;
        venue.close_position(&order.id).await.unwrap();

        let summary = venue.account_summary().await.unwrap();
        assert_eq!(summary.balance, dec!(100050.0000));
        assert!(venue.positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_unknown_trade_errors() {
        let venue = PaperVenue::new(dec!(100000), "USD", market_data());
        let result = venue.close_position("999").await;
        assert!(matches!(result, Err(VenueError::UnknownTrade(_))));
    }

    #[tokio::test]
    async fn test_equity_reflects_unrealized() {
        let md = market_data();
        seed_price(&md, "EUR_USD", dec!(1.0850)).await;
        let venue = PaperVenue::new(dec!(100000), "USD", md.clone());

        venue
            .place_market_order(OrderRequest {
                symbol: "EUR_USD".to_string(),
                side: Side::Long,
                units: dec!(10000),
                stop_loss: None,
                take_profit: None,
            })
            .await
            .unwrap();

        seed_price(&md, "EUR_USD", dec!(1.0900)).await;
        let summary = venue.account_summary().await.unwrap();

        assert_eq!(summary.balance, dec!(100000));
        assert_eq!(summary.equity, dec!(100050.0000));
        assert!(summary.margin_available < summary.equity);
    }
}
