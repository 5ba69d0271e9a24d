//! The autonomous trading loop

use super::status::StatusReport;
use crate::advisory::{AdvisoryService, Recommendation};
use crate::config::TraderConfig;
use crate::ingest::{MarketData, TransactionEvent};
use crate::risk::{
    quote_to_account_rate, CloseReason, Position, RiskEngine, Side,
};
use crate::telemetry::{record_cycle_duration, set_gauge, GaugeMetric};
use crate::venue::{margin_rate, OrderRequest, TradingVenue};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Hard ceiling on any single venue call
const VENUE_CALL_TIMEOUT: Duration = Duration::from_secs(10);
/// Consecutive venue close failures that escalate to the emergency stop
const MAX_CLOSE_FAILURES: u32 = 3;

/// Autonomous trading agent
///
/// Owns decision-making: one cycle at a time, each step observing the
/// effects of the previous ones. Background stream tasks only update shared
/// state and never trade.
pub struct Trader {
    config: TraderConfig,
    account_currency: String,
    venue: Arc<dyn TradingVenue>,
    advisory: Arc<dyn AdvisoryService>,
    market_data: Arc<MarketData>,
    risk: Arc<RiskEngine>,
    close_failures: AtomicU32,
}

impl Trader {
    /// Wire up a trader; no global state, everything injected
    pub fn new(
        config: TraderConfig,
        account_currency: impl Into<String>,
        venue: Arc<dyn TradingVenue>,
        advisory: Arc<dyn AdvisoryService>,
        market_data: Arc<MarketData>,
        risk: Arc<RiskEngine>,
    ) -> Self {
        Self {
            config,
            account_currency: account_currency.into(),
            venue,
            advisory,
            market_data,
            risk,
            close_failures: AtomicU32::new(0),
        }
    }

    /// Register the close-everything callback on the emergency stop
    ///
    /// Must be called before `run` so a stop triggered at any point finds
    /// the callback in place.
    pub async fn install_emergency_handler(&self) {
        let venue = self.venue.clone();
        let risk = self.risk.clone();

        self.risk
            .stop()
            .register(move |reason| {
                let venue = venue.clone();
                let risk = risk.clone();
                async move {
                    tracing::error!(reason, "Emergency stop: closing every open position");
                    for position in risk.open_positions().await {
                        if let Some(venue_id) = &position.venue_id {
                            if let Err(e) = venue.close_position(venue_id).await {
                                tracing::error!(
                                    error = %e,
                                    venue_id,
                                    symbol = %position.symbol,
                                    "Venue close failed during emergency stop"
                                );
                            }
                        }
                    }
                    let closed = risk.close_all(CloseReason::EmergencyStop).await;
                    tracing::info!(count = closed.len(), "Emergency close-all complete");
                }
            })
            .await;
    }

    /// Run the loop until the shutdown signal flips
    ///
    /// Shutdown is cooperative: the current iteration finishes, stream tasks
    /// stop, and an orderly close-all pass runs before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let (mut price_rx, mut transaction_rx) = self
            .market_data
            .clone()
            .start_streams(&self.config.instruments);

        let risk = self.risk.clone();
        let trailing_enabled = self.config.use_trailing_stops;
        let trailing_distance = self.config.trailing_stop_distance;
        let price_task = tokio::spawn(async move {
            while let Some(update) = price_rx.recv().await {
                risk.update_price(&update.symbol, update.mid()).await;
                if trailing_enabled {
                    risk.trail_stops(&update.symbol, trailing_distance).await;
                }
            }
        });

        let risk = self.risk.clone();
        let transaction_task = tokio::spawn(async move {
            while let Some(event) = transaction_rx.recv().await {
                Self::apply_transaction(&risk, event).await;
            }
        });

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.cycle_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First refresh is due immediately
        let mut correlation_due = tokio::time::Instant::now();

        tracing::info!(
            instruments = ?self.config.instruments,
            interval_secs = self.config.cycle_interval_secs,
            "Trading loop started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.cycle(&mut correlation_due).await;
                }
                changed = shutdown.changed() => {
                    // A dropped sender also means nobody can keep us alive
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Shutdown requested, stopping streams");
        price_task.abort();
        transaction_task.abort();

        self.close_all(CloseReason::Shutdown).await;
        tracing::info!("Trading loop stopped");
    }

    /// One complete trading cycle
    ///
    /// Step order is load-bearing: monitoring must see fresh equity and
    /// metrics, the gate must see the monitor's closes, and the scan must
    /// see the gate. Any step failing is logged and the cycle continues.
    pub async fn cycle(&self, correlation_due: &mut tokio::time::Instant) {
        let started = std::time::Instant::now();

        // 1. Account state
        self.refresh_account().await;

        // 2. Risk metrics
        self.risk.refresh_metrics().await;

        // 3. Correlation matrix, on its slower cadence
        if tokio::time::Instant::now() >= *correlation_due {
            self.refresh_correlation().await;
            *correlation_due = tokio::time::Instant::now()
                + Duration::from_secs(self.config.correlation_refresh_secs);
        }

        // 4. Monitor open positions against exit rules
        self.monitor_positions().await;

        // 5. Gate
        let check = self.risk.evaluate_limits().await;

        // 6. Opportunity scan
        if check.new_trades_allowed {
            self.scan_opportunities().await;
        } else if check.stop_triggered {
            tracing::warn!("Emergency stop active, skipping opportunity scan");
        }

        // 7. Status snapshot
        let status = StatusReport::collect(&self.risk, &self.market_data).await;
        status.log();
        self.export_gauges(&status);

        record_cycle_duration(started.elapsed());
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Cycle complete");
    }

    async fn refresh_account(&self) {
        match tokio::time::timeout(VENUE_CALL_TIMEOUT, self.venue.account_summary()).await {
            Ok(Ok(summary)) => {
                self.risk.update_equity(summary.equity).await;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Account refresh failed, keeping last equity");
            }
            Err(_) => {
                tracing::warn!("Account refresh timed out, keeping last equity");
            }
        }
    }

    async fn refresh_correlation(&self) {
        let mut histories = HashMap::new();
        for symbol in &self.config.instruments {
            histories.insert(symbol.clone(), self.market_data.price_history(symbol).await);
        }
        self.risk.refresh_correlation(&histories).await;
    }

    /// Close every open position whose exit condition is met
    async fn monitor_positions(&self) {
        let due = self
            .risk
            .positions_due_for_exit(chrono::Duration::hours(self.config.max_holding_hours))
            .await;
        if due.is_empty() {
            return;
        }

        let venue_ids: HashMap<_, _> = self
            .risk
            .open_positions()
            .await
            .into_iter()
            .filter_map(|p| p.venue_id.clone().map(|v| (p.id, v)))
            .collect();

        for (id, exit_price, reason) in due {
            if let Some(venue_id) = venue_ids.get(&id) {
                let result =
                    tokio::time::timeout(VENUE_CALL_TIMEOUT, self.venue.close_position(venue_id))
                        .await;
                match result {
                    Ok(Ok(())) => {
                        self.close_failures.store(0, Ordering::SeqCst);
                    }
                    Ok(Err(e)) => {
                        // Leave the book untouched so the close retries next cycle
                        tracing::error!(error = %e, venue_id, "Venue close failed");
                        self.record_close_failure().await;
                        continue;
                    }
                    Err(_) => {
                        tracing::error!(venue_id, "Venue close timed out");
                        self.record_close_failure().await;
                        continue;
                    }
                }
            }

            self.risk.close_position(id, exit_price, reason).await;
        }
    }

    async fn record_close_failure(&self) {
        let failures = self.close_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= MAX_CLOSE_FAILURES {
            self.risk
                .stop()
                .trigger(&format!("{failures} consecutive venue close failures"))
                .await;
        }
    }

    /// Ask the advisory for opportunities and place gated orders
    async fn scan_opportunities(&self) {
        let limits = self.risk.limits().clone();

        for symbol in &self.config.instruments {
            if self.risk.open_count().await >= limits.max_concurrent_positions {
                break;
            }
            if self.risk.count_for_symbol(symbol).await >= limits.max_positions_per_symbol {
                continue;
            }

            let response = match self.advisory.analyze(symbol).await {
                Ok(response) => response,
                Err(e) => {
                    // Advisory failure means no opportunity this cycle
                    tracing::debug!(error = %e, symbol, "No advisory signal");
                    continue;
                }
            };

            if response.recommendation == Recommendation::Hold {
                continue;
            }
            if response.confidence < self.config.min_confidence {
                tracing::debug!(
                    symbol,
                    confidence = %response.confidence,
                    "Confidence below threshold"
                );
                continue;
            }
            if let Err(e) = self.risk.correlation_allows(symbol).await {
                tracing::info!(reason = %e, symbol, "Correlation gate denied candidate");
                continue;
            }

            let Some(price) = self.market_data.latest_mid(symbol).await else {
                tracing::debug!(symbol, "No price yet, skipping");
                continue;
            };

            let mids = self.market_data.latest_mids().await;
            let rate = quote_to_account_rate(symbol, &self.account_currency, &mids);
            let equity = self.risk.current_equity().await;
            let units = self.risk.size_units(equity, response.stop_distance, rate);
            if units <= dec!(0) {
                continue;
            }

            if !self.margin_allows(symbol, units * price).await {
                continue;
            }

            let side = match response.recommendation {
                Recommendation::Buy => Side::Long,
                Recommendation::Sell => Side::Short,
                Recommendation::Hold => unreachable!("filtered above"),
            };
            let (stop_loss, take_profit) = match side {
                Side::Long => (
                    price - response.stop_distance,
                    price + response.take_profit_distance,
                ),
                Side::Short => (
                    price + response.stop_distance,
                    price - response.take_profit_distance,
                ),
            };

            let request = OrderRequest {
                symbol: symbol.clone(),
                side,
                units,
                stop_loss: Some(stop_loss),
                take_profit: Some(take_profit),
            };

            match tokio::time::timeout(VENUE_CALL_TIMEOUT, self.venue.place_market_order(request))
                .await
            {
                Ok(Ok(result)) if result.filled => {
                    let position = Position::open(
                        symbol.clone(),
                        side,
                        units,
                        result.fill_price,
                        Some(stop_loss),
                        Some(take_profit),
                        Some(result.id),
                    );
                    tracing::info!(
                        symbol,
                        ?side,
                        units = %units,
                        fill = %result.fill_price,
                        confidence = %response.confidence,
                        "Trade executed"
                    );
                    self.risk.open_position(position).await;
                }
                Ok(Ok(result)) => {
                    tracing::warn!(symbol, id = %result.id, "Order not filled");
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, symbol, "Order placement failed");
                }
                Err(_) => {
                    tracing::warn!(symbol, "Order placement timed out");
                }
            }
        }
    }

    /// Preliminary margin check; venue rejection remains the authority
    async fn margin_allows(&self, symbol: &str, position_value: rust_decimal::Decimal) -> bool {
        match tokio::time::timeout(VENUE_CALL_TIMEOUT, self.venue.account_summary()).await {
            Ok(Ok(summary)) => {
                let required = position_value * margin_rate(symbol);
                if required > summary.margin_available {
                    tracing::warn!(
                        symbol,
                        %required,
                        available = %summary.margin_available,
                        "Insufficient margin, skipping candidate"
                    );
                    return false;
                }
                true
            }
            // Unknown margin state falls through to the venue's own check
            _ => true,
        }
    }

    /// Close every open position through the venue, then the book
    pub async fn close_all(&self, reason: CloseReason) {
        for position in self.risk.open_positions().await {
            if let Some(venue_id) = &position.venue_id {
                if let Err(e) = self.venue.close_position(venue_id).await {
                    tracing::error!(error = %e, venue_id, "Venue close failed during close-all");
                }
            }
        }
        let closed = self.risk.close_all(reason).await;
        if !closed.is_empty() {
            tracing::info!(count = closed.len(), %reason, "Closed all positions");
        }
    }

    async fn apply_transaction(risk: &RiskEngine, event: TransactionEvent) {
        let trade_id = event.trade_id().to_string();
        let Some(id) = risk.find_by_venue_id(&trade_id).await else {
            tracing::debug!(trade_id, "Transaction for unknown trade");
            return;
        };

        let position = risk
            .open_positions()
            .await
            .into_iter()
            .find(|p| p.id == id);
        let Some(position) = position else {
            return;
        };

        match event {
            TransactionEvent::OrderFill { .. } => {
                tracing::info!(trade_id, "Order fill confirmed by stream");
            }
            TransactionEvent::StopLossFilled { .. } => {
                let exit = position.stop_loss.unwrap_or(position.current_price);
                risk.close_position(id, exit, CloseReason::StopLoss).await;
            }
            TransactionEvent::TakeProfitFilled { .. } => {
                let exit = position.take_profit.unwrap_or(position.current_price);
                risk.close_position(id, exit, CloseReason::TakeProfit).await;
            }
            TransactionEvent::TradeClose { .. } => {
                risk.close_position(id, position.current_price, CloseReason::Manual)
                    .await;
            }
        }
    }

    fn export_gauges(&self, status: &StatusReport) {
        set_gauge(GaugeMetric::Equity, status.equity.try_into().unwrap_or(0.0));
        set_gauge(
            GaugeMetric::TotalPnl,
            status.total_pnl.try_into().unwrap_or(0.0),
        );
        set_gauge(GaugeMetric::OpenPositions, status.open_positions as f64);
        set_gauge(
            GaugeMetric::DrawdownPct,
            status.current_drawdown.try_into().unwrap_or(0.0),
        );
        set_gauge(GaugeMetric::WinRate, status.win_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::{AdvisoryError, AdvisoryResponse};
    use crate::config::{IngestConfig, RiskConfig};
    use crate::ingest::PriceUpdate;
    use crate::risk::{EmergencyStop, RiskLimits};
    use crate::venue::{AccountSummary, OrderResult, VenueError};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Mutex;

    struct FakeVenue {
        orders: Mutex<Vec<OrderRequest>>,
        closes: Mutex<Vec<String>>,
        fail_closes: AtomicBool,
        equity: Mutex<Decimal>,
    }

    impl FakeVenue {
        fn new(equity: Decimal) -> Self {
            Self {
                orders: Mutex::new(vec![]),
                closes: Mutex::new(vec![]),
                fail_closes: AtomicBool::new(false),
                equity: Mutex::new(equity),
            }
        }
    }

    #[async_trait]
    impl TradingVenue for FakeVenue {
        async fn account_summary(&self) -> Result<AccountSummary, VenueError> {
            let equity = *self.equity.lock().await;
            Ok(AccountSummary {
                balance: equity,
                equity,
                margin_available: equity,
            })
        }

        async fn positions(&self) -> Result<Vec<Position>, VenueError> {
            Ok(vec![])
        }

        async fn place_market_order(
            &self,
            request: OrderRequest,
        ) -> Result<OrderResult, VenueError> {
            let mut orders = self.orders.lock().await;
            let id = (orders.len() + 1).to_string();
            // Fill at the mid implied by the stop distance below the request
            let fill_price = request.stop_loss.unwrap_or(dec!(1)) + dec!(0.0030);
            orders.push(request);
            Ok(OrderResult {
                filled: true,
                fill_price,
                id,
            })
        }

        async fn close_position(&self, venue_id: &str) -> Result<(), VenueError> {
            if self.fail_closes.load(Ordering::SeqCst) {
                return Err(VenueError::Rejected("venue says no".to_string()));
            }
            self.closes.lock().await.push(venue_id.to_string());
            Ok(())
        }
    }

    struct ScriptedAdvisory {
        responses: HashMap<String, AdvisoryResponse>,
    }

    #[async_trait]
    impl AdvisoryService for ScriptedAdvisory {
        async fn analyze(&self, symbol: &str) -> Result<AdvisoryResponse, AdvisoryError> {
            self.responses
                .get(symbol)
                .cloned()
                .ok_or_else(|| AdvisoryError::Invalid("no script".to_string()))
        }
    }

    fn buy_signal(confidence: Decimal) -> AdvisoryResponse {
        AdvisoryResponse {
            recommendation: Recommendation::Buy,
            confidence,
            stop_distance: dec!(0.0030),
            take_profit_distance: dec!(0.0060),
        }
    }

    fn trader_config(instruments: Vec<String>) -> TraderConfig {
        TraderConfig {
            instruments,
            cycle_interval_secs: 60,
            min_confidence: dec!(0.7),
            correlation_refresh_secs: 900,
            max_holding_hours: 4,
            use_trailing_stops: false,
            trailing_stop_distance: dec!(0.0050),
        }
    }

    fn ingest_config() -> IngestConfig {
        IngestConfig {
            price_stream_url: String::new(),
            transaction_stream_url: String::new(),
            cache_ttl_secs: 30,
            max_requests: 100,
            rate_window_secs: 60,
            failure_threshold: 5,
            recovery_timeout_secs: 60,
            request_timeout_secs: 2,
            history_capacity: 100,
        }
    }

    async fn build(
        instruments: Vec<&str>,
        responses: HashMap<String, AdvisoryResponse>,
        venue: Arc<FakeVenue>,
    ) -> (Trader, Arc<RiskEngine>, Arc<MarketData>) {
        let market_data = Arc::new(MarketData::new(ingest_config()));
        let stop = Arc::new(EmergencyStop::new());
        let risk = Arc::new(RiskEngine::new(
            RiskLimits::from(&RiskConfig::default()),
            stop,
            dec!(100000),
        ));
        let trader = Trader::new(
            trader_config(instruments.iter().map(|s| s.to_string()).collect()),
            "USD",
            venue,
            Arc::new(ScriptedAdvisory { responses }),
            market_data.clone(),
            risk.clone(),
        );
        (trader, risk, market_data)
    }

    async fn seed_price(md: &MarketData, symbol: &str, mid: Decimal) {
        md.record_update(PriceUpdate {
            symbol: symbol.to_string(),
            bid: mid,
            ask: mid,
            time: Utc::now(),
        })
        .await;
    }

    #[tokio::test]
    async fn test_scan_opens_position_when_gates_pass() {
        let venue = Arc::new(FakeVenue::new(dec!(100000)));
        let mut responses = HashMap::new();
        responses.insert("EUR_USD".to_string(), buy_signal(dec!(0.9)));

        let (trader, risk, md) = build(vec!["EUR_USD"], responses, venue.clone()).await;
        seed_price(&md, "EUR_USD", dec!(1.0850)).await;

        trader.scan_opportunities().await;

        assert_eq!(risk.open_count().await, 1);
        assert_eq!(venue.orders.lock().await.len(), 1);
        let position = &risk.open_positions().await[0];
        assert_eq!(position.symbol, "EUR_USD");
        assert_eq!(position.side, Side::Long);
        assert!(position.venue_id.is_some());
    }

    #[tokio::test]
    async fn test_scan_skips_low_confidence_and_hold() {
        let venue = Arc::new(FakeVenue::new(dec!(100000)));
        let mut responses = HashMap::new();
        responses.insert("EUR_USD".to_string(), buy_signal(dec!(0.5)));
        responses.insert(
            "GBP_USD".to_string(),
            AdvisoryResponse {
                recommendation: Recommendation::Hold,
                confidence: dec!(0.99),
                stop_distance: dec!(0),
                take_profit_distance: dec!(0),
            },
        );

        let (trader, risk, md) =
            build(vec!["EUR_USD", "GBP_USD"], responses, venue.clone()).await;
        seed_price(&md, "EUR_USD", dec!(1.0850)).await;
        seed_price(&md, "GBP_USD", dec!(1.2700)).await;

        trader.scan_opportunities().await;
        assert_eq!(risk.open_count().await, 0);
    }

    #[tokio::test]
    async fn test_scan_respects_one_position_per_symbol() {
        let venue = Arc::new(FakeVenue::new(dec!(100000)));
        let mut responses = HashMap::new();
        responses.insert("EUR_USD".to_string(), buy_signal(dec!(0.9)));

        let (trader, risk, md) = build(vec!["EUR_USD"], responses, venue.clone()).await;
        seed_price(&md, "EUR_USD", dec!(1.0850)).await;

        trader.scan_opportunities().await;
        trader.scan_opportunities().await;

        assert_eq!(risk.open_count().await, 1);
    }

    #[tokio::test]
    async fn test_monitor_closes_at_stop_level() {
        let venue = Arc::new(FakeVenue::new(dec!(100000)));
        let (trader, risk, _md) = build(vec!["EUR_USD"], HashMap::new(), venue.clone()).await;

        risk.open_position(Position::open(
            "EUR_USD",
            Side::Long,
            dec!(10000),
            dec!(1.0850),
            Some(dec!(1.0820)),
            None,
            Some("7".to_string()),
        ))
        .await;

        risk.update_price("EUR_USD", dec!(1.0800)).await;
        trader.monitor_positions().await;

        assert_eq!(risk.open_count().await, 0);
        assert_eq!(venue.closes.lock().await.as_slice(), ["7".to_string()]);

        let metrics = risk.refresh_metrics().await;
        assert_eq!(metrics.realized_pnl, dec!(-30.00));
    }

    #[tokio::test]
    async fn test_repeated_close_failures_escalate_to_stop() {
        let venue = Arc::new(FakeVenue::new(dec!(100000)));
        venue.fail_closes.store(true, Ordering::SeqCst);
        let (trader, risk, _md) = build(vec!["EUR_USD"], HashMap::new(), venue.clone()).await;
        trader.install_emergency_handler().await;

        risk.open_position(Position::open(
            "EUR_USD",
            Side::Long,
            dec!(10000),
            dec!(1.0850),
            Some(dec!(1.0820)),
            None,
            Some("7".to_string()),
        ))
        .await;
        risk.update_price("EUR_USD", dec!(1.0800)).await;

        // The venue refuses the close; the position stays for retry
        trader.monitor_positions().await;
        assert_eq!(risk.open_count().await, 1);
        trader.monitor_positions().await;
        trader.monitor_positions().await;

        assert!(risk.stop().is_triggered());
        // The emergency handler swept the book even though the venue failed
        assert_eq!(risk.open_count().await, 0);
    }

    #[tokio::test]
    async fn test_emergency_handler_closes_everything_once() {
        let venue = Arc::new(FakeVenue::new(dec!(100000)));
        let (trader, risk, _md) = build(vec!["EUR_USD"], HashMap::new(), venue.clone()).await;
        trader.install_emergency_handler().await;

        risk.open_position(Position::open(
            "EUR_USD",
            Side::Long,
            dec!(10000),
            dec!(1.0850),
            None,
            None,
            Some("1".to_string()),
        ))
        .await;
        risk.open_position(Position::open(
            "GBP_USD",
            Side::Short,
            dec!(5000),
            dec!(1.2700),
            None,
            None,
            Some("2".to_string()),
        ))
        .await;

        risk.stop().trigger("test breach").await;
        risk.stop().trigger("second caller").await;

        assert_eq!(risk.open_count().await, 0);
        let closes = venue.closes.lock().await;
        assert_eq!(closes.len(), 2, "each venue trade closed exactly once");
    }

    #[tokio::test]
    async fn test_shutdown_close_all() {
        let venue = Arc::new(FakeVenue::new(dec!(100000)));
        let (trader, risk, _md) = build(vec!["EUR_USD"], HashMap::new(), venue.clone()).await;

        risk.open_position(Position::open(
            "EUR_USD",
            Side::Long,
            dec!(10000),
            dec!(1.0850),
            None,
            None,
            Some("1".to_string()),
        ))
        .await;

        trader.close_all(CloseReason::Shutdown).await;
        assert_eq!(risk.open_count().await, 0);
        assert_eq!(venue.closes.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_transaction_event_closes_position() {
        let venue = Arc::new(FakeVenue::new(dec!(100000)));
        let (_trader, risk, _md) = build(vec!["EUR_USD"], HashMap::new(), venue).await;

        risk.open_position(Position::open(
            "EUR_USD",
            Side::Long,
            dec!(10000),
            dec!(1.0850),
            Some(dec!(1.0820)),
            None,
            Some("55".to_string()),
        ))
        .await;

        Trader::apply_transaction(
            &risk,
            TransactionEvent::StopLossFilled {
                trade_id: "55".to_string(),
            },
        )
        .await;

        assert_eq!(risk.open_count().await, 0);
        let metrics = risk.refresh_metrics().await;
        assert_eq!(metrics.realized_pnl, dec!(-30.00));

        // A replay of the same event is a no-op
        Trader::apply_transaction(
            &risk,
            TransactionEvent::StopLossFilled {
                trade_id: "55".to_string(),
            },
        )
        .await;
        assert_eq!(risk.refresh_metrics().await.realized_pnl, dec!(-30.00));
    }
}
