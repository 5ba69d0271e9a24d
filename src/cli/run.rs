//! Run command implementation

use crate::advisory::HttpAdvisory;
use crate::config::{Config, VenueMode};
use crate::ingest::MarketData;
use crate::risk::{EmergencyStop, RiskEngine, RiskLimits};
use crate::trader::Trader;
use crate::venue::{PaperVenue, TradingVenue};
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct RunArgs {}

impl RunArgs {
    /// Wire the components together and run until Ctrl-C
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        if config.venue.mode == VenueMode::Live {
            anyhow::bail!(
                "live venue mode requires a venue integration; set [venue] mode = \"paper\""
            );
        }

        let market_data = Arc::new(MarketData::new(config.ingest.clone()));
        let venue: Arc<dyn TradingVenue> = Arc::new(PaperVenue::new(
            config.venue.paper_balance,
            config.venue.account_currency.clone(),
            market_data.clone(),
        ));
        let advisory = Arc::new(HttpAdvisory::new(
            config.advisory.clone(),
            market_data.clone(),
        ));
        let stop = Arc::new(EmergencyStop::new());
        let risk = Arc::new(RiskEngine::new(
            RiskLimits::from(&config.risk),
            stop,
            config.venue.paper_balance,
        ));

        let trader = Trader::new(
            config.trader.clone(),
            config.venue.account_currency.clone(),
            venue,
            advisory,
            market_data,
            risk,
        );
        trader.install_emergency_handler().await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl-C received, shutting down");
                let _ = shutdown_tx.send(true);
            }
        });

        trader.run(shutdown_rx).await;
        Ok(())
    }
}
