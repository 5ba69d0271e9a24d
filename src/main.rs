use clap::Parser;
use fx_pilot::cli::{Cli, Commands};
use fx_pilot::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    fx_pilot::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting autonomous trading");
            args.execute(config).await?;
        }
        Commands::Status => {
            println!("fx-pilot status");
            println!("  Mode: {:?}", config.venue.mode);
            println!("  Status: Not running");
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Instruments: {}", config.trader.instruments.join(", "));
            println!("  Cycle: every {}s", config.trader.cycle_interval_secs);
            println!("  Venue: {:?}", config.venue.mode);
            println!(
                "  Risk: {}/trade, {} account, {} max drawdown",
                config.risk.max_risk_per_trade,
                config.risk.max_account_risk,
                config.risk.max_drawdown
            );
        }
    }

    Ok(())
}
