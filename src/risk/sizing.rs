//! Position sizing from risk-per-trade and stop distance

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Quote currency of an underscore-delimited pair ("EUR_USD" → "USD")
pub fn quote_currency(symbol: &str) -> Option<&str> {
    symbol.rsplit('_').next().filter(|q| *q != symbol)
}

/// Rate converting one quote-currency unit into the account currency
///
/// P&L and stop distances are denominated in the pair's quote currency; to
/// size against account equity they must be converted at the actual rate, not
/// a fixed per-lot pip value. Resolution order: identity when the quote IS
/// the account currency, the direct conversion pair, the inverted pair, and
/// finally 1.0 with a warning when no rate is available.
pub fn quote_to_account_rate(
    symbol: &str,
    account_currency: &str,
    latest_mids: &HashMap<String, Decimal>,
) -> Decimal {
    let Some(quote) = quote_currency(symbol) else {
        tracing::warn!(symbol, "cannot parse quote currency, assuming rate 1");
        return dec!(1);
    };

    if quote == account_currency {
        return dec!(1);
    }

    let direct = format!("{quote}_{account_currency}");
    if let Some(rate) = latest_mids.get(&direct) {
        return *rate;
    }

    let inverted = format!("{account_currency}_{quote}");
    if let Some(rate) = latest_mids.get(&inverted) {
        if *rate > dec!(0) {
            return dec!(1) / rate;
        }
    }

    tracing::warn!(
        symbol,
        account_currency,
        "no conversion rate available, assuming rate 1"
    );
    dec!(1)
}

/// Sizes positions from a fixed risk fraction and the stop distance
#[derive(Debug, Clone)]
pub struct PositionSizer {
    /// Risk fraction of equity per trade
    pub risk_per_trade: Decimal,
    /// Smallest order size in base units
    pub min_units: Decimal,
    /// Largest order size in base units
    pub max_units: Decimal,
}

impl PositionSizer {
    /// Create a sizer with the venue's default unit bounds
    pub fn new(risk_per_trade: Decimal) -> Self {
        Self {
            risk_per_trade,
            min_units: dec!(1000),
            max_units: dec!(100000),
        }
    }

    /// Units such that a stop-out loses `risk_per_trade` of equity
    ///
    /// `units = (equity × risk) / (stop_distance × quote_rate)`, clamped to
    /// the venue's unit bounds and truncated to whole units. A non-positive
    /// stop distance sizes to zero; callers treat that as "no trade".
    pub fn units(
        &self,
        equity: Decimal,
        stop_distance: Decimal,
        quote_rate: Decimal,
    ) -> Decimal {
        if stop_distance <= dec!(0) || quote_rate <= dec!(0) || equity <= dec!(0) {
            return dec!(0);
        }

        let risk_amount = equity * self.risk_per_trade;
        let units = risk_amount / (stop_distance * quote_rate);
        units.clamp(self.min_units, self.max_units).trunc()
    }
}
