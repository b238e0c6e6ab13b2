use std::collections::{BTreeMap, HashMap};

use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::errors::EngineError;

/// Pluggable price-generation strategy.
///
/// The matching core never depends on which variant is active; it only ever
/// consumes `PriceFeed::current_price`. Models draw their randomness in `f64`
/// but every price handed back to the engine is a `Decimal` quantized to
/// 2 decimal places.
pub trait TickModel {
    fn next_price(&mut self, current: Decimal) -> Decimal;
}

/// Converts a simulated price back into engine money. Falls back to the
/// previous price if the float is not representable (NaN/inf).
fn quantize(price: f64, fallback: Decimal) -> Decimal {
    Decimal::from_f64(price)
        .map(|d| d.round_dp(2).max(Decimal::ZERO))
        .unwrap_or(fallback)
}

/// Uniform random walk: each tick moves the price by a uniform draw in
/// `[-pct, +pct]` (default ±1%). The original stub model.
pub struct UniformWalk {
    pct: f64,
    rng: StdRng,
}

impl UniformWalk {
    pub fn new() -> Self {
        Self::with_pct(0.01)
    }

    pub fn with_pct(pct: f64) -> Self {
        Self {
            pct,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(pct: f64, seed: u64) -> Self {
        Self {
            pct,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformWalk {
    fn default() -> Self {
        Self::new()
    }
}

impl TickModel for UniformWalk {
    fn next_price(&mut self, current: Decimal) -> Decimal {
        let pct_change = self.rng.random_range(-self.pct..=self.pct);
        let next = current.to_f64().unwrap_or(0.0) * (1.0 + pct_change);
        quantize(next, current)
    }
}

/// Geometric Brownian motion: `price * exp(sigma * z - sigma^2 / 2)` with
/// `z ~ N(0, 1)`, floored at zero.
pub struct GeometricBrownianMotion {
    volatility: f64,
    rng: StdRng,
}

impl GeometricBrownianMotion {
    pub fn new(volatility: f64) -> Self {
        Self {
            volatility,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(volatility: f64, seed: u64) -> Self {
        Self {
            volatility,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl TickModel for GeometricBrownianMotion {
    fn next_price(&mut self, current: Decimal) -> Decimal {
        let z: f64 = self.rng.sample(StandardNormal);
        let sigma = self.volatility;
        let factor = (sigma * z - 0.5 * sigma * sigma).exp();
        let next = (current.to_f64().unwrap_or(0.0) * factor).max(0.0);
        quantize(next, current)
    }
}

/// A tradable asset's current price and full price history.
pub struct Stock {
    symbol: String,
    price: Decimal,
    history: Vec<Decimal>,
    tick_model: Box<dyn TickModel>,
}

impl Stock {
    /// Uniform ±1% walk by default.
    pub fn new(symbol: impl Into<String>, price: Decimal) -> Self {
        Self::with_model(symbol, price, Box::new(UniformWalk::new()))
    }

    pub fn with_model(
        symbol: impl Into<String>,
        price: Decimal,
        tick_model: Box<dyn TickModel>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            history: vec![price],
            tick_model,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Chronological list of every price this stock has had, including the
    /// starting price.
    pub fn history(&self) -> &[Decimal] {
        &self.history
    }

    /// Sets the current price and appends it to the history. Negative prices
    /// are rejected without touching state.
    pub fn update_price(&mut self, new_price: Decimal) -> Result<(), EngineError> {
        if new_price < Decimal::ZERO {
            return Err(EngineError::InvalidPrice(new_price));
        }
        self.price = new_price;
        self.history.push(new_price);
        Ok(())
    }

    /// Asks the configured tick model for the next price without applying it.
    pub fn simulate_price_tick(&mut self) -> Decimal {
        self.tick_model.next_price(self.price)
    }
}

/// The clock/price-feed collaborator: advances simulated time and produces
/// the next price for every listed stock. Time advances only on an explicit
/// [`advance`](PriceFeed::advance) call.
#[derive(Default)]
pub struct PriceFeed {
    // ordered map so ticks and displays walk symbols deterministically
    stocks: BTreeMap<String, Stock>,
}

impl PriceFeed {
    pub fn new() -> Self {
        Self {
            stocks: BTreeMap::new(),
        }
    }

    pub fn add_stock(&mut self, stock: Stock) {
        self.stocks.insert(stock.symbol().to_string(), stock);
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.stocks.keys().map(String::as_str)
    }

    pub fn current_price(&self, symbol: &str) -> Option<Decimal> {
        self.stocks.get(symbol).map(Stock::price)
    }

    /// Every symbol's latest quote, for portfolio valuation.
    pub fn quotes(&self) -> HashMap<String, Decimal> {
        self.stocks
            .iter()
            .map(|(s, stock)| (s.clone(), stock.price()))
            .collect()
    }

    pub fn history(&self, symbol: &str) -> Option<&[Decimal]> {
        self.stocks.get(symbol).map(Stock::history)
    }

    /// Advances the clock one tick: every stock draws its next price from its
    /// model and commits it. Returns the new price per symbol.
    pub fn advance(&mut self) -> Result<HashMap<String, Decimal>, EngineError> {
        let mut next_prices = HashMap::with_capacity(self.stocks.len());
        for (symbol, stock) in self.stocks.iter_mut() {
            let next = stock.simulate_price_tick();
            stock.update_price(next)?;
            next_prices.insert(symbol.clone(), next);
        }
        Ok(next_prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_update_price_appends_history() {
        let mut s = Stock::new("AAPL", dec!(150.00));
        s.update_price(dec!(151.25)).unwrap();
        s.update_price(dec!(149.80)).unwrap();

        assert_eq!(s.price(), dec!(149.80));
        assert_eq!(s.history(), &[dec!(150.00), dec!(151.25), dec!(149.80)]);
    }

    #[test]
    fn test_update_price_rejects_negative() {
        let mut s = Stock::new("AAPL", dec!(150.00));
        let err = s.update_price(dec!(-1)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPrice(_)));
        assert_eq!(s.price(), dec!(150.00));
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn test_uniform_walk_stays_within_band() {
        let mut model = UniformWalk::seeded(0.01, 42);
        let start = dec!(100.00);
        for _ in 0..200 {
            let next = model.next_price(start);
            assert!(next >= dec!(98.99) && next <= dec!(101.01), "next = {next}");
        }
    }

    #[test]
    fn test_uniform_walk_is_deterministic_under_seed() {
        let mut a = UniformWalk::seeded(0.01, 7);
        let mut b = UniformWalk::seeded(0.01, 7);
        for _ in 0..20 {
            assert_eq!(a.next_price(dec!(100)), b.next_price(dec!(100)));
        }
    }

    #[test]
    fn test_gbm_never_goes_negative() {
        let mut model = GeometricBrownianMotion::seeded(0.5, 1);
        let mut price = dec!(10.00);
        for _ in 0..500 {
            price = model.next_price(price);
            assert!(price >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_feed_advance_updates_every_stock() {
        let mut feed = PriceFeed::new();
        feed.add_stock(Stock::with_model(
            "AAPL",
            dec!(150.00),
            Box::new(UniformWalk::seeded(0.01, 1)),
        ));
        feed.add_stock(Stock::with_model(
            "MSFT",
            dec!(295.50),
            Box::new(GeometricBrownianMotion::seeded(0.02, 2)),
        ));

        let prices = feed.advance().unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(feed.current_price("AAPL"), prices.get("AAPL").copied());
        assert_eq!(feed.history("AAPL").unwrap().len(), 2);
        assert_eq!(feed.history("MSFT").unwrap().len(), 2);
        assert!(feed.current_price("GOOG").is_none());
    }
}
