//! Randomized auto-run harness for exercising the engine under noisy flow.
//!
//! Each step advances the price feed one tick, then has every simulated
//! trader place a limit order near the current price:
//! - order sizes come from a unit-rate exponential draw scaled by `mean_qty`
//!   (heavy-tailed sizes around the mean),
//! - the limit price offsets the quote by Gaussian noise `N(0, noise_sigma)`,
//! - side is a fair coin flip.
//!
//! After the orders land, every symbol is matched and the fills logged. The
//! whole run is single-threaded and in-process; a fixed `seed` reproduces the
//! exact order flow (the price path depends on each stock's own tick model).

use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Exp1, Normal};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use crate::{
    errors::EngineError,
    exchange::Exchange,
    orders::{NewOrder, Side},
    stock::PriceFeed,
};

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of steps to run; `None` runs until interrupted.
    pub steps: Option<u64>,
    /// Trader ids to drive (they must already be registered).
    pub traders: Vec<u64>,
    /// Average order size for the exponential sizing draw.
    pub mean_qty: f64,
    /// Standard deviation of the Gaussian offset applied to the limit price.
    pub noise_sigma: f64,
    /// Seed for the order-flow rng; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            steps: Some(100),
            traders: Vec::new(),
            mean_qty: 10.0,
            noise_sigma: 1.0,
            seed: None,
        }
    }
}

pub fn run_simulation(
    exchange: &mut Exchange,
    feed: &mut PriceFeed,
    cfg: &SimConfig,
) -> anyhow::Result<()> {
    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let noise = Normal::new(0.0, cfg.noise_sigma)?;

    let starting_value: Vec<(u64, Decimal)> = cfg
        .traders
        .iter()
        .filter_map(|&id| {
            exchange
                .portfolio(id)
                .map(|p| (id, p.market_value(&feed.quotes())))
        })
        .collect();

    let mut step = 0u64;
    let mut total_trades = 0usize;
    loop {
        if let Some(max_steps) = cfg.steps {
            if step >= max_steps {
                break;
            }
        }
        step += 1;
        feed.advance()?;

        let symbols: Vec<String> = feed.symbols().map(str::to_string).collect();
        if symbols.is_empty() {
            anyhow::bail!("simulation needs at least one listed stock");
        }

        for &trader_id in &cfg.traders {
            let symbol = &symbols[rng.random_range(0..symbols.len())];
            let Some(quote) = feed.current_price(symbol) else {
                continue;
            };

            let raw: f64 = rng.sample(Exp1);
            let quantity = (raw * cfg.mean_qty).ceil() as u64;
            if quantity == 0 {
                continue;
            }
            let offset = noise.sample(&mut rng);
            let side = if rng.random_bool(0.5) {
                Side::Buy
            } else {
                Side::Sell
            };
            // buyers bid above the noisy quote, sellers offer below it, so
            // books actually cross and fills happen
            let limit = match side {
                Side::Buy => quote + decimal_from(offset.abs()),
                Side::Sell => (quote - decimal_from(offset.abs())).max(dec!(0.01)),
            };

            match exchange.add_order(NewOrder {
                trader_id,
                symbol: symbol.clone(),
                side,
                quantity,
                limit_price: limit,
            }) {
                Ok(order_id) => debug!(step, trader_id, order_id, "sim order placed"),
                // rejection is expected flow once a trader runs out of
                // cash or shares
                Err(e) => debug!(step, trader_id, %e, "sim order rejected"),
            }
        }

        for symbol in &symbols {
            total_trades += match_with_recovery(exchange, symbol, step)?;
        }
        if step % 10 == 0 {
            info!(step, total_trades, "simulation progress");
        }
    }

    info!(steps = step, total_trades, "simulation finished");
    for (trader_id, start) in starting_value {
        if let Some(portfolio) = exchange.portfolio(trader_id) {
            let now = portfolio.market_value(&feed.quotes());
            println!(
                "trader {trader_id}: cash {} market value {} pnl {}",
                portfolio.cash_balance(),
                now,
                now - start
            );
        }
    }
    Ok(())
}

/// Matches one symbol, recovering from settlement re-validation failures the
/// way a dispatcher would: cancel the stale order that can no longer be
/// covered and match again.
fn match_with_recovery(
    exchange: &mut Exchange,
    symbol: &str,
    step: u64,
) -> anyhow::Result<usize> {
    let mut executed = 0usize;
    loop {
        match exchange.match_orders(symbol) {
            Ok(trades) => {
                for trade in &trades {
                    debug!(
                        step,
                        symbol = %trade.symbol,
                        quantity = trade.quantity,
                        price = %trade.price,
                        "sim trade"
                    );
                }
                executed += trades.len();
                return Ok(executed);
            }
            Err(EngineError::SettlementInvariantViolated { order_id, trader_id, .. }) => {
                warn!(step, trader_id, order_id, "cancelling stale order after failed re-validation");
                exchange.cancel(order_id)?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn decimal_from(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .unwrap_or(Decimal::ZERO)
}
