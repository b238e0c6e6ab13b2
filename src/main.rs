use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use exchange_engine::{
    cli::Terminal,
    exchange::Exchange,
    orders::{NewOrder, Side},
    portfolio::Portfolio,
    simulate::{SimConfig, run_simulation},
    stock::{PriceFeed, Stock, UniformWalk},
};

/// A demo stock exchange: limit order books, price-time matching, and a
/// simulated price feed.
#[derive(Parser)]
#[command(name = "Exchange Terminal")]
#[command(version = "0.1", about = "A demo of a limit order exchange")]
struct Cli {
    /// Run automatically for N steps instead of the interactive terminal
    /// (omit N to run until interrupted)
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "0")]
    auto: Option<u64>,

    /// Starting cash balance for each trader
    #[arg(long, default_value = "1000000")]
    balance: Decimal,

    /// Seed for the simulated order flow (auto mode only)
    #[arg(long)]
    seed: Option<u64>,
}

const WELCOME: &str = "
EXCHANGE TERMINAL

Please log in with your trader id before issuing any other commands.
Type `help` for the command menu.
";

/// Initial listings; prices are only a session starting point, every tick
/// moves them.
fn market_data(seed: Option<u64>) -> PriceFeed {
    let listings = [
        ("AAPL", dec!(150.00)),
        ("MSFT", dec!(295.50)),
        ("GOOG", dec!(2830.75)),
        ("AMZN", dec!(3505.20)),
        ("TSLA", dec!(720.25)),
        ("NFLX", dec!(505.60)),
    ];
    let mut feed = PriceFeed::new();
    for (i, (symbol, price)) in listings.into_iter().enumerate() {
        let model = match seed {
            Some(seed) => UniformWalk::seeded(0.01, seed.wrapping_add(i as u64)),
            None => UniformWalk::new(),
        };
        feed.add_stock(Stock::with_model(symbol, price, Box::new(model)));
    }
    feed
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let cli = Cli::parse();

    let mut feed = market_data(cli.seed);
    let mut exchange = Exchange::new(feed.symbols().map(str::to_string));

    // two session traders: one flat, one holding inventory with a resting
    // offer so the book is never completely empty
    exchange.register_trader(Portfolio::new(1, cli.balance));
    exchange.register_trader(Portfolio::with_holdings(
        42,
        cli.balance,
        feed.symbols().map(|s| (s.to_string(), 1_000)),
    ));
    exchange.add_order(NewOrder {
        trader_id: 42,
        symbol: "AAPL".to_string(),
        side: Side::Sell,
        quantity: 999,
        limit_price: dec!(150.00),
    })?;

    match cli.auto {
        Some(steps) => {
            let cfg = SimConfig {
                steps: if steps == 0 { None } else { Some(steps) },
                traders: vec![1, 42],
                seed: cli.seed,
                ..SimConfig::default()
            };
            run_simulation(&mut exchange, &mut feed, &cfg)
        }
        None => {
            println!("{WELCOME}");
            Terminal::new().run(&mut exchange, &mut feed)
        }
    }
}
