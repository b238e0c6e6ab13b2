//! Interactive terminal dispatcher.
//!
//! Text commands are parsed into a tagged [`Command`] at this boundary; the
//! engine itself only ever sees typed calls. Parse and validation failures
//! print usage and log a warning without touching engine state.

use std::io::{BufRead, Write};

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::{
    exchange::Exchange,
    optimizer::{max_single_trade_profit, max_total_profit_unlimited_trades},
    orderbook::BookSnapshot,
    orders::{NewOrder, Side},
    stock::PriceFeed,
};

const HELP: &str = "\
Commands:
    login ID               authenticate with your trader id
    help                   display this menu
    next                   advance the market one tick
    buy SYMBOL QTY PRICE   place a limit buy order
    sell SYMBOL QTY PRICE  place a limit sell order
    match SYMBOL           execute order matching for SYMBOL
    book SYMBOL            show the resting orders for SYMBOL
    portfolio              view your cash, holdings and P&L
    ledger                 list your settled trades
    cancel ID              cancel a resting order
    profit SYMBOL          best historical trade windows for SYMBOL
    quit                   exit the terminal";

/// One parsed terminal command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login(u64),
    Help,
    Next,
    Order {
        side: Side,
        symbol: String,
        quantity: u64,
        price: Decimal,
    },
    Match(String),
    Book(String),
    Portfolio,
    Ledger,
    Cancel(u64),
    Profit(String),
    Quit,
}

impl Command {
    /// Parses one input line. Returns a usage string on failure.
    pub fn parse(line: &str) -> Result<Command, String> {
        let mut parts = line.split_whitespace();
        let word = match parts.next() {
            Some(w) => w.to_ascii_lowercase(),
            None => return Err(HELP.to_string()),
        };
        let args: Vec<&str> = parts.collect();

        match (word.as_str(), args.as_slice()) {
            ("login", [id]) => id
                .parse()
                .map(Command::Login)
                .map_err(|_| "Usage: login ID".to_string()),
            ("help", []) => Ok(Command::Help),
            ("next", []) => Ok(Command::Next),
            ("buy", [symbol, qty, price]) => parse_order(Side::Buy, symbol, qty, price),
            ("sell", [symbol, qty, price]) => parse_order(Side::Sell, symbol, qty, price),
            ("buy", _) => Err("Usage: buy SYMBOL QTY PRICE".to_string()),
            ("sell", _) => Err("Usage: sell SYMBOL QTY PRICE".to_string()),
            ("match", [symbol]) => Ok(Command::Match(symbol.to_uppercase())),
            ("match", _) => Err("Usage: match SYMBOL".to_string()),
            ("book", [symbol]) | ("status", [symbol]) => Ok(Command::Book(symbol.to_uppercase())),
            ("portfolio", []) => Ok(Command::Portfolio),
            ("ledger", []) => Ok(Command::Ledger),
            ("cancel", [id]) => id
                .parse()
                .map(Command::Cancel)
                .map_err(|_| "Usage: cancel ID".to_string()),
            ("profit", [symbol]) => Ok(Command::Profit(symbol.to_uppercase())),
            ("quit", []) | ("exit", []) => Ok(Command::Quit),
            _ => Err(format!("Unknown command: `{word}`. Type `help` for the menu.")),
        }
    }
}

fn parse_order(side: Side, symbol: &str, qty: &str, price: &str) -> Result<Command, String> {
    let quantity: u64 = qty
        .parse()
        .map_err(|_| format!("bad quantity `{qty}`: expected a positive integer"))?;
    let price: Decimal = price
        .parse()
        .map_err(|_| format!("bad price `{price}`: expected a decimal"))?;
    Ok(Command::Order {
        side,
        symbol: symbol.to_uppercase(),
        quantity,
        price,
    })
}

/// The interactive session: one logged-in trader driving the exchange.
pub struct Terminal {
    active_trader: Option<u64>,
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            active_trader: None,
        }
    }

    /// Reads commands from stdin until `quit` or EOF.
    pub fn run(
        &mut self,
        exchange: &mut Exchange,
        feed: &mut PriceFeed,
    ) -> anyhow::Result<()> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            write!(stdout, "> ")?;
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break; // EOF
            }
            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(usage) => {
                    println!("{usage}");
                    warn!(input = line.trim(), "command usage error");
                    continue;
                }
            };
            info!(?command, "command received");
            if !self.dispatch(command, exchange, feed) {
                break;
            }
        }
        Ok(())
    }

    /// Executes one command. Returns false when the session should end.
    pub fn dispatch(
        &mut self,
        command: Command,
        exchange: &mut Exchange,
        feed: &mut PriceFeed,
    ) -> bool {
        match command {
            Command::Quit => return false,
            Command::Help => println!("{HELP}"),
            Command::Login(id) => {
                if exchange.portfolio(id).is_none() {
                    println!("Unknown trader id {id}.");
                } else {
                    self.active_trader = Some(id);
                    println!("Logged in as trader {id}.");
                }
            }
            Command::Next => match feed.advance() {
                Ok(_) => display_prices(feed),
                Err(e) => println!("tick failed: {e}"),
            },
            Command::Order {
                side,
                symbol,
                quantity,
                price,
            } => {
                let Some(trader_id) = self.active_trader else {
                    println!("Please log in first.");
                    return true;
                };
                let result = exchange.add_order(NewOrder {
                    trader_id,
                    symbol: symbol.clone(),
                    side,
                    quantity,
                    limit_price: price,
                });
                match result {
                    Ok(id) => {
                        println!("Order {id} placed for {symbol}.");
                        self.show_portfolio(exchange, feed);
                    }
                    Err(e) => println!("Order rejected: {e}"),
                }
            }
            Command::Match(symbol) => match exchange.match_orders(&symbol) {
                Ok(trades) if trades.is_empty() => println!("No trades."),
                Ok(trades) => {
                    for t in &trades {
                        println!(
                            "Trade: {} x {} @ {} (buy #{}, sell #{})",
                            t.symbol, t.quantity, t.price, t.buy_order_id, t.sell_order_id
                        );
                    }
                }
                Err(e) => println!("Match failed: {e}"),
            },
            Command::Book(symbol) => match exchange.status(&symbol) {
                Ok(snapshot) => display_book(&symbol, &snapshot),
                Err(e) => println!("{e}"),
            },
            Command::Portfolio => self.show_portfolio(exchange, feed),
            Command::Ledger => {
                let Some(trader_id) = self.active_trader else {
                    println!("Please log in first.");
                    return true;
                };
                match exchange.ledger(trader_id) {
                    Ok(ledger) => {
                        let trades: Vec<_> = ledger.collect();
                        if trades.is_empty() {
                            println!("No settled trades yet.");
                        } else {
                            match serde_json::to_string_pretty(&trades) {
                                Ok(json) => println!("{json}"),
                                Err(e) => println!("render failed: {e}"),
                            }
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
            Command::Cancel(order_id) => match exchange.cancel(order_id) {
                Ok(order) => println!(
                    "Cancelled order {} ({} {} remaining @ {}).",
                    order.id, order.symbol, order.remaining, order.limit_price
                ),
                Err(e) => println!("{e}"),
            },
            Command::Profit(symbol) => match feed.history(&symbol) {
                Some(history) => display_profit(history),
                None => println!("Unknown symbol. Known: {}", known_symbols(feed)),
            },
        }
        true
    }

    fn show_portfolio(&self, exchange: &Exchange, feed: &PriceFeed) {
        let Some(trader_id) = self.active_trader else {
            println!("Please log in first.");
            return;
        };
        let Some(portfolio) = exchange.portfolio(trader_id) else {
            println!("Unknown trader id {trader_id}.");
            return;
        };
        println!("Cash balance: ${}", portfolio.cash_balance());
        let mut holdings: Vec<(&str, u64)> = portfolio.holdings().collect();
        holdings.sort_unstable();
        if holdings.is_empty() {
            println!("Holdings: none");
        } else {
            println!("Holdings:");
            for (symbol, qty) in holdings {
                println!("  {symbol:<6} {qty}");
            }
        }
        println!("Market value: ${}", portfolio.market_value(&feed.quotes()));
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

fn known_symbols(feed: &PriceFeed) -> String {
    feed.symbols().collect::<Vec<_>>().join(", ")
}

fn display_prices(feed: &PriceFeed) {
    println!("------ Market ------");
    for symbol in feed.symbols() {
        if let Some(price) = feed.current_price(symbol) {
            println!("{symbol:<6} {price}");
        }
    }
    println!("--------------------");
}

fn display_book(symbol: &str, snapshot: &BookSnapshot) {
    println!("------ {symbol} ------");
    println!("Bids (highest first):");
    for order in &snapshot.bids {
        println!(
            "  #{:<4} trader {:<4} {:>6} @ {}",
            order.id, order.trader_id, order.remaining, order.limit_price
        );
    }
    println!("Asks (lowest first):");
    for order in &snapshot.asks {
        println!(
            "  #{:<4} trader {:<4} {:>6} @ {}",
            order.id, order.trader_id, order.remaining, order.limit_price
        );
    }
    println!("--------------------");
}

fn display_profit(history: &[Decimal]) {
    let single = max_single_trade_profit(history);
    match single.window {
        Some((buy, sell)) => println!(
            "Best single trade: buy at tick {buy} ({}), sell at tick {sell} ({}), profit {} per share",
            history[buy], history[sell], single.profit
        ),
        None => println!("Best single trade: none (prices never rose)"),
    }

    let total = max_total_profit_unlimited_trades(history);
    println!("Unlimited trades: total profit {} per share", total.profit);
    for (buy, sell) in &total.windows {
        println!("  buy tick {buy} ({}) -> sell tick {sell} ({})", history[*buy], history[*sell]);
    }
}
