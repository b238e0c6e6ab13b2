use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::{
    errors::EngineError,
    orderbook::{BookSnapshot, OrderBook},
    orders::{NewOrder, Order, Side},
    portfolio::{Portfolio, Role},
    trade::Trade,
};

/// The matching engine: one [`OrderBook`] per listed symbol plus the
/// registered traders' [`Portfolio`]s.
///
/// The exchange owns the monotonic sequence counter that stamps orders and
/// trades, so every event in a session is totally ordered. All operations run
/// to completion on the calling thread; there is no background scheduler.
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    books: HashMap<String, OrderBook>,
    portfolios: HashMap<u64, Portfolio>,
    next_order_id: u64,
    /// Monotonic event sequence; stamps order timestamps and trade timestamps.
    seq: u64,
}

impl Exchange {
    /// Creates an exchange listing the given symbols, each with an empty book.
    pub fn new(symbols: impl IntoIterator<Item = String>) -> Self {
        Self {
            books: symbols.into_iter().map(|s| (s, OrderBook::new())).collect(),
            portfolios: HashMap::new(),
            next_order_id: 0,
            seq: 0,
        }
    }

    /// Registers a trader's portfolio at session start. Re-registering the
    /// same id replaces the previous portfolio, matching a fresh login.
    pub fn register_trader(&mut self, portfolio: Portfolio) {
        debug!(trader_id = portfolio.trader_id(), "trader registered");
        self.portfolios.insert(portfolio.trader_id(), portfolio);
    }

    pub fn is_listed(&self, symbol: &str) -> bool {
        self.books.contains_key(symbol)
    }

    /// Listed symbols in sorted order, for display.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.books.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    pub fn portfolio(&self, trader_id: u64) -> Option<&Portfolio> {
        self.portfolios.get(&trader_id)
    }

    /// Settled trades affecting `trader_id`, in settlement order.
    pub fn ledger(&self, trader_id: u64) -> Result<impl Iterator<Item = &Trade>, EngineError> {
        self.portfolios
            .get(&trader_id)
            .map(Portfolio::ledger)
            .ok_or(EngineError::UnknownTrader(trader_id))
    }

    /// Validates and accepts an order onto the book, returning its id.
    ///
    /// Checks, in order: the symbol is listed, the trader is registered, the
    /// order's own invariants hold, and the trader can cover the order (buy:
    /// cash >= quantity * price; sell: holdings >= quantity). Any failure
    /// rejects the order before insertion with no state change. The check
    /// reserves nothing: settlement re-validates against current balances.
    pub fn add_order(&mut self, new_order: NewOrder) -> Result<u64, EngineError> {
        let NewOrder {
            trader_id,
            symbol,
            side,
            quantity,
            limit_price,
        } = new_order;

        if !self.books.contains_key(&symbol) {
            return Err(EngineError::UnknownSymbol(symbol));
        }
        let portfolio = self
            .portfolios
            .get(&trader_id)
            .ok_or(EngineError::UnknownTrader(trader_id))?;

        let order = Order::new(
            self.next_order_id,
            trader_id,
            symbol.clone(),
            side,
            quantity,
            limit_price,
            self.seq + 1,
        )?;

        if !portfolio.reserve_check(side, &symbol, quantity, limit_price) {
            return Err(match side {
                Side::Buy => EngineError::InsufficientFunds {
                    needed: order.notional(),
                    available: portfolio.cash_balance(),
                },
                Side::Sell => EngineError::InsufficientHoldings {
                    symbol,
                    needed: quantity,
                    available: portfolio.position(&order.symbol),
                },
            });
        }

        // all checks passed, commit the counters and rest the order
        self.next_order_id += 1;
        self.seq += 1;
        let id = order.id;
        info!(
            order_id = id,
            trader_id,
            symbol = %order.symbol,
            ?side,
            quantity,
            price = %limit_price,
            "order accepted"
        );
        let book = self
            .books
            .get_mut(&order.symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(order.symbol.clone()))?;
        book.add_order(order)?;
        Ok(id)
    }

    /// Runs the crossing algorithm for one symbol and settles every trade.
    ///
    /// While the best bid's price is at or above the best ask's price, fills
    /// `min(bid.remaining, ask.remaining)` at the **earlier-placed** order's
    /// limit price (the resting order sets the clearing price). Both parties
    /// are re-validated before either is mutated; a failed re-validation
    /// aborts the match attempt with `SettlementInvariantViolated`, leaving
    /// the books and both portfolios untouched by the failing step. Trades
    /// settled by earlier iterations of the same call stay committed.
    ///
    /// An empty or non-crossing book returns `Ok(vec![])`; no trades is a
    /// valid outcome, not a failure. Always terminates: every iteration
    /// retires at least one order, and the loop ends as soon as either side
    /// empties or the spread opens.
    pub fn match_orders(&mut self, symbol: &str) -> Result<Vec<Trade>, EngineError> {
        let Exchange {
            books,
            portfolios,
            seq,
            ..
        } = self;
        let book = books
            .get_mut(symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(symbol.to_string()))?;

        let mut trades = Vec::new();
        loop {
            let (bid, ask) = match (book.peek_best_bid(), book.peek_best_ask()) {
                (Some(bid), Some(ask)) if bid.limit_price >= ask.limit_price => {
                    (bid.clone(), ask.clone())
                }
                _ => break,
            };

            let quantity = bid.remaining.min(ask.remaining);
            // the earlier-placed (resting) order sets the execution price;
            // the sequence counter makes equal timestamps unreachable, and
            // the tie default is the ask's price
            let price = if ask.timestamp <= bid.timestamp {
                ask.limit_price
            } else {
                bid.limit_price
            };

            // no escrow, so balances may have drifted since admission;
            // check both parties before mutating either
            let buyer = portfolios
                .get(&bid.trader_id)
                .ok_or(EngineError::UnknownTrader(bid.trader_id))?;
            if !buyer.reserve_check(Side::Buy, symbol, quantity, price) {
                warn!(order_id = bid.id, trader_id = bid.trader_id, "buy re-validation failed");
                return Err(EngineError::SettlementInvariantViolated {
                    trader_id: bid.trader_id,
                    order_id: bid.id,
                    detail: format!("buy order {} can no longer be funded", bid.id),
                });
            }
            let seller = portfolios
                .get(&ask.trader_id)
                .ok_or(EngineError::UnknownTrader(ask.trader_id))?;
            if !seller.reserve_check(Side::Sell, symbol, quantity, price) {
                warn!(order_id = ask.id, trader_id = ask.trader_id, "sell re-validation failed");
                return Err(EngineError::SettlementInvariantViolated {
                    trader_id: ask.trader_id,
                    order_id: ask.id,
                    detail: format!("sell order {} can no longer be covered", ask.id),
                });
            }

            *seq += 1;
            let trade = Trade {
                symbol: symbol.to_string(),
                buy_order_id: bid.id,
                sell_order_id: ask.id,
                buyer_id: bid.trader_id,
                seller_id: ask.trader_id,
                quantity,
                price,
                timestamp: *seq,
            };

            portfolios
                .get_mut(&bid.trader_id)
                .ok_or(EngineError::UnknownTrader(bid.trader_id))?
                .settle(&trade, Role::Buyer)?;
            portfolios
                .get_mut(&ask.trader_id)
                .ok_or(EngineError::UnknownTrader(ask.trader_id))?
                .settle(&trade, Role::Seller)?;

            book.fill_best_bid(quantity);
            book.fill_best_ask(quantity);

            info!(
                symbol,
                quantity,
                price = %trade.price,
                buy_order = trade.buy_order_id,
                sell_order = trade.sell_order_id,
                "trade executed"
            );
            trades.push(trade);
        }
        Ok(trades)
    }

    /// Read-only snapshot of the resting orders for one symbol.
    pub fn status(&self, symbol: &str) -> Result<BookSnapshot, EngineError> {
        self.books
            .get(symbol)
            .map(OrderBook::snapshot)
            .ok_or_else(|| EngineError::UnknownSymbol(symbol.to_string()))
    }

    /// Cancels a resting order wherever it sits.
    pub fn cancel(&mut self, order_id: u64) -> Result<Order, EngineError> {
        for book in self.books.values_mut() {
            if let Ok(order) = book.cancel(order_id) {
                info!(order_id, "order cancelled");
                return Ok(order);
            }
        }
        Err(EngineError::OrderNotFound(order_id))
    }

    /// Total cash across all registered traders; invariant across matching.
    pub fn total_cash(&self) -> Decimal {
        self.portfolios.values().map(Portfolio::cash_balance).sum()
    }
}
