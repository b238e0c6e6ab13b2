use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{errors::EngineError, orders::Side, trade::Trade};

/// Which side of a trade a portfolio is settling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Buyer,
    Seller,
}

/// A trader's cash balance, per-symbol holdings, and append-only trade ledger.
///
/// Cash and holdings are mutated only through [`settle`](Portfolio::settle);
/// there is no external write path after construction. Holdings may be seeded
/// at session start via [`with_holdings`](Portfolio::with_holdings) so that a
/// trader has something to sell.
#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    trader_id: u64,
    cash_balance: Decimal,
    holdings: HashMap<String, u64>,
    ledger: Vec<Trade>,
}

impl Portfolio {
    pub fn new(trader_id: u64, starting_balance: Decimal) -> Self {
        Self {
            trader_id,
            cash_balance: starting_balance,
            holdings: HashMap::new(),
            ledger: Vec::new(),
        }
    }

    /// Session-start constructor with pre-existing positions.
    pub fn with_holdings(
        trader_id: u64,
        starting_balance: Decimal,
        holdings: impl IntoIterator<Item = (String, u64)>,
    ) -> Self {
        Self {
            trader_id,
            cash_balance: starting_balance,
            holdings: holdings.into_iter().collect(),
            ledger: Vec::new(),
        }
    }

    pub fn trader_id(&self) -> u64 {
        self.trader_id
    }

    pub fn cash_balance(&self) -> Decimal {
        self.cash_balance
    }

    /// Shares held of `symbol`; 0 if never traded.
    pub fn position(&self, symbol: &str) -> u64 {
        self.holdings.get(symbol).copied().unwrap_or(0)
    }

    pub fn holdings(&self) -> impl Iterator<Item = (&str, u64)> {
        self.holdings.iter().map(|(s, q)| (s.as_str(), *q))
    }

    /// Pure affordability predicate; mutates nothing and reserves nothing.
    ///
    /// A buy needs `cash_balance >= quantity * price`; a sell needs
    /// `holdings[symbol] >= quantity`. The same predicate gates both order
    /// admission and settlement (no escrow model, so state can drift between
    /// the two and must be re-checked).
    pub fn reserve_check(&self, side: Side, symbol: &str, quantity: u64, price: Decimal) -> bool {
        match side {
            Side::Buy => self.cash_balance >= Decimal::from(quantity) * price,
            Side::Sell => self.position(symbol) >= quantity,
        }
    }

    /// Applies one side of a committed trade to this portfolio.
    ///
    /// Buyer: cash -= quantity * price, holdings += quantity.
    /// Seller: cash += quantity * price, holdings -= quantity.
    ///
    /// Returns `SettlementInvariantViolated` if the update would drive cash or
    /// holdings negative. That should never happen when `reserve_check` gated
    /// the trade; nothing is mutated on the error path.
    pub fn settle(&mut self, trade: &Trade, role: Role) -> Result<(), EngineError> {
        let amount = trade.notional();
        match role {
            Role::Buyer => {
                if self.cash_balance < amount {
                    return Err(EngineError::SettlementInvariantViolated {
                        trader_id: self.trader_id,
                        order_id: trade.buy_order_id,
                        detail: format!(
                            "buy settlement of {amount} exceeds cash balance {}",
                            self.cash_balance
                        ),
                    });
                }
                self.cash_balance -= amount;
                *self.holdings.entry(trade.symbol.clone()).or_insert(0) += trade.quantity;
            }
            Role::Seller => {
                let held = self.position(&trade.symbol);
                if held < trade.quantity {
                    return Err(EngineError::SettlementInvariantViolated {
                        trader_id: self.trader_id,
                        order_id: trade.sell_order_id,
                        detail: format!(
                            "sell settlement of {} {} exceeds holdings {held}",
                            trade.quantity, trade.symbol
                        ),
                    });
                }
                if let Some(entry) = self.holdings.get_mut(&trade.symbol) {
                    *entry -= trade.quantity;
                }
                self.cash_balance += amount;
            }
        }
        self.ledger.push(trade.clone());
        Ok(())
    }

    /// Settled trades affecting this trader, in settlement order.
    ///
    /// Lazy, finite, and restartable: callers can iterate as many times as
    /// they like for auditing or metric computation.
    pub fn ledger(&self) -> impl Iterator<Item = &Trade> {
        self.ledger.iter()
    }

    /// Cash plus holdings marked at the given prices. Symbols without a quote
    /// contribute nothing.
    pub fn market_value(&self, prices: &HashMap<String, Decimal>) -> Decimal {
        let positions: Decimal = self
            .holdings
            .iter()
            .filter_map(|(symbol, qty)| prices.get(symbol).map(|p| Decimal::from(*qty) * *p))
            .sum();
        self.cash_balance + positions
    }
}
