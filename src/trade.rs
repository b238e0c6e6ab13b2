use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A trade represents a matched transaction between a buy and a sell order.
///
/// # Behavior
/// - The trade always executes at the **resting (earlier-placed) order's**
///   limit price, preserving price-time priority.
/// - Partial fills may occur: one `match` call can emit several trades as the
///   crossing loop walks both sides of the book.
///
/// Trades are immutable once emitted and are appended to both counterparties'
/// ledgers during settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub buy_order_id: u64,
    pub sell_order_id: u64,
    pub buyer_id: u64,
    pub seller_id: u64,
    pub quantity: u64,
    pub price: Decimal,
    /// Monotonic sequence number at which the trade was emitted.
    pub timestamp: u64,
}

impl Trade {
    /// Cash that changes hands: `quantity * price`.
    pub fn notional(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}
