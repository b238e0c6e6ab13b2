use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Represents which side of the market the order is on.
///
/// # Intuition
/// - `Buy` (Bid): The trader wants to purchase shares. Buy orders are ranked from **highest to lowest price**
///   because a higher price means more willingness to buy — i.e., more aggressive.
/// - `Sell` (Ask): The trader wants to sell shares. Sell orders are ranked from **lowest to highest price**
///   because a lower price means more willingness to sell — i.e., more aggressive.
///
/// This ranking ensures the matching engine always pairs the **best prices first**:
/// buyers match with the lowest ask, sellers with the highest bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,  // Bid
    Sell, // Ask
}

/// A not-yet-accepted order submission.
///
/// The exchange assigns `id` and `timestamp` on acceptance, so callers only
/// describe what they want. Mirrors what a dispatcher would parse out of a
/// `buy`/`sell` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub trader_id: u64,
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub limit_price: Decimal,
}

/// A limit order accepted by the exchange.
///
/// Orders are immutable once accepted, with one exception: `remaining` is
/// decremented during partial fills. When it reaches 0 the order is retired
/// from its book and never reused.
///
/// `timestamp` is a monotonic sequence number assigned by the exchange, not
/// wall-clock time; it is the tie-break within a price level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub trader_id: u64,
    pub symbol: String,
    pub side: Side,
    /// Quantity as originally submitted.
    pub quantity: u64,
    /// Quantity still unfilled. Starts equal to `quantity`.
    pub remaining: u64,
    pub limit_price: Decimal,
    pub timestamp: u64,
}

impl Order {
    /// Validates and constructs an order. An order with `quantity == 0` or a
    /// non-positive `limit_price` is rejected here and never reaches a book.
    pub fn new(
        id: u64,
        trader_id: u64,
        symbol: impl Into<String>,
        side: Side,
        quantity: u64,
        limit_price: Decimal,
        timestamp: u64,
    ) -> Result<Self, EngineError> {
        if quantity == 0 {
            return Err(EngineError::InvalidOrder(
                "quantity must be > 0".to_string(),
            ));
        }
        if limit_price <= Decimal::ZERO {
            return Err(EngineError::InvalidOrder(format!(
                "limit price must be > 0, got {limit_price}"
            )));
        }
        Ok(Self {
            id,
            trader_id,
            symbol: symbol.into(),
            side,
            quantity,
            remaining: quantity,
            limit_price,
            timestamp,
        })
    }

    pub fn is_filled(&self) -> bool {
        self.remaining == 0
    }

    /// Cash required to fully fund this order at its limit price.
    pub fn notional(&self) -> Decimal {
        Decimal::from(self.remaining) * self.limit_price
    }
}
