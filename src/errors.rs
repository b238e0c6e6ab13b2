use rust_decimal::Decimal;
use thiserror::Error;

/// Everything that can go wrong inside the engine.
///
/// The first four variants are recoverable rejections: the order (or cancel)
/// is refused and no book or portfolio state changes. `SettlementInvariantViolated`
/// is defensive; it means a reservation check was bypassed and the current
/// match step was aborted.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("invalid price: {0} is negative")]
    InvalidPrice(Decimal),

    #[error("insufficient funds: order requires {needed}, cash balance is {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("insufficient holdings of {symbol}: order requires {needed}, holding {available}")]
    InsufficientHoldings {
        symbol: String,
        needed: u64,
        available: u64,
    },

    #[error("unknown symbol: `{0}`")]
    UnknownSymbol(String),

    #[error("unknown trader: {0}")]
    UnknownTrader(u64),

    #[error("order {0} not found")]
    OrderNotFound(u64),

    #[error("settlement invariant violated for trader {trader_id} on order {order_id}: {detail}")]
    SettlementInvariantViolated {
        trader_id: u64,
        order_id: u64,
        detail: String,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
