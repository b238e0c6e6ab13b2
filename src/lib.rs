//! A simplified single-exchange market: traders submit limit orders against
//! per-symbol order books, the matching engine pairs crossing orders by
//! price-time priority, and settled trades update trader portfolios.

pub mod cli;
pub mod errors;
pub mod exchange;
pub mod optimizer;
pub mod orderbook;
pub mod orders;
pub mod portfolio;
pub mod simulate;
pub mod stock;
pub mod trade;

pub use errors::{EngineError, EngineResult};
pub use exchange::Exchange;
pub use orderbook::{BookSnapshot, OrderBook};
pub use orders::{NewOrder, Order, Side};
pub use portfolio::{Portfolio, Role};
pub use stock::{GeometricBrownianMotion, PriceFeed, Stock, TickModel, UniformWalk};
pub use trade::Trade;
