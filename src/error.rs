//! Error types for the arena, configuration and book layers.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::arena::Handle;
use crate::command::OrderId;

/// Failures raised by the slot arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// Every slot is in use and the free list is empty.
    #[error("order pool exhausted")]
    PoolExhausted,

    /// The handle does not name a slot currently in use.
    /// Indicates a bookkeeping bug, never a caller mistake.
    #[error("invalid arena handle {0}")]
    InvalidHandle(Handle),
}

/// Rejected construction-time configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("tick must be positive, got {0}")]
    NonPositiveTick(Decimal),

    #[error("max price {max_price} leaves no level on a grid of tick {tick}")]
    MaxPriceBelowTick { tick: Decimal, max_price: Decimal },

    #[error("price grid of {0} levels is too large to index")]
    TooManyLevels(Decimal),

    #[error("order capacity must be non-zero")]
    ZeroCapacity,

    #[error("order capacity {0} exceeds the handle space")]
    CapacityTooLarge(u32),
}

/// Caller-facing failures of book operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    /// Non-positive volume or zero price.
    #[error("invalid order: price {price}, volume {volume}")]
    InvalidOrder { price: Decimal, volume: Decimal },

    /// Price is negative or falls beyond the last level of the grid.
    #[error("price {price} outside [0, {max_price})")]
    PriceOutOfRange { price: Decimal, max_price: Decimal },

    /// The residual could not rest because the arena is exhausted.
    ///
    /// Fills reported for the same submission are final; `trades_executed`
    /// counts them and the book's trade buffer still holds them.
    #[error("order book full: order {order_id} could not rest after {trades_executed} fills")]
    OrderBookFull {
        order_id: OrderId,
        trades_executed: usize,
    },

    /// The id is unknown, already cancelled, or already fully filled.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("invalid book configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for book operations.
pub type BookResult<T> = Result<T, BookError>;
