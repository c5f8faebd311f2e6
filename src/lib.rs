//! # Grid-LOB
//!
//! A single-instrument limit order book on a fixed tick grid, matching
//! under price-time priority.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: One owner mutates a book; one book per instrument (no locks)
//! - **O(1) Operations**: Insert, cancel and per-fill matching run in constant time
//! - **Arena Allocation**: Orders live in a fixed slot pool, linked by 32-bit handles
//! - **Array-Indexed Levels**: Price levels are pre-allocated, addressed by `floor(price / tick)`
//! - **Occupancy Bitset**: The next non-empty level is found word-at-a-time, never level by level
//!
//! ## Architecture
//!
//! ```text
//! submit ──> [validate + quantize] ──> [cross opposite side] ──> [rest residual]
//!                                              |                       |
//!                                        [TradeEvent]*       [PriceLevel] + [id lookup]
//! ```

pub mod arena;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod matching;
pub mod occupancy;
pub mod order_book;
pub mod price_level;
pub mod snapshot;

// Re-exports for convenience
pub use arena::{Arena, Handle, SlotStatus, NULL_HANDLE};
pub use command::{
    CancelOrder, Command, Order, OrderId, Outcome, OwnerId, Side, SubmitOrder, TradeEvent,
};
pub use config::{BookConfig, DEFAULT_CAPACITY, MAX_LEVELS};
pub use engine::Engine;
pub use error::{ArenaError, BookError, BookResult, ConfigError};
pub use occupancy::OccupancySet;
pub use order_book::{BookSide, OrderBook};
pub use price_level::PriceLevel;
pub use snapshot::{BookSnapshot, LevelSnapshot, RestingOrder};
