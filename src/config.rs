//! Construction-time book configuration.
//!
//! `tick` and `max_price` fix the price grid; `capacity` fixes the arena.
//! None of them can change once a book exists.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::arena::NULL_HANDLE;
use crate::error::ConfigError;

/// Default maximum number of resting orders
pub const DEFAULT_CAPACITY: u32 = 1_000_000;

/// Upper bound on price levels per side. Both sides pre-allocate every
/// level, so this caps the grid's memory at construction.
pub const MAX_LEVELS: usize = 1 << 22;

/// Price grid and arena sizing for one book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookConfig {
    /// Grid spacing, > 0
    pub tick: Decimal,
    /// Exclusive upper bound on prices
    pub max_price: Decimal,
    /// Maximum number of resting orders (`MAX_ORDERS`)
    pub capacity: u32,
}

impl BookConfig {
    pub fn new(tick: Decimal, max_price: Decimal, capacity: u32) -> Self {
        Self {
            tick,
            max_price,
            capacity,
        }
    }

    /// Check the configuration and return the number of price levels,
    /// `floor(max_price / tick)`, at most [`MAX_LEVELS`].
    pub fn validate(&self) -> Result<usize, ConfigError> {
        if self.tick <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveTick(self.tick));
        }
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.capacity >= NULL_HANDLE {
            return Err(ConfigError::CapacityTooLarge(self.capacity));
        }

        let levels = self
            .max_price
            .checked_div(self.tick)
            .ok_or(ConfigError::TooManyLevels(self.max_price))?
            .floor();
        if levels < Decimal::ONE {
            return Err(ConfigError::MaxPriceBelowTick {
                tick: self.tick,
                max_price: self.max_price,
            });
        }
        match levels.to_usize() {
            Some(count) if count <= MAX_LEVELS => Ok(count),
            _ => Err(ConfigError::TooManyLevels(levels)),
        }
    }

    /// Number of price levels per side, 0 for an invalid configuration.
    pub fn num_levels(&self) -> usize {
        self.validate().unwrap_or(0)
    }
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            tick: Decimal::new(1, 2),
            max_price: Decimal::from(1_000),
            capacity: DEFAULT_CAPACITY,
        }
    }
}
