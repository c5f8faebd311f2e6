//! Order, trade and command types exchanged with the book.
//!
//! Commands are caller inputs; trades are the economically meaningful
//! output of a submission.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Book-assigned, strictly increasing order identifier.
pub type OrderId = u64;

/// Caller-supplied identifier of the trader owning an order.
pub type OwnerId = u64;

/// Order side
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Side {
    /// Buy side (bids)
    Buy = 0,
    /// Sell side (asks)
    Sell = 1,
}

impl Side {
    /// Returns the opposite side
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// A resting limit order.
///
/// `price` is already quantized to the tick grid. Only `remaining_volume`
/// changes after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Order {
    pub order_id: OrderId,
    pub owner_id: OwnerId,
    pub side: Side,
    pub price: Decimal,
    /// Volume at submission, kept for reporting
    pub initial_volume: Decimal,
    /// Volume still open
    pub remaining_volume: Decimal,
    /// Logical arrival time on the book's event clock
    pub timestamp: u64,
}

impl Order {
    /// Volume filled so far.
    #[inline]
    pub fn filled_volume(&self) -> Decimal {
        self.initial_volume - self.remaining_volume
    }
}

// ============================================================================
// Input Commands
// ============================================================================

/// Submit a new limit order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmitOrder {
    pub owner_id: OwnerId,
    pub side: Side,
    /// Limit price, quantized down to the grid on submission
    pub price: Decimal,
    pub volume: Decimal,
}

/// Cancel a resting order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CancelOrder {
    pub order_id: OrderId,
}

/// Caller commands, applied strictly in sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Submit(SubmitOrder),
    Cancel(CancelOrder),
}

// ============================================================================
// Output Events
// ============================================================================

/// A fill between an incoming (aggressor) and a resting (passive) order.
///
/// `price` is always the passive order's price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TradeEvent {
    pub aggressor_owner_id: OwnerId,
    pub passive_owner_id: OwnerId,
    pub aggressor_order_id: OrderId,
    pub passive_order_id: OrderId,
    /// Side of the aggressor
    pub side: Side,
    pub price: Decimal,
    pub volume: Decimal,
}

/// Result of a successfully applied command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The submission was accepted; `trades` lists its fills in order.
    Submitted {
        order_id: OrderId,
        trades: Vec<TradeEvent>,
    },
    /// The order was removed; its `remaining_volume` is the cancelled amount.
    Canceled(Order),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_filled_volume() {
        let order = Order {
            order_id: 1,
            owner_id: 2,
            side: Side::Buy,
            price: Decimal::from(50),
            initial_volume: Decimal::from(140),
            remaining_volume: Decimal::from(110),
            timestamp: 1,
        };
        assert_eq!(order.filled_volume(), Decimal::from(30));
    }
}
