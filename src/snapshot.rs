//! Read-only depth view of the book.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::command::{Order, OrderId, OwnerId};

/// One resting order as seen in a snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct RestingOrder {
    pub order_id: OrderId,
    pub owner_id: OwnerId,
    pub price: Decimal,
    pub initial_volume: Decimal,
    pub remaining_volume: Decimal,
    pub timestamp: u64,
}

impl From<&Order> for RestingOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id,
            owner_id: order.owner_id,
            price: order.price,
            initial_volume: order.initial_volume,
            remaining_volume: order.remaining_volume,
            timestamp: order.timestamp,
        }
    }
}

/// An occupied price level, orders in time priority
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct LevelSnapshot {
    /// Grid index, `floor(price / tick)`
    pub level: usize,
    pub price: Decimal,
    pub orders: Vec<RestingOrder>,
}

impl LevelSnapshot {
    pub fn total_volume(&self) -> Decimal {
        self.orders.iter().map(|order| order.remaining_volume).sum()
    }
}

/// Both sides of the book, best price first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct BookSnapshot {
    pub bids: Vec<LevelSnapshot>,
    pub asks: Vec<LevelSnapshot>,
}

impl BookSnapshot {
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|level| level.price)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|level| level.price)
    }

    pub fn order_count(&self) -> usize {
        self.bids
            .iter()
            .chain(&self.asks)
            .map(|level| level.orders.len())
            .sum()
    }

    /// Every resting order, bids then asks.
    pub fn orders(&self) -> impl Iterator<Item = &RestingOrder> + '_ {
        self.bids
            .iter()
            .chain(&self.asks)
            .flat_map(|level| level.orders.iter())
    }
}

impl fmt::Display for BookSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (title, levels) in [("Buy orders", &self.bids), ("Sell orders", &self.asks)] {
            writeln!(f, "{title}:")?;
            for level in levels {
                writeln!(f, "\tprice level {} ({}):", level.price, level.level)?;
                for order in &level.orders {
                    writeln!(
                        f,
                        "\t\tid={} owner={} price={} initial={} remaining={} timestamp={}",
                        order.order_id,
                        order.owner_id,
                        order.price,
                        order.initial_volume,
                        order.remaining_volume,
                        order.timestamp,
                    )?;
                }
            }
        }
        Ok(())
    }
}
