//! Order Book - The central limit order book data structure.
//!
//! Each side is a pre-allocated array of price levels indexed by
//! `floor(price / tick)`, plus an occupancy bitset over those levels and a
//! cached best occupied level. The book owns
//! the arena, both sides, the `order_id -> handle` lookup and the id
//! generator; nothing outside it mutates them.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::arena::{Arena, Handle};
use crate::command::{Order, OrderId, Side, TradeEvent};
use crate::config::BookConfig;
use crate::occupancy::OccupancySet;
use crate::error::{ArenaError, BookError, BookResult};
use crate::price_level::PriceLevel;
use crate::snapshot::{BookSnapshot, LevelSnapshot, RestingOrder};

/// Mapping from OrderId to arena handle for O(1) cancel lookup
pub type OrderMap = FxHashMap<OrderId, Handle>;

/// Trade buffer size reserved at construction
const TRADE_BUFFER: usize = 64;

/// One side of the book.
///
/// Both sides share this type; `side` alone decides which direction is
/// "better" (higher for bids, lower for asks).
#[derive(Clone, Debug)]
pub struct BookSide {
    side: Side,
    levels: Vec<PriceLevel>,
    /// Bit per level, set iff the level is non-empty
    occupancy: OccupancySet,
    /// Index of the best non-empty level
    best: Option<usize>,
}

impl BookSide {
    fn new(side: Side, num_levels: usize) -> Self {
        Self {
            side,
            levels: vec![PriceLevel::new(); num_levels],
            occupancy: OccupancySet::new(num_levels),
            best: None,
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Index of the best occupied level
    #[inline]
    pub fn best(&self) -> Option<usize> {
        self.best
    }

    #[inline]
    pub fn level(&self, index: usize) -> Option<&PriceLevel> {
        self.levels.get(index)
    }

    #[inline]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Whether a resting level at `index` trades with an incoming order
    /// limited at `limit`.
    ///
    /// Asks trade at or below a buyer's limit, bids at or above a seller's.
    #[inline]
    pub fn crosses(&self, index: usize, limit: usize) -> bool {
        match self.side {
            Side::Sell => index <= limit,
            Side::Buy => index >= limit,
        }
    }

    /// Occupied levels from best to worst price.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &PriceLevel)> + '_ {
        let mut cursor = self.best;
        std::iter::from_fn(move || {
            let index = cursor?;
            cursor = self.worse_occupied(index);
            Some((index, &self.levels[index]))
        })
    }

    #[inline]
    fn is_better(&self, a: usize, b: usize) -> bool {
        match self.side {
            Side::Buy => a > b,
            Side::Sell => a < b,
        }
    }

    /// First non-empty level strictly worse than `index`.
    #[inline]
    fn worse_occupied(&self, index: usize) -> Option<usize> {
        match self.side {
            Side::Buy => index
                .checked_sub(1)
                .and_then(|below| self.occupancy.last_at_or_before(below)),
            Side::Sell => self.occupancy.first_at_or_after(index + 1),
        }
    }

    /// Drop `index` from the occupancy set once it has emptied, moving the
    /// best-level cache if it pointed there.
    #[inline]
    fn refresh_best(&mut self, index: usize) {
        if !self.levels[index].is_empty() {
            return;
        }
        self.occupancy.remove(index);
        if self.best == Some(index) {
            self.best = self.worse_occupied(index);
        }
    }

    pub(crate) fn push(&mut self, arena: &mut Arena, index: usize, order: Order) -> Result<Handle, ArenaError> {
        let handle = self.levels[index].push_back(arena, order)?;
        self.occupancy.insert(index);
        if self.best.map_or(true, |best| self.is_better(index, best)) {
            self.best = Some(index);
        }
        Ok(handle)
    }

    pub(crate) fn front<'a>(&self, arena: &'a Arena, index: usize) -> Option<&'a Order> {
        self.levels[index].front(arena)
    }

    pub(crate) fn pop_front(&mut self, arena: &mut Arena, index: usize) -> Option<Order> {
        let order = self.levels[index].pop_front(arena);
        self.refresh_best(index);
        order
    }

    pub(crate) fn fill_front(&mut self, arena: &mut Arena, index: usize, volume: Decimal) {
        self.levels[index].fill_front(arena, volume);
    }

    pub(crate) fn remove(&mut self, arena: &mut Arena, index: usize, handle: Handle) -> Result<Order, ArenaError> {
        let order = self.levels[index].remove(arena, handle)?;
        self.refresh_best(index);
        Ok(order)
    }
}

/// Limit order book for a single instrument on a fixed tick grid.
///
/// Run one book per instrument; a book is never shared between threads
/// while mutating, so it carries no locks.
pub struct OrderBook {
    pub(crate) tick: Decimal,
    pub(crate) max_price: Decimal,
    /// Order storage and list links
    pub(crate) arena: Arena,
    /// Bid price levels (buy orders)
    pub(crate) bids: BookSide,
    /// Ask price levels (sell orders)
    pub(crate) asks: BookSide,
    /// Order lookup map: OrderId -> handle, present iff the order rests
    pub(crate) order_map: OrderMap,
    pub(crate) next_order_id: OrderId,
    /// Logical clock, advanced by every accepted submission and cancel
    pub(crate) sequence: u64,
    /// Fills of the most recent submission
    pub(crate) trades: Vec<TradeEvent>,
}

impl OrderBook {
    /// Create an empty book, allocating every price level and arena slot
    /// reservation up front.
    pub fn new(config: BookConfig) -> BookResult<Self> {
        let num_levels = config.validate()?;

        debug!(
            tick = %config.tick,
            max_price = %config.max_price,
            num_levels,
            capacity = config.capacity,
            "order book created"
        );

        Ok(Self {
            tick: config.tick,
            max_price: config.max_price,
            arena: Arena::new(config.capacity),
            bids: BookSide::new(Side::Buy, num_levels),
            asks: BookSide::new(Side::Sell, num_levels),
            order_map: FxHashMap::with_capacity_and_hasher(
                config.capacity as usize,
                Default::default(),
            ),
            next_order_id: 0,
            sequence: 0,
            trades: Vec::with_capacity(TRADE_BUFFER),
        })
    }

    // ========================================================================
    // Grid
    // ========================================================================

    #[inline]
    pub fn tick(&self) -> Decimal {
        self.tick
    }

    #[inline]
    pub fn max_price(&self) -> Decimal {
        self.max_price
    }

    #[inline]
    pub fn num_levels(&self) -> usize {
        self.bids.num_levels()
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.arena.capacity()
    }

    /// Grid price of a level index.
    #[inline]
    pub fn price_of(&self, index: usize) -> Decimal {
        self.tick * Decimal::from(index)
    }

    /// Level index of a price, `None` when off the grid.
    #[inline]
    pub fn level_index(&self, price: Decimal) -> Option<usize> {
        if price < Decimal::ZERO || price >= self.max_price {
            return None;
        }
        (price / self.tick)
            .floor()
            .to_usize()
            .filter(|&index| index < self.num_levels())
    }

    // ========================================================================
    // Side Access
    // ========================================================================

    #[inline]
    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Mutable side together with the arena, as disjoint borrows.
    #[inline]
    pub(crate) fn side_and_arena(&mut self, side: Side) -> (&mut BookSide, &mut Arena) {
        match side {
            Side::Buy => (&mut self.bids, &mut self.arena),
            Side::Sell => (&mut self.asks, &mut self.arena),
        }
    }

    /// Read-only view of the order storage.
    #[inline]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    // ========================================================================
    // Best Price Access
    // ========================================================================

    /// Get the best bid price (highest buy price)
    #[inline]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.best_price(Side::Buy)
    }

    /// Get the best ask price (lowest sell price)
    #[inline]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.best_price(Side::Sell)
    }

    /// Get the best price on a given side
    #[inline]
    pub fn best_price(&self, side: Side) -> Option<Decimal> {
        self.side(side).best().map(|index| self.price_of(index))
    }

    /// Calculate spread (best_ask - best_bid)
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Get depth at a price level: (total remaining volume, order count)
    pub fn depth_at(&self, side: Side, price: Decimal) -> (Decimal, u32) {
        self.level_index(price)
            .and_then(|index| self.side(side).level(index))
            .map(|level| (level.total_volume(), level.count()))
            .unwrap_or((Decimal::ZERO, 0))
    }

    // ========================================================================
    // Order Lookup
    // ========================================================================

    /// Look up a resting order by ID.
    #[inline]
    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        let handle = *self.order_map.get(&order_id)?;
        Some(&self.arena[handle])
    }

    /// Check if an order is resting.
    #[inline]
    pub fn contains_order(&self, order_id: OrderId) -> bool {
        self.order_map.contains_key(&order_id)
    }

    /// Get the total number of resting orders
    #[inline]
    pub fn order_count(&self) -> usize {
        self.order_map.len()
    }

    /// Check if the book is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_map.is_empty()
    }

    /// Id the next accepted submission will receive.
    #[inline]
    pub fn next_order_id(&self) -> OrderId {
        self.next_order_id
    }

    /// Logical time of the next accepted event.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// Stamp an accepted event and move the clock on.
    #[inline]
    pub(crate) fn advance_sequence(&mut self) -> u64 {
        let now = self.sequence;
        self.sequence += 1;
        now
    }

    /// Enqueue a residual and index it. Both happen or neither does.
    pub(crate) fn rest(&mut self, order: Order, index: usize) -> Result<Handle, ArenaError> {
        let (book_side, arena) = self.side_and_arena(order.side);
        let handle = book_side.push(arena, index, order)?;
        self.order_map.insert(order.order_id, handle);

        debug!(
            order_id = order.order_id,
            side = ?order.side,
            price = %order.price,
            volume = %order.remaining_volume,
            "order resting"
        );
        Ok(handle)
    }

    /// Cancel a resting order.
    ///
    /// Splices the order out of its level, releases its slot and erases its
    /// lookup entry in one step.
    ///
    /// # Returns
    /// The removed order; its `remaining_volume` is the cancelled amount.
    ///
    /// # Errors
    /// `OrderNotFound` for an unknown, cancelled or fully filled id.
    pub fn cancel(&mut self, order_id: OrderId) -> BookResult<Order> {
        let handle = match self.order_map.get(&order_id) {
            Some(&handle) => handle,
            None => {
                debug!(order_id, "cancel rejected: order not found");
                return Err(BookError::OrderNotFound(order_id));
            }
        };

        let (side, price) = {
            let order = &self.arena[handle];
            (order.side, order.price)
        };
        let index = match self.level_index(price) {
            Some(index) => index,
            None => corrupted(format_args!("order {order_id} rests off-grid at {price}")),
        };

        let (book_side, arena) = self.side_and_arena(side);
        let order = match book_side.remove(arena, index, handle) {
            Ok(order) => order,
            Err(err) => corrupted(format_args!("cancel of order {order_id}: {err}")),
        };
        self.order_map.remove(&order_id);
        self.advance_sequence();

        debug!(order_id, volume = %order.remaining_volume, "order cancelled");
        Ok(order)
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Read-only depth view of both sides, best price first, orders in
    /// time priority within each level.
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            bids: self.side_snapshot(&self.bids),
            asks: self.side_snapshot(&self.asks),
        }
    }

    fn side_snapshot(&self, book_side: &BookSide) -> Vec<LevelSnapshot> {
        book_side
            .occupied()
            .map(|(index, level)| LevelSnapshot {
                level: index,
                price: self.price_of(index),
                orders: level
                    .iter(&self.arena)
                    .map(|(_, order)| RestingOrder::from(order))
                    .collect(),
            })
            .collect()
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("tick", &self.tick)
            .field("max_price", &self.max_price)
            .field("best_bid", &self.best_bid())
            .field("best_ask", &self.best_ask())
            .field("order_count", &self.order_map.len())
            .field("arena", &self.arena)
            .finish()
    }
}

/// The lookup and the levels disagree: a bookkeeping bug, not a caller error.
#[cold]
#[inline(never)]
fn corrupted(detail: std::fmt::Arguments<'_>) -> ! {
    panic!("order book invariant violated: {detail}")
}
