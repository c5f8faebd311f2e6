//! Price Level - A FIFO queue of orders at a single price point.
//!
//! Implements a doubly-linked list using arena handles for O(1)
//! insertion, removal from head, and removal from arbitrary position.
//! The level owns only the handle chain; order data lives in the arena.

use rust_decimal::Decimal;

use crate::arena::{Arena, Handle, NULL_HANDLE};
use crate::command::Order;
use crate::error::ArenaError;

/// A queue of orders at a specific price level.
///
/// Orders are processed in FIFO order (price-time priority).
/// Invariant: `head == NULL_HANDLE` iff `tail == NULL_HANDLE` iff `count == 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceLevel {
    /// Handle of the oldest order (highest priority, first to match)
    head: Handle,
    /// Handle of the newest order (last to match)
    tail: Handle,
    /// Total remaining volume across all orders at this level
    total_volume: Decimal,
    /// Number of orders at this level
    count: u32,
}

impl PriceLevel {
    /// Create a new empty price level
    #[inline]
    pub const fn new() -> Self {
        Self {
            head: NULL_HANDLE,
            tail: NULL_HANDLE,
            total_volume: Decimal::ZERO,
            count: 0,
        }
    }

    /// Returns true if there are no orders at this level
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub const fn head(&self) -> Handle {
        self.head
    }

    #[inline]
    pub const fn tail(&self) -> Handle {
        self.tail
    }

    #[inline]
    pub const fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub const fn total_volume(&self) -> Decimal {
        self.total_volume
    }

    /// Store `order` in the arena and append it to the tail of the queue.
    ///
    /// # Errors
    /// `PoolExhausted` if the arena has no free slot; the level is unchanged.
    ///
    /// # Panics
    /// If `total_volume` would overflow. The book rejects such orders before
    /// they reach a level.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn push_back(&mut self, arena: &mut Arena, order: Order) -> Result<Handle, ArenaError> {
        let volume = order.remaining_volume;
        let handle = arena.allocate(order)?;

        if self.tail == NULL_HANDLE {
            // Empty list: new node becomes both head and tail
            debug_assert!(self.head == NULL_HANDLE);
            self.head = handle;
        } else {
            arena.set_next(self.tail, handle);
            arena.set_prev(handle, self.tail);
        }
        self.tail = handle;

        self.count += 1;
        self.total_volume += volume;
        Ok(handle)
    }

    /// Remove the head order and release its slot.
    ///
    /// # Returns
    /// The removed order, or `None` if the level was empty.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn pop_front(&mut self, arena: &mut Arena) -> Option<Order> {
        if self.head == NULL_HANDLE {
            return None;
        }
        let handle = self.head;
        let next = arena.next(handle);

        if next == NULL_HANDLE {
            // Was the only node
            self.head = NULL_HANDLE;
            self.tail = NULL_HANDLE;
        } else {
            self.head = next;
            arena.set_prev(next, NULL_HANDLE);
        }

        self.detach(arena, handle)
    }

    /// Remove an order from anywhere in the queue (for cancel) and release
    /// its slot.
    ///
    /// Handles all edge cases:
    /// - Only node in level (head == tail)
    /// - Removing head
    /// - Removing tail
    /// - Removing from middle
    ///
    /// The handle must belong to this level; callers derive the level from
    /// the order's own price.
    ///
    /// # Errors
    /// `InvalidHandle` if the handle is not in use.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn remove(&mut self, arena: &mut Arena, handle: Handle) -> Result<Order, ArenaError> {
        arena.get(handle)?;
        let prev = arena.prev(handle);
        let next = arena.next(handle);

        if prev == NULL_HANDLE {
            debug_assert!(self.head == handle);
            self.head = next;
        } else {
            arena.set_next(prev, next);
        }

        if next == NULL_HANDLE {
            debug_assert!(self.tail == handle);
            self.tail = prev;
        } else {
            arena.set_prev(next, prev);
        }

        self.detach(arena, handle)
            .ok_or(ArenaError::InvalidHandle(handle))
    }

    /// Peek at the head order without removing it.
    #[inline]
    pub fn front<'a>(&self, arena: &'a Arena) -> Option<&'a Order> {
        if self.head == NULL_HANDLE {
            None
        } else {
            Some(&arena[self.head])
        }
    }

    /// Reduce the head order's remaining volume after a partial fill.
    ///
    /// The head must hold more than `volume`; a fill that consumes it
    /// entirely goes through [`pop_front`](Self::pop_front) instead.
    #[inline]
    pub fn fill_front(&mut self, arena: &mut Arena, volume: Decimal) {
        let head = &mut arena[self.head];
        debug_assert!(head.remaining_volume > volume);
        head.remaining_volume -= volume;
        self.total_volume -= volume;
    }

    /// Walk the queue from head to tail in time priority.
    pub fn iter<'a>(&self, arena: &'a Arena) -> LevelIter<'a> {
        LevelIter {
            arena,
            cursor: self.head,
        }
    }

    /// Account for an unlinked node and give its slot back.
    #[inline]
    fn detach(&mut self, arena: &mut Arena, handle: Handle) -> Option<Order> {
        let order = arena.release(handle)?;
        self.count -= 1;
        self.total_volume -= order.remaining_volume;
        Some(order)
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the orders of one level, oldest first.
pub struct LevelIter<'a> {
    arena: &'a Arena,
    cursor: Handle,
}

impl<'a> Iterator for LevelIter<'a> {
    type Item = (Handle, &'a Order);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NULL_HANDLE {
            return None;
        }
        let arena = self.arena;
        let handle = self.cursor;
        self.cursor = arena.next(handle);
        Some((handle, &arena[handle]))
    }
}
