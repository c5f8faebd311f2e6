//! Arena Allocator - fixed-capacity slot pool with a free list.
//!
//! Every resting order lives in exactly one slot, addressed by a stable
//! integer handle. Slots are never moved; a released slot goes onto a
//! free-list stack and is reused before any never-touched slot beyond the
//! watermark. The arena knows nothing about lists: the `next`/`prev` links
//! are storage only, maintained by [`PriceLevel`](crate::price_level::PriceLevel).

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::command::Order;
use crate::error::ArenaError;

/// Sentinel value representing a null handle (like nullptr)
pub const NULL_HANDLE: Handle = u32::MAX;

/// Slot index - our "compressed pointer".
/// Valid only while the slot it names is `Used`.
pub type Handle = u32;

/// Occupancy of a slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotStatus {
    Free,
    Used,
}

/// One storage cell: an order plus its intrusive list links.
#[derive(Clone, Copy, Debug)]
pub struct Slot {
    order: Order,
    /// Next order at the same price level (towards the tail)
    next: Handle,
    /// Previous order at the same price level (enables O(1) cancel)
    prev: Handle,
    status: SlotStatus,
}

/// Pre-allocated order pool with O(1) allocation and release.
///
/// Invariant: every index below `capacity` is exactly one of Used, on the
/// free list, or at/after the watermark (`slots.len()`).
pub struct Arena {
    /// Slots touched so far; `slots.len()` is the watermark
    slots: Vec<Slot>,
    /// Stack of released slot indices
    free: Vec<Handle>,
    /// Number of currently used slots
    allocated_count: u32,
    /// Total capacity
    capacity: u32,
}

impl Arena {
    /// Create a new arena with the specified capacity.
    ///
    /// Both backing vectors reserve their full capacity up front, so
    /// allocation never touches the heap afterwards.
    ///
    /// # Panics
    /// Panics if capacity is not below `NULL_HANDLE` (reserved as null).
    pub fn new(capacity: u32) -> Self {
        assert!(capacity < NULL_HANDLE, "Capacity must be less than NULL_HANDLE");

        Self {
            slots: Vec::with_capacity(capacity as usize),
            free: Vec::with_capacity(capacity as usize),
            allocated_count: 0,
            capacity,
        }
    }

    /// Store an order in a fresh slot.
    ///
    /// Reuses the most recently released slot if any, otherwise takes the
    /// next slot past the watermark. The slot's links start out null.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub fn allocate(&mut self, order: Order) -> Result<Handle, ArenaError> {
        let slot = Slot {
            order,
            next: NULL_HANDLE,
            prev: NULL_HANDLE,
            status: SlotStatus::Used,
        };

        let handle = if let Some(handle) = self.free.pop() {
            self.slots[handle as usize] = slot;
            handle
        } else if (self.slots.len() as u32) < self.capacity {
            self.slots.push(slot);
            (self.slots.len() - 1) as Handle
        } else {
            return Err(ArenaError::PoolExhausted);
        };

        self.allocated_count += 1;
        Ok(handle)
    }

    /// Return a slot to the pool.
    ///
    /// The caller must already have unlinked the slot from its price level.
    /// Releasing a free or unknown handle is a no-op and never pushes the
    /// handle twice.
    ///
    /// # Returns
    /// The order the slot held, or `None` if nothing was released.
    ///
    /// # Complexity
    /// O(1) - pushes onto the free stack
    #[inline]
    pub fn release(&mut self, handle: Handle) -> Option<Order> {
        let slot = match self.slots.get_mut(handle as usize) {
            Some(slot) if slot.status == SlotStatus::Used => slot,
            _ => {
                tracing::warn!(handle, "release of a slot that is not in use");
                return None;
            }
        };

        slot.status = SlotStatus::Free;
        slot.next = NULL_HANDLE;
        slot.prev = NULL_HANDLE;
        let order = slot.order;

        self.free.push(handle);
        self.allocated_count -= 1;
        Some(order)
    }

    /// Get the order stored at `handle`.
    #[inline]
    pub fn get(&self, handle: Handle) -> Result<&Order, ArenaError> {
        match self.slots.get(handle as usize) {
            Some(slot) if slot.status == SlotStatus::Used => Ok(&slot.order),
            _ => Err(ArenaError::InvalidHandle(handle)),
        }
    }

    /// Get the order stored at `handle` for mutation.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Order, ArenaError> {
        match self.slots.get_mut(handle as usize) {
            Some(slot) if slot.status == SlotStatus::Used => Ok(&mut slot.order),
            _ => Err(ArenaError::InvalidHandle(handle)),
        }
    }

    /// Status of a slot, `None` past the watermark.
    #[inline]
    pub fn status(&self, handle: Handle) -> Option<SlotStatus> {
        self.slots.get(handle as usize).map(|slot| slot.status)
    }

    /// Successor link of a used slot.
    #[inline]
    pub fn next(&self, handle: Handle) -> Handle {
        self.used(handle).next
    }

    /// Predecessor link of a used slot.
    #[inline]
    pub fn prev(&self, handle: Handle) -> Handle {
        self.used(handle).prev
    }

    #[inline]
    pub(crate) fn set_next(&mut self, handle: Handle, next: Handle) {
        self.used_mut(handle).next = next;
    }

    #[inline]
    pub(crate) fn set_prev(&mut self, handle: Handle, prev: Handle) {
        self.used_mut(handle).prev = prev;
    }

    /// Returns the number of currently allocated slots.
    #[inline]
    pub fn allocated(&self) -> u32 {
        self.allocated_count
    }

    /// Returns the total capacity of the arena.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of slots ever handed out (free-list slots included).
    #[inline]
    pub fn watermark(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Returns true if no slot is in use.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.allocated_count == 0
    }

    /// Returns true if the next allocation would fail.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.allocated_count == self.capacity
    }

    #[inline]
    fn used(&self, handle: Handle) -> &Slot {
        match self.slots.get(handle as usize) {
            Some(slot) if slot.status == SlotStatus::Used => slot,
            _ => panic!("{}", ArenaError::InvalidHandle(handle)),
        }
    }

    #[inline]
    fn used_mut(&mut self, handle: Handle) -> &mut Slot {
        match self.slots.get_mut(handle as usize) {
            Some(slot) if slot.status == SlotStatus::Used => slot,
            _ => panic!("{}", ArenaError::InvalidHandle(handle)),
        }
    }
}

/// Unchecked-by-contract access for code that owns the list invariants.
///
/// # Panics
/// Panics on a handle that is not in use: reaching a free slot means the
/// book's bookkeeping is corrupt.
impl Index<Handle> for Arena {
    type Output = Order;

    #[inline]
    fn index(&self, handle: Handle) -> &Order {
        &self.used(handle).order
    }
}

impl IndexMut<Handle> for Arena {
    #[inline]
    fn index_mut(&mut self, handle: Handle) -> &mut Order {
        &mut self.used_mut(handle).order
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity)
            .field("allocated", &self.allocated_count)
            .field("watermark", &self.slots.len())
            .field("free", &self.free.len())
            .finish()
    }
}
