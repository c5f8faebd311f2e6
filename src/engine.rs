//! Engine - applies a strictly ordered command stream to one book.
//!
//! One engine per instrument: each owns its book exclusively, so several
//! instruments scale out by sharding engines across threads with nothing
//! shared between them.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::command::{CancelOrder, Command, Outcome, SubmitOrder};
use crate::config::BookConfig;
use crate::error::BookResult;
use crate::order_book::OrderBook;

/// Synchronous, run-to-completion command processor.
pub struct Engine {
    /// The underlying order book
    book: OrderBook,
}

impl Engine {
    /// Create a new engine over an empty book.
    pub fn new(config: BookConfig) -> BookResult<Self> {
        Ok(Self {
            book: OrderBook::new(config)?,
        })
    }

    /// Process a single command.
    ///
    /// A submission that fails with `OrderBookFull` may still have traded;
    /// those fills remain readable through `book().trades()`.
    #[inline]
    pub fn process_command(&mut self, cmd: Command) -> BookResult<Outcome> {
        match cmd {
            Command::Submit(SubmitOrder {
                owner_id,
                side,
                price,
                volume,
            }) => {
                let order_id = self.book.submit(owner_id, price, volume, side)?;
                Ok(Outcome::Submitted {
                    order_id,
                    trades: self.book.trades().to_vec(),
                })
            }
            Command::Cancel(CancelOrder { order_id }) => {
                self.book.cancel(order_id).map(Outcome::Canceled)
            }
        }
    }

    /// Read-only access to the book.
    #[inline]
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Get total resting order count.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.book.order_count()
    }

    /// Compute a hash of the full book state (for determinism testing).
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.book.snapshot().hash(&mut hasher);
        self.book.next_order_id().hash(&mut hasher);
        self.book.sequence().hash(&mut hasher);
        self.book.arena().allocated().hash(&mut hasher);
        hasher.finish()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("book", &self.book).finish()
    }
}
