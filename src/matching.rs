//! Matching - submission and the price-time priority sweep.
//!
//! Implements the cross/rest algorithm:
//! 1. CROSSING: Match the incoming order against the opposite side,
//!    best level first, oldest order first within a level
//! 2. RESTING: Place the remaining volume in the book
//!
//! Fills are final as soon as they are emitted. If the residual cannot rest
//! because the arena is full, the submission fails with `OrderBookFull`
//! but the fills already in [`OrderBook::trades`] stand.

use rust_decimal::Decimal;
use tracing::{trace, warn};

use crate::command::{Order, OrderId, OwnerId, Side, TradeEvent};
use crate::error::{BookError, BookResult};
use crate::order_book::OrderBook;

impl OrderBook {
    /// Submit a limit order.
    ///
    /// The price is quantized down to the tick grid. The order is matched
    /// against the opposite side; any residual rests on its own side.
    /// Fills are available from [`trades`](Self::trades) until the next call.
    ///
    /// # Returns
    /// The book-assigned order id.
    ///
    /// # Errors
    /// - `PriceOutOfRange` if `price < 0` or `price >= max_price`
    /// - `InvalidOrder` if `price == 0`, `volume <= 0`, or `volume` would
    ///   overflow the running total of the level it could rest on
    /// - `OrderBookFull` if the residual cannot rest; fills stand
    pub fn submit(
        &mut self,
        owner_id: OwnerId,
        price: Decimal,
        volume: Decimal,
        side: Side,
    ) -> BookResult<OrderId> {
        self.trades.clear();
        let limit = self.validate(side, price, volume)?;

        let order_id = self.next_order_id;
        self.next_order_id += 1;
        let timestamp = self.advance_sequence();

        let mut order = Order {
            order_id,
            owner_id,
            side,
            price: self.price_of(limit),
            initial_volume: volume,
            remaining_volume: volume,
            timestamp,
        };

        // Phase 1: CROSSING
        self.cross(&mut order, limit);

        // Phase 2: RESTING
        if order.remaining_volume > Decimal::ZERO && self.rest(order, limit).is_err() {
            warn!(
                order_id,
                unfilled = %order.remaining_volume,
                fills = self.trades.len(),
                "order book full, residual dropped"
            );
            return Err(BookError::OrderBookFull {
                order_id,
                trades_executed: self.trades.len(),
            });
        }

        Ok(order_id)
    }

    /// Fills emitted by the most recent [`submit`](Self::submit), in order.
    #[inline]
    pub fn trades(&self) -> &[TradeEvent] {
        &self.trades
    }

    /// Check the price and volume and return the limit's level index.
    fn validate(&self, side: Side, price: Decimal, volume: Decimal) -> BookResult<usize> {
        let Some(limit) = self.level_index(price) else {
            return Err(BookError::PriceOutOfRange {
                price,
                max_price: self.max_price,
            });
        };
        if price.is_zero() || volume <= Decimal::ZERO {
            return Err(BookError::InvalidOrder { price, volume });
        }
        // Any residual is at most `volume` and joins the level at `limit`
        let resting = self
            .side(side)
            .level(limit)
            .map_or(Decimal::ZERO, |level| level.total_volume());
        if resting.checked_add(volume).is_none() {
            return Err(BookError::InvalidOrder { price, volume });
        }
        Ok(limit)
    }

    /// Sweep the opposite side from its best level while prices cross.
    ///
    /// Every fill executes at the passive order's price. A fully consumed
    /// passive order leaves its level and the lookup in the same step.
    fn cross(&mut self, taker: &mut Order, limit: usize) {
        let Self {
            arena,
            bids,
            asks,
            order_map,
            trades,
            ..
        } = self;
        let passive = match taker.side {
            Side::Buy => asks,
            Side::Sell => bids,
        };

        while taker.remaining_volume > Decimal::ZERO {
            let Some(index) = passive.best() else {
                break; // No orders on opposite side
            };
            if !passive.crosses(index, limit) {
                break;
            }
            let Some(&maker) = passive.front(arena, index) else {
                break;
            };

            let volume = taker.remaining_volume.min(maker.remaining_volume);
            trades.push(TradeEvent {
                aggressor_owner_id: taker.owner_id,
                passive_owner_id: maker.owner_id,
                aggressor_order_id: taker.order_id,
                passive_order_id: maker.order_id,
                side: taker.side,
                price: maker.price,
                volume,
            });
            trace!(
                taker = taker.order_id,
                maker = maker.order_id,
                price = %maker.price,
                volume = %volume,
                "fill"
            );

            if taker.remaining_volume >= maker.remaining_volume {
                // Maker fully filled - remove from book
                taker.remaining_volume -= volume;
                passive.pop_front(arena, index);
                order_map.remove(&maker.order_id);
            } else {
                // Taker fully filled - maker keeps its place
                passive.fill_front(arena, index, volume);
                taker.remaining_volume = Decimal::ZERO;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BookConfig;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn book(capacity: u32) -> OrderBook {
        OrderBook::new(BookConfig::new(Decimal::ONE, dec(200), capacity)).unwrap()
    }

    #[test]
    fn test_place_bid_no_match() {
        let mut book = book(1000);

        let id = book.submit(100, dec(100), dec(100), Side::Buy).unwrap();

        assert_eq!(id, 0);
        assert!(book.trades().is_empty());
        assert_eq!(book.best_bid(), Some(dec(100)));
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.order_count(), 1);
    }

    #[test]
    fn test_order_ids_increase() {
        let mut book = book(1000);
        let ids: Vec<_> = (0..3)
            .map(|_| book.submit(1, dec(10), dec(1), Side::Sell).unwrap())
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(book.next_order_id(), 3);
    }

    #[test]
    fn test_full_match() {
        let mut book = book(1000);
        let ask = book.submit(100, dec(100), dec(100), Side::Sell).unwrap();
        let bid = book.submit(200, dec(100), dec(100), Side::Buy).unwrap();

        assert_eq!(
            book.trades(),
            &[TradeEvent {
                aggressor_owner_id: 200,
                passive_owner_id: 100,
                aggressor_order_id: bid,
                passive_order_id: ask,
                side: Side::Buy,
                price: dec(100),
                volume: dec(100),
            }]
        );

        // Both orders are gone, and so are their lookup entries
        assert!(book.is_empty());
        assert!(!book.contains_order(ask));
        assert!(!book.contains_order(bid));
        assert!(book.arena().is_empty());
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_partial_match_taker_rests() {
        let mut book = book(1000);
        book.submit(100, dec(100), dec(50), Side::Sell).unwrap();
        let bid = book.submit(200, dec(100), dec(100), Side::Buy).unwrap();

        assert_eq!(book.trades().len(), 1);
        assert_eq!(book.trades()[0].volume, dec(50));

        let resting = book.get_order(bid).unwrap();
        assert_eq!(resting.initial_volume, dec(100));
        assert_eq!(resting.remaining_volume, dec(50));
        assert_eq!(book.best_bid(), Some(dec(100)));
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_partial_match_maker_remains() {
        let mut book = book(1000);
        let ask = book.submit(100, dec(100), dec(100), Side::Sell).unwrap();
        let bid = book.submit(200, dec(100), dec(30), Side::Buy).unwrap();

        assert!(!book.contains_order(bid));
        assert_eq!(book.get_order(ask).unwrap().remaining_volume, dec(70));
        assert_eq!(book.depth_at(Side::Sell, dec(100)), (dec(70), 1));
    }

    #[test]
    fn test_price_time_priority() {
        let mut book = book(1000);
        book.submit(1, dec(50), dec(100), Side::Buy).unwrap();
        let second = book.submit(2, dec(50), dec(140), Side::Buy).unwrap();
        let third = book.submit(3, dec(50), dec(120), Side::Buy).unwrap();

        book.submit(9, dec(40), dec(130), Side::Sell).unwrap();

        let fills: Vec<_> = book
            .trades()
            .iter()
            .map(|t| (t.passive_owner_id, t.volume))
            .collect();
        assert_eq!(fills, vec![(1, dec(100)), (2, dec(30))]);
        assert!(book.trades().iter().all(|t| t.price == dec(50)));

        assert_eq!(book.get_order(second).unwrap().remaining_volume, dec(110));
        assert_eq!(book.get_order(third).unwrap().remaining_volume, dec(120));
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_price_improvement() {
        let mut book = OrderBook::new(BookConfig::new(Decimal::new(5, 1), dec(200), 10)).unwrap();
        book.submit(1, Decimal::new(400, 1), dec(50), Side::Sell).unwrap();
        book.submit(2, Decimal::new(450, 1), dec(50), Side::Buy).unwrap();

        assert_eq!(book.trades().len(), 1);
        assert_eq!(book.trades()[0].price, dec(40));
        assert!(book.is_empty());
    }

    #[test]
    fn test_match_multiple_levels() {
        let mut book = book(1000);
        book.submit(1, dec(102), dec(50), Side::Sell).unwrap();
        book.submit(1, dec(100), dec(50), Side::Sell).unwrap();
        book.submit(1, dec(101), dec(50), Side::Sell).unwrap();

        book.submit(2, dec(102), dec(120), Side::Buy).unwrap();

        let fills: Vec<_> = book.trades().iter().map(|t| (t.price, t.volume)).collect();
        assert_eq!(
            fills,
            vec![(dec(100), dec(50)), (dec(101), dec(50)), (dec(102), dec(20))]
        );
        assert_eq!(book.best_ask(), Some(dec(102)));
        assert_eq!(book.depth_at(Side::Sell, dec(102)), (dec(30), 1));
    }

    #[test]
    fn test_sell_sweeps_bids_downwards() {
        let mut book = book(1000);
        book.submit(1, dec(90), dec(10), Side::Buy).unwrap();
        book.submit(1, dec(98), dec(10), Side::Buy).unwrap();
        book.submit(1, dec(94), dec(10), Side::Buy).unwrap();

        book.submit(2, dec(93), dec(100), Side::Sell).unwrap();

        let prices: Vec<_> = book.trades().iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![dec(98), dec(94)]);
        assert_eq!(book.best_bid(), Some(dec(90)));
        assert_eq!(book.best_ask(), Some(dec(93)));
        assert_eq!(book.depth_at(Side::Sell, dec(93)), (dec(80), 1));
    }

    #[test]
    fn test_no_cross_rests() {
        let mut book = book(1000);
        book.submit(1, dec(101), dec(10), Side::Sell).unwrap();
        book.submit(2, dec(100), dec(10), Side::Buy).unwrap();

        assert!(book.trades().is_empty());
        assert_eq!(book.spread(), Some(dec(1)));
    }

    #[test]
    fn test_trades_reset_per_submit() {
        let mut book = book(1000);
        book.submit(1, dec(100), dec(10), Side::Sell).unwrap();
        book.submit(2, dec(100), dec(5), Side::Buy).unwrap();
        assert_eq!(book.trades().len(), 1);

        book.submit(3, dec(50), dec(5), Side::Buy).unwrap();
        assert!(book.trades().is_empty());
    }

    #[test]
    fn test_validation() {
        let mut book = book(1000);

        assert!(matches!(
            book.submit(1, dec(-1), dec(10), Side::Buy),
            Err(BookError::PriceOutOfRange { .. })
        ));
        assert!(matches!(
            book.submit(1, dec(200), dec(10), Side::Buy),
            Err(BookError::PriceOutOfRange { .. })
        ));
        assert!(matches!(
            book.submit(1, Decimal::ZERO, dec(10), Side::Buy),
            Err(BookError::InvalidOrder { .. })
        ));
        assert!(matches!(
            book.submit(1, dec(100), Decimal::ZERO, Side::Buy),
            Err(BookError::InvalidOrder { .. })
        ));
        assert!(matches!(
            book.submit(1, dec(100), dec(-5), Side::Sell),
            Err(BookError::InvalidOrder { .. })
        ));

        // Rejected submissions consume no id
        assert_eq!(book.next_order_id(), 0);
        assert!(book.is_empty());
    }

    #[test]
    fn test_level_total_overflow_rejected() {
        let mut book = book(1000);
        book.submit(1, dec(50), Decimal::MAX, Side::Buy).unwrap();

        let err = book.submit(2, dec(50), Decimal::MAX, Side::Buy).unwrap_err();
        assert_eq!(
            err,
            BookError::InvalidOrder {
                price: dec(50),
                volume: Decimal::MAX
            }
        );
        assert_eq!(book.next_order_id(), 1);
        assert_eq!(book.depth_at(Side::Buy, dec(50)), (Decimal::MAX, 1));

        // Another level, or the opposite side of the same price, is still open
        book.submit(2, dec(49), Decimal::MAX, Side::Buy).unwrap();
        book.submit(3, dec(50), dec(10), Side::Sell).unwrap();
        assert_eq!(book.trades()[0].volume, dec(10));
        assert_eq!(book.depth_at(Side::Buy, dec(50)).0, Decimal::MAX - dec(10));

        // Room freed by the fill is usable again
        book.submit(4, dec(50), dec(10), Side::Buy).unwrap();
        assert_eq!(book.depth_at(Side::Buy, dec(50)), (Decimal::MAX, 2));
    }

    #[test]
    fn test_timestamps_follow_accepted_events() {
        let mut book = book(1000);
        let a = book.submit(1, dec(100), dec(10), Side::Buy).unwrap();
        assert!(book.submit(1, dec(-1), dec(10), Side::Buy).is_err());
        book.cancel(a).unwrap();
        let b = book.submit(1, dec(100), dec(10), Side::Buy).unwrap();

        // Rejections leave the clock alone; cancels advance it
        assert_eq!(b, 1);
        assert_eq!(book.get_order(b).unwrap().timestamp, 2);
        assert_eq!(book.sequence(), 3);
    }

    #[test]
    fn test_book_full_keeps_fills() {
        let mut book = book(2);
        let a = book.submit(1, dec(100), dec(10), Side::Sell).unwrap();
        book.submit(1, dec(101), dec(10), Side::Sell).unwrap();

        // Fills 10 at 100, frees a slot, then the residual takes it
        let b = book.submit(2, dec(100), dec(15), Side::Buy).unwrap();
        assert!(!book.contains_order(a));
        assert!(book.contains_order(b));
        assert!(book.arena().is_full());

        // Residual of a non-crossing order has nowhere to go
        let err = book.submit(3, dec(50), dec(1), Side::Buy).unwrap_err();
        assert_eq!(
            err,
            BookError::OrderBookFull {
                order_id: 3,
                trades_executed: 0
            }
        );
        assert!(book.trades().is_empty());
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_full_book_still_matches() {
        let mut book = book(2);
        book.submit(1, dec(100), dec(5), Side::Buy).unwrap();
        book.submit(1, dec(150), dec(5), Side::Sell).unwrap();
        assert!(book.submit(1, dec(90), dec(5), Side::Buy).is_err());

        // Consuming the bid frees its slot before the residual needs one
        let id = book.submit(2, dec(100), dec(8), Side::Sell).unwrap();
        assert_eq!(book.trades().len(), 1);
        assert_eq!(book.get_order(id).unwrap().remaining_volume, dec(3));

        // Fully absorbed takers never need a slot
        book.submit(3, dec(120), dec(1), Side::Buy).unwrap();
        assert_eq!(book.trades()[0].volume, dec(1));
        assert_eq!(book.get_order(id).unwrap().remaining_volume, dec(2));
        assert_eq!(book.next_order_id(), 5);
    }
}
