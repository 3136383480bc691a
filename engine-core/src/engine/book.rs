use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, VecDeque};

use super::types::{LevelInfo, OrderBookLevelInfos, OrderId, OrderType, Price, Side};
use crate::pool::OrderHandle;

/// Price-time-priority limit order book for a single symbol.
///
/// Bids are keyed by `Reverse<Price>` so the best (highest) bid sorts first
/// in the `BTreeMap`'s iteration order; asks are keyed by `Price` directly
/// so the best (lowest) ask sorts first. Each price level is a `VecDeque`
/// of handles in arrival order, giving FIFO matching within a level.
///
/// Cancellation is O(log P) to find the level plus O(depth-at-that-price) to
/// splice the handle out of the level's queue.
pub struct OrderBook {
    bids: BTreeMap<Reverse<Price>, VecDeque<OrderHandle>>,
    asks: BTreeMap<Price, VecDeque<OrderHandle>>,
    index: HashMap<OrderId, (Side, Price, OrderType)>,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    /// True if an order on `side` at `price` would find a crossing
    /// counterparty right now.
    pub fn can_match(&self, side: Side, price: Price) -> bool {
        match side {
            Side::Buy => self.asks.keys().next().is_some_and(|&best_ask| price >= best_ask),
            Side::Sell => self
                .bids
                .keys()
                .next()
                .is_some_and(|&Reverse(best_bid)| price <= best_bid),
        }
    }

    /// Aggregate resting quantity available to cross against `side` at or
    /// better than `price`, used by `FillOrKill`'s all-or-nothing precheck.
    pub fn available_liquidity(&self, side: Side, price: Price) -> u64 {
        match side {
            Side::Buy => self
                .asks
                .range(..=price)
                .flat_map(|(_, level)| level.iter())
                .map(|handle| handle.remaining_qty)
                .sum(),
            Side::Sell => self
                .bids
                .range(..=Reverse(price))
                .flat_map(|(_, level)| level.iter())
                .map(|handle| handle.remaining_qty)
                .sum(),
        }
    }

    /// Insert an already-validated handle into its resting level, recording
    /// it in the id index. Callers are responsible for rejection checks
    /// (duplicate id, FillAndKill/FillOrKill matchability) before calling
    /// this; matching itself lives in `super::matching`.
    pub(crate) fn insert(&mut self, handle: OrderHandle) {
        let id = handle.id;
        let side = handle.side;
        let price = handle.price;
        let order_type = handle.order_type;
        match side {
            Side::Buy => self.bids.entry(Reverse(price)).or_default().push_back(handle),
            Side::Sell => self.asks.entry(price).or_default().push_back(handle),
        }
        self.index.insert(id, (side, price, order_type));
    }

    pub(crate) fn best_bid_level(&mut self) -> Option<(&Reverse<Price>, &mut VecDeque<OrderHandle>)> {
        self.bids.iter_mut().next()
    }

    pub(crate) fn best_ask_level(&mut self) -> Option<(&Price, &mut VecDeque<OrderHandle>)> {
        self.asks.iter_mut().next()
    }

    /// True when the best bid meets or exceeds the best ask.
    pub(crate) fn top_of_book_crosses(&self) -> bool {
        match (self.bids.keys().next(), self.asks.keys().next()) {
            (Some(&Reverse(bid)), Some(&ask)) => bid >= ask,
            _ => false,
        }
    }

    /// Mutable access to both top-of-book levels at once, via disjoint field
    /// borrows. Used by the inner matching loop, which needs to mutate both
    /// sides' front handles in the same step.
    pub(crate) fn best_pair_mut(
        &mut self,
    ) -> Option<(Price, Price, &mut VecDeque<OrderHandle>, &mut VecDeque<OrderHandle>)> {
        let (&Reverse(bid_price), bids) = self.bids.iter_mut().next()?;
        let (&ask_price, asks) = self.asks.iter_mut().next()?;
        Some((bid_price, ask_price, bids, asks))
    }

    pub(crate) fn drop_id(&mut self, id: OrderId) {
        self.index.remove(&id);
    }

    pub(crate) fn prune_empty_bid(&mut self, price: Reverse<Price>) {
        if self.bids.get(&price).is_some_and(VecDeque::is_empty) {
            self.bids.remove(&price);
        }
    }

    pub(crate) fn prune_empty_ask(&mut self, price: Price) {
        if self.asks.get(&price).is_some_and(VecDeque::is_empty) {
            self.asks.remove(&price);
        }
    }

    /// Remove a resting order by id, no-op if unknown.
    pub fn cancel(&mut self, order_id: OrderId) {
        let Some((side, price, _)) = self.index.remove(&order_id) else {
            return;
        };
        match side {
            Side::Buy => {
                if let Some(level) = self.bids.get_mut(&Reverse(price)) {
                    level.retain(|handle| handle.id != order_id);
                    if level.is_empty() {
                        self.bids.remove(&Reverse(price));
                    }
                }
            }
            Side::Sell => {
                if let Some(level) = self.asks.get_mut(&price) {
                    level.retain(|handle| handle.id != order_id);
                    if level.is_empty() {
                        self.asks.remove(&price);
                    }
                }
            }
        }
    }

    /// Total number of live resting orders.
    pub fn size(&self) -> usize {
        self.index.len()
    }

    /// Side of a live order, used to validate `OrderModify.side` matches the
    /// resting order.
    pub fn side_of(&self, order_id: OrderId) -> Option<Side> {
        self.index.get(&order_id).map(|&(side, ..)| side)
    }

    /// Order type of a live order, used by `ModifyOrder` to carry it
    /// forward into the replacement order.
    pub fn order_type_of(&self, order_id: OrderId) -> Option<OrderType> {
        self.index.get(&order_id).map(|&(_, _, order_type)| order_type)
    }

    /// Snapshot the book as summed depth per price level, best-first on
    /// each side.
    pub fn order_infos(&self) -> OrderBookLevelInfos {
        let bids = self
            .bids
            .iter()
            .map(|(&Reverse(price), level)| LevelInfo {
                price,
                quantity: level.iter().map(|h| h.remaining_qty).sum(),
            })
            .collect();
        let asks = self
            .asks
            .iter()
            .map(|(&price, level)| LevelInfo {
                price,
                quantity: level.iter().map(|h| h.remaining_qty).sum(),
            })
            .collect();
        OrderBookLevelInfos { bids, asks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Order, OrderType};

    fn gtc(id: OrderId, side: Side, price: Price, qty: u64) -> OrderHandle {
        OrderHandle::heap(Order::new(id, side, OrderType::GoodTillCancel, price, qty).unwrap())
    }

    #[test]
    fn insert_and_inspect() {
        let mut book = OrderBook::new();
        book.insert(gtc(1, Side::Buy, 100, 10));
        book.insert(gtc(2, Side::Sell, 105, 5));

        assert_eq!(book.size(), 2);
        let infos = book.order_infos();
        assert_eq!(infos.bids.len(), 1);
        assert_eq!(infos.asks.len(), 1);
        assert_eq!(infos.bids[0].price, 100);
        assert_eq!(infos.asks[0].price, 105);
    }

    #[test]
    fn cancel_removes_order_and_empty_level() {
        let mut book = OrderBook::new();
        book.insert(gtc(1, Side::Buy, 100, 10));
        book.cancel(1);
        assert_eq!(book.size(), 0);
        assert!(book.order_infos().bids.is_empty());
    }

    #[test]
    fn cancel_unknown_id_is_noop() {
        let mut book = OrderBook::new();
        book.insert(gtc(1, Side::Buy, 100, 10));
        book.cancel(999);
        assert_eq!(book.size(), 1);
    }

    #[test]
    fn bids_sort_best_first_descending() {
        let mut book = OrderBook::new();
        book.insert(gtc(1, Side::Buy, 100, 10));
        book.insert(gtc(2, Side::Buy, 110, 10));
        book.insert(gtc(3, Side::Buy, 105, 10));

        let infos = book.order_infos();
        let prices: Vec<_> = infos.bids.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![110, 105, 100]);
    }

    #[test]
    fn can_match_checks_best_opposing_price() {
        let mut book = OrderBook::new();
        book.insert(gtc(1, Side::Sell, 100, 10));
        assert!(book.can_match(Side::Buy, 100));
        assert!(book.can_match(Side::Buy, 150));
        assert!(!book.can_match(Side::Buy, 99));
    }
}
