use std::sync::Arc;

use super::book::OrderBook;
use super::error::{AddOrderError, RejectReason};
use super::types::{Order, OrderModify, OrderType, Trade, TradeInfo};
use crate::pool::{OrderHandle, OrderPool};

/// Where a freshly accepted order's backing storage comes from.
#[derive(Clone)]
pub enum Allocation {
    Heap,
    Pooled(Arc<OrderPool>),
}

impl Allocation {
    fn handle(&self, order: Order) -> Result<OrderHandle, AddOrderError> {
        match self {
            Allocation::Heap => Ok(OrderHandle::heap(order)),
            Allocation::Pooled(pool) => Ok(OrderHandle::pooled(Arc::clone(pool), order)?),
        }
    }
}

impl OrderBook {
    /// Accept a new order: reject duplicates and unmatchable FAK/FOK orders
    /// up front, then insert and run the match loop. `FillOrKill` additionally
    /// requires aggregate opposing liquidity to cover the full quantity
    /// before it is allowed to rest or match at all.
    pub fn add_order(&mut self, order: Order, alloc: &Allocation) -> Result<Vec<Trade>, AddOrderError> {
        if self.contains(order.id) {
            return Err(RejectReason::DuplicateOrderId.into());
        }

        let taking = matches!(order.order_type, OrderType::FillAndKill | OrderType::FillOrKill);
        if taking && !self.can_match(order.side, order.price) {
            return Err(RejectReason::Unmatchable.into());
        }

        if order.order_type == OrderType::FillOrKill
            && self.available_liquidity(order.side, order.price) < order.remaining_qty
        {
            return Err(RejectReason::InsufficientLiquidity.into());
        }

        let handle = alloc.handle(order)?;
        self.insert(handle);
        Ok(self.match_orders())
    }

    /// Cancel-then-add, carrying the original order's type forward and
    /// losing its place in time priority. A reference to an unknown id is a
    /// no-op.
    pub fn modify_order(
        &mut self,
        modify: OrderModify,
        alloc: &Allocation,
    ) -> Result<Vec<Trade>, AddOrderError> {
        let Some(side) = self.side_of(modify.id) else {
            return Ok(Vec::new());
        };
        debug_assert_eq!(side, modify.side, "OrderModify.side must match the resting order");

        let order_type = self.order_type_of(modify.id).expect("checked by side_of");
        self.cancel(modify.id);
        let order = modify
            .to_order(order_type)
            .expect("resting orders are always validly constructed");
        self.add_order(order, alloc)
    }

    /// Drain crossing liquidity between the best bid and best ask,
    /// repeatedly, until the book no longer crosses.
    ///
    /// An outer loop re-checks the best-of-book prices after every inner
    /// round (a level can empty out and expose the next one); an inner
    /// loop matches front-of-queue against front-of-queue until one side's
    /// level drains. After the inner loop drains, any `FillAndKill` now
    /// sitting at the top of either side (it could only partially fill) is
    /// cancelled.
    fn match_orders(&mut self) -> Vec<Trade> {
        let mut trades = Vec::new();

        while self.top_of_book_crosses() {
            let (bid_price, ask_price, filled_ids) = {
                let (bid_price, ask_price, bids, asks) =
                    self.best_pair_mut().expect("top_of_book_crosses just confirmed both sides non-empty");
                let mut filled_ids = Vec::new();

                while !bids.is_empty() && !asks.is_empty() {
                    let bid = bids.front_mut().expect("non-empty");
                    let ask = asks.front_mut().expect("non-empty");

                    let quantity = bid.remaining_qty.min(ask.remaining_qty);
                    bid.fill(quantity);
                    ask.fill(quantity);

                    trades.push(Trade {
                        bid: TradeInfo {
                            order_id: bid.id,
                            price: bid.price,
                            quantity,
                        },
                        ask: TradeInfo {
                            order_id: ask.id,
                            price: ask.price,
                            quantity,
                        },
                    });

                    if bid.is_filled() {
                        filled_ids.push(bids.pop_front().expect("non-empty").id);
                    }
                    if ask.is_filled() {
                        filled_ids.push(asks.pop_front().expect("non-empty").id);
                    }
                }

                (bid_price, ask_price, filled_ids)
            };

            for id in filled_ids {
                self.drop_id(id);
            }
            self.prune_empty_bid(std::cmp::Reverse(bid_price));
            self.prune_empty_ask(ask_price);

            if let Some(id) = self.top_of_book_fak(super::types::Side::Buy) {
                self.cancel(id);
            }
            if let Some(id) = self.top_of_book_fak(super::types::Side::Sell) {
                self.cancel(id);
            }
        }

        trades
    }

    fn top_of_book_fak(&mut self, side: super::types::Side) -> Option<super::types::OrderId> {
        match side {
            super::types::Side::Buy => {
                let (_, bids) = self.best_bid_level()?;
                let order = bids.front()?;
                (order.order_type == OrderType::FillAndKill).then_some(order.id)
            }
            super::types::Side::Sell => {
                let (_, asks) = self.best_ask_level()?;
                let order = asks.front()?;
                (order.order_type == OrderType::FillAndKill).then_some(order.id)
            }
        }
    }
}
