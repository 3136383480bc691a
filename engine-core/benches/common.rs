use engine_core::prelude::*;

/// Quickly build a resting limit order for benchmarking.
pub fn limit_order(id: u64, side: Side, price: u64, qty: u64) -> Order {
    Order::new(id, side, OrderType::GoodTillCancel, price, qty).unwrap()
}
