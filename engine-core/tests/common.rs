use engine_core::prelude::*;

/// Quickly build a `GoodTillCancel` limit order for scenario tests.
pub fn gtc(id: u64, side: Side, price: u64, qty: u64) -> Order {
    Order::new(id, side, OrderType::GoodTillCancel, price, qty).unwrap()
}

pub fn fak(id: u64, side: Side, price: u64, qty: u64) -> Order {
    Order::new(id, side, OrderType::FillAndKill, price, qty).unwrap()
}

pub fn fok(id: u64, side: Side, price: u64, qty: u64) -> Order {
    Order::new(id, side, OrderType::FillOrKill, price, qty).unwrap()
}

pub fn prices(levels: &[LevelInfo]) -> Vec<(u64, u64)> {
    levels.iter().map(|l| (l.price, l.quantity)).collect()
}
