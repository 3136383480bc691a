mod common;

use common::*;
use engine_core::prelude::*;

#[test]
fn add_and_inspect() {
    let mut book = OrderBook::new();
    let trades = book.add_order(gtc(1, Side::Buy, 150, 100), &Allocation::Heap).unwrap();

    assert!(trades.is_empty());
    assert_eq!(book.size(), 1);
    let infos = book.order_infos();
    assert_eq!(prices(&infos.bids), vec![(150, 100)]);
    assert!(infos.asks.is_empty());
}

#[test]
fn cancel_empties_the_book() {
    let mut book = OrderBook::new();
    book.add_order(gtc(1, Side::Buy, 150, 100), &Allocation::Heap).unwrap();
    book.cancel(1);

    assert_eq!(book.size(), 0);
    let infos = book.order_infos();
    assert!(infos.bids.is_empty());
    assert!(infos.asks.is_empty());
}

#[test]
fn price_priority_orders_bids_best_first() {
    let mut book = OrderBook::new();
    book.add_order(gtc(1, Side::Buy, 150, 100), &Allocation::Heap).unwrap();
    book.add_order(gtc(2, Side::Buy, 151, 100), &Allocation::Heap).unwrap();

    let infos = book.order_infos();
    assert_eq!(prices(&infos.bids), vec![(151, 100), (150, 100)]);
}

#[test]
fn exact_cross_removes_both_orders() {
    let mut book = OrderBook::new();
    book.add_order(gtc(1, Side::Sell, 150, 100), &Allocation::Heap).unwrap();
    let trades = book.add_order(gtc(2, Side::Buy, 150, 100), &Allocation::Heap).unwrap();

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].bid.quantity, 100);
    assert_eq!(trades[0].ask.quantity, 100);
    assert_eq!(book.size(), 0);
}

#[test]
fn partial_fill_leaves_remainder_resting() {
    let mut book = OrderBook::new();
    book.add_order(gtc(1, Side::Sell, 150, 1000), &Allocation::Heap).unwrap();
    let trades = book.add_order(gtc(2, Side::Buy, 150, 100), &Allocation::Heap).unwrap();

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].bid.quantity, 100);
    assert_eq!(book.size(), 1);
    let infos = book.order_infos();
    assert_eq!(prices(&infos.asks), vec![(150, 900)]);
}

#[test]
fn walk_the_book_across_two_levels() {
    let mut book = OrderBook::new();
    book.add_order(gtc(1, Side::Sell, 150, 100), &Allocation::Heap).unwrap();
    book.add_order(gtc(2, Side::Sell, 151, 100), &Allocation::Heap).unwrap();
    let trades = book.add_order(gtc(3, Side::Buy, 155, 200), &Allocation::Heap).unwrap();

    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].ask.price, 150);
    assert_eq!(trades[1].ask.price, 151);
    assert_eq!(book.size(), 0);
}

#[test]
fn no_crossing_price_leaves_both_sides_resting() {
    let mut book = OrderBook::new();
    book.add_order(gtc(1, Side::Sell, 105, 10), &Allocation::Heap).unwrap();
    let trades = book.add_order(gtc(2, Side::Buy, 100, 10), &Allocation::Heap).unwrap();

    assert!(trades.is_empty());
    assert_eq!(book.size(), 2);
}

#[test]
fn price_tie_preserves_arrival_order() {
    let mut book = OrderBook::new();
    book.add_order(gtc(1, Side::Sell, 100, 5), &Allocation::Heap).unwrap();
    book.add_order(gtc(2, Side::Sell, 100, 5), &Allocation::Heap).unwrap();
    let trades = book.add_order(gtc(3, Side::Buy, 100, 5), &Allocation::Heap).unwrap();

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].ask.order_id, 1, "earlier order at the same price fills first");
    assert_eq!(book.side_of(2), Some(Side::Sell));
}
