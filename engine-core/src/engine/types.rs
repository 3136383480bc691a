use mimalloc::MiMalloc;
use serde::Serialize;

/// Global allocator.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// OrderId is the type used for order IDs.
pub type OrderId = u64;

/// Price is the type used for prices in the order book.
/// A non-negative fixed-point tick count; the engine does not interpret
/// any particular decimal scaling.
pub type Price = u64;

/// Quantity is the type used for order and trade sizes.
pub type Quantity = u64;

/// Side indicates the direction of the order.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

/// OrderType determines how an order is matched and whether it may rest.
///
/// Only `GoodTillCancel`, `FillAndKill` and `FillOrKill` have matching
/// behavior defined; `Market` is accepted by the wire schema but rejected by
/// the book (see `Order::new`).
#[derive(PartialEq, Eq, Copy, Clone, Debug, Serialize)]
pub enum OrderType {
    /// Rests on the book until matched or cancelled.
    GoodTillCancel,
    /// Takes whatever is immediately available, cancels the remainder.
    FillAndKill,
    /// Matches in full immediately or not at all.
    FillOrKill,
    /// Unsupported: no crossing price is specified.
    Market,
}

/// Errors that reject an order before it ever touches the book.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum OrderValidationError {
    #[error("quantity must be positive")]
    NonPositiveQuantity,
    #[error("price must be positive")]
    NonPositivePrice,
    #[error("order type has no defined matching behavior")]
    UnsupportedOrderType,
}

/// A single resting or incoming order.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Price,
    pub initial_qty: Quantity,
    pub remaining_qty: Quantity,
}

impl Order {
    /// Construct a new order, rejecting non-positive quantity or price up
    /// front.
    pub fn new(
        id: OrderId,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
    ) -> Result<Self, OrderValidationError> {
        if order_type == OrderType::Market {
            return Err(OrderValidationError::UnsupportedOrderType);
        }
        if quantity == 0 {
            return Err(OrderValidationError::NonPositiveQuantity);
        }
        if price == 0 {
            return Err(OrderValidationError::NonPositivePrice);
        }
        Ok(Self {
            id,
            side,
            order_type,
            price,
            initial_qty: quantity,
            remaining_qty: quantity,
        })
    }

    #[inline(always)]
    pub fn is_filled(&self) -> bool {
        self.remaining_qty == 0
    }

    /// Reduce the remaining quantity by `qty`, saturating at zero.
    /// `remaining_qty` is monotonically non-increasing.
    #[inline(always)]
    pub(crate) fn fill(&mut self, qty: Quantity) {
        self.remaining_qty = self.remaining_qty.saturating_sub(qty);
    }
}

/// A request to change the price and/or quantity of a resting order.
/// Applying a modify is cancel-then-add: it carries the original order's
/// type forward and loses time priority.
#[derive(Debug, Clone, Copy)]
pub struct OrderModify {
    pub id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

impl OrderModify {
    pub fn to_order(self, order_type: OrderType) -> Result<Order, OrderValidationError> {
        Order::new(self.id, self.side, order_type, self.price, self.quantity)
    }
}

/// One counterparty leg of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeInfo {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
}

/// A matched trade, recording both legs.
///
/// Each leg is recorded at its own order's stored price, not a single
/// "execution price" shared by both legs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trade {
    pub bid: TradeInfo,
    pub ask: TradeInfo,
}

/// Summed depth at a single price level, best-first, for snapshotting.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LevelInfo {
    pub price: Price,
    pub quantity: Quantity,
}

/// A read-only projection of the book: both sides, best price first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderBookLevelInfos {
    pub bids: Vec<LevelInfo>,
    pub asks: Vec<LevelInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_quantity() {
        let err = Order::new(1, Side::Buy, OrderType::GoodTillCancel, 150, 0).unwrap_err();
        assert_eq!(err, OrderValidationError::NonPositiveQuantity);
    }

    #[test]
    fn rejects_zero_price() {
        let err = Order::new(1, Side::Buy, OrderType::GoodTillCancel, 0, 100).unwrap_err();
        assert_eq!(err, OrderValidationError::NonPositivePrice);
    }

    #[test]
    fn rejects_market_orders() {
        let err = Order::new(1, Side::Buy, OrderType::Market, 150, 100).unwrap_err();
        assert_eq!(err, OrderValidationError::UnsupportedOrderType);
    }

    #[test]
    fn fill_is_monotonic() {
        let mut order = Order::new(1, Side::Buy, OrderType::GoodTillCancel, 150, 100).unwrap();
        order.fill(40);
        assert_eq!(order.remaining_qty, 60);
        order.fill(1000);
        assert_eq!(order.remaining_qty, 0);
        assert!(order.is_filled());
    }
}
