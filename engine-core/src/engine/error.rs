/// Reasons `AddOrder` can silently reject an incoming order. None of these
/// are propagated as hard errors; the caller simply observes an empty
/// trade vector and the order absent from the book.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// `order.id` was already present in the index.
    DuplicateOrderId,
    /// `FillAndKill`/`FillOrKill` found no crossing opposing level.
    Unmatchable,
    /// `FillOrKill` could not be covered by aggregate opposing liquidity.
    InsufficientLiquidity,
}

/// Outcome of attempting to add an order to the book: either a silent
/// rejection or pool exhaustion, which is fatal.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddOrderError {
    #[error("order rejected: {0:?}")]
    Rejected(RejectReason),
    #[error(transparent)]
    PoolExhausted(#[from] crate::pool::PoolExhausted),
}

impl From<RejectReason> for AddOrderError {
    fn from(reason: RejectReason) -> Self {
        AddOrderError::Rejected(reason)
    }
}
