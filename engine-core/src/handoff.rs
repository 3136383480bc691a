//! Bounded handoff queue decoupling network ingress from the single
//! matching thread in "queued" threading mode.
//!
//! Backed by `crossbeam::queue::ArrayQueue`, a bounded lock-free MPMC ring
//! buffer; this crate only ever has many producers (network workers) and
//! one consumer (the matching thread), but the ring itself doesn't care.

use crossbeam::queue::ArrayQueue;

use crate::wire::WireMessage;

/// A fixed-capacity queue of decoded wire messages awaiting the matching
/// thread. `push` never blocks: a full queue means the matching thread is
/// behind, and the caller is expected to spin-yield rather than apply
/// backpressure to the network reader.
pub struct HandoffQueue {
    inner: ArrayQueue<WireMessage>,
}

impl HandoffQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ArrayQueue::new(capacity),
        }
    }

    /// Attempt to enqueue `message`, returning it back if the queue is full.
    pub fn try_push(&self, message: WireMessage) -> Result<(), WireMessage> {
        self.inner.push(message)
    }

    /// Spin-yield until there is room, then enqueue.
    pub fn push_blocking(&self, mut message: WireMessage) {
        loop {
            match self.inner.push(message) {
                Ok(()) => return,
                Err(rejected) => {
                    message = rejected;
                    std::thread::yield_now();
                }
            }
        }
    }

    pub fn try_pop(&self) -> Option<WireMessage> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
