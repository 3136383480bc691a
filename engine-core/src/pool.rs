//! Fixed-capacity lock-free object pool.
//!
//! The free list is an intrusive singly-linked chain threaded through the
//! slots themselves, with the head stored as a tagged `(index, generation)`
//! pair packed into one `AtomicU64` and advanced with a single-word CAS.
//! The generation counter increments on every successful pop or push, so a
//! concurrent pop-then-push that reuses the same index can't be mistaken
//! for "no change" by a CAS loop that captured the index alone.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::types::Order;

const NULL_INDEX: u32 = u32::MAX;

/// Packs a slot index and generation counter into one CAS-able word.
#[derive(Clone, Copy, PartialEq, Eq)]
struct TaggedHead {
    index: u32,
    generation: u32,
}

impl TaggedHead {
    fn pack(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    fn unpack(word: u64) -> Self {
        TaggedHead {
            index: (word & 0xFFFF_FFFF) as u32,
            generation: (word >> 32) as u32,
        }
    }
}

struct Slot<T> {
    /// `Some` while the slot holds a live value; while free, its bit
    /// pattern is reused to store the index of the next free slot.
    value: Option<T>,
    next_free: u32,
}

/// A fixed-capacity, lock-free free-list allocator.
///
/// `acquire`/`release` are safe to call from any number of concurrent
/// threads. Capacity is fixed at construction; exhaustion is reported back
/// to the caller, not a panic here.
pub struct FixedSizePool<T> {
    slots: Box<[UnsafeCell<Slot<T>>]>,
    head: AtomicU64,
    capacity: usize,
}

// SAFETY: access to `slots[i].value` is only ever performed by the thread
// that currently owns index `i` (either the allocator returning a freshly
// acquired slot, or the caller about to release one); the free-list
// metadata itself (`next_free`, `head`) is protected by the CAS loop below.
unsafe impl<T: Send> Sync for FixedSizePool<T> {}

impl<T> FixedSizePool<T> {
    /// Build a pool with `capacity` slots, all initially free.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "pool capacity must be positive");
        assert!(capacity < NULL_INDEX as usize, "pool capacity too large");

        let mut slots = Vec::with_capacity(capacity);
        for i in 0..capacity {
            let next_free = if i + 1 == capacity {
                NULL_INDEX
            } else {
                (i + 1) as u32
            };
            slots.push(UnsafeCell::new(Slot {
                value: None,
                next_free,
            }));
        }

        Self {
            slots: slots.into_boxed_slice(),
            head: AtomicU64::new(TaggedHead { index: 0, generation: 0 }.pack()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take ownership of a free slot and store `value` in it, returning its
    /// index. Returns `value` back on exhaustion so the caller can decide
    /// how to surface it.
    pub fn acquire(&self, value: T) -> Result<u32, T> {
        loop {
            let current = TaggedHead::unpack(self.head.load(Ordering::Acquire));
            if current.index == NULL_INDEX {
                return Err(value);
            }

            // SAFETY: `current.index` was read from the free-list head; no
            // other thread can be concurrently mutating this particular
            // free slot's `next_free` field because only the list head
            // (protected by the CAS below) grants access to it.
            let next_free = unsafe { (*self.slots[current.index as usize].get()).next_free };

            let new_head = TaggedHead {
                index: next_free,
                generation: current.generation.wrapping_add(1),
            };

            if self
                .head
                .compare_exchange_weak(
                    current.pack(),
                    new_head.pack(),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                let slot = unsafe { &mut *self.slots[current.index as usize].get() };
                slot.value = Some(value);
                return Ok(current.index);
            }
        }
    }

    /// Return the slot at `index` to the free list, yielding the value that
    /// was stored in it.
    ///
    /// # Panics
    /// Panics if `index` is out of range or the slot was not occupied; both
    /// indicate a caller bug (double free or use of a stale handle).
    pub fn release(&self, index: u32) -> T {
        let value = {
            let slot = unsafe { &mut *self.slots[index as usize].get() };
            slot.value.take().expect("release of an unoccupied pool slot")
        };

        loop {
            let current = TaggedHead::unpack(self.head.load(Ordering::Acquire));
            {
                let slot = unsafe { &mut *self.slots[index as usize].get() };
                slot.next_free = current.index;
            }

            let new_head = TaggedHead {
                index,
                generation: current.generation.wrapping_add(1),
            };

            if self
                .head
                .compare_exchange_weak(
                    current.pack(),
                    new_head.pack(),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return value;
            }
        }
    }

    /// Borrow the value currently stored at `index`.
    ///
    /// # Panics
    /// Panics if the slot is not occupied.
    pub fn get(&self, index: u32) -> &T {
        let slot = unsafe { &*self.slots[index as usize].get() };
        slot.value.as_ref().expect("get of an unoccupied pool slot")
    }

    /// Mutably borrow the value currently stored at `index`.
    ///
    /// # Safety
    /// The caller must ensure no other reference (shared or mutable) to this
    /// slot's value is alive concurrently. In this crate that is upheld by
    /// the order book's single-owner-thread (queued mode) or mutex
    /// (sync mode) discipline around all pool-backed order mutation.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self, index: u32) -> &mut T {
        let slot = unsafe { &mut *self.slots[index as usize].get() };
        slot.value.as_mut().expect("get_mut of an unoccupied pool slot")
    }

    /// Number of slots currently free. Free-list length plus live-value
    /// count always equals pool capacity.
    #[cfg(test)]
    fn free_len(&self) -> usize {
        let mut count = 0;
        let mut current = TaggedHead::unpack(self.head.load(Ordering::Acquire)).index;
        while current != NULL_INDEX {
            count += 1;
            current = unsafe { (*self.slots[current as usize].get()).next_free };
        }
        count
    }
}

/// A pool specialized to hold resting/incoming orders.
pub type OrderPool = FixedSizePool<Order>;

/// There is no sensible per-order recovery from exhaustion; the caller is
/// expected to log it and shut the engine down.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
#[error("order pool exhausted")]
pub struct PoolExhausted;

/// Owns an `Order` either on the heap or inside a `FixedSizePool`, erasing
/// the difference from the order book's point of view.
///
/// The pooled variant releases its slot automatically on drop.
pub enum OrderHandle {
    Heap(Box<Order>),
    Pooled { pool: Arc<OrderPool>, index: u32 },
}

impl OrderHandle {
    pub fn heap(order: Order) -> Self {
        OrderHandle::Heap(Box::new(order))
    }

    pub fn pooled(pool: Arc<OrderPool>, order: Order) -> Result<Self, PoolExhausted> {
        match pool.acquire(order) {
            Ok(index) => Ok(OrderHandle::Pooled { pool, index }),
            Err(_order) => Err(PoolExhausted),
        }
    }
}

impl Deref for OrderHandle {
    type Target = Order;

    fn deref(&self) -> &Order {
        match self {
            OrderHandle::Heap(order) => order,
            OrderHandle::Pooled { pool, index } => pool.get(*index),
        }
    }
}

impl DerefMut for OrderHandle {
    fn deref_mut(&mut self) -> &mut Order {
        match self {
            OrderHandle::Heap(order) => order,
            // SAFETY: `&mut self` guarantees exclusive access to this
            // handle, and a pool index is never shared between handles.
            OrderHandle::Pooled { pool, index } => unsafe { pool.get_mut(*index) },
        }
    }
}

impl Drop for OrderHandle {
    fn drop(&mut self) {
        if let OrderHandle::Pooled { pool, index } = self {
            pool.release(*index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn acquire_and_release_round_trip() {
        let pool: FixedSizePool<u64> = FixedSizePool::new(4);
        assert_eq!(pool.free_len(), 4);

        let a = pool.acquire(10).unwrap();
        let b = pool.acquire(20).unwrap();
        assert_eq!(pool.free_len(), 2);
        assert_eq!(*pool.get(a), 10);
        assert_eq!(*pool.get(b), 20);

        assert_eq!(pool.release(a), 10);
        assert_eq!(pool.free_len(), 3);
    }

    #[test]
    fn exhaustion_returns_value_back() {
        let pool: FixedSizePool<u64> = FixedSizePool::new(1);
        let idx = pool.acquire(1).unwrap();
        let err = pool.acquire(2).unwrap_err();
        assert_eq!(err, 2);
        pool.release(idx);
        assert!(pool.acquire(3).is_ok());
    }

    #[test]
    #[should_panic(expected = "unoccupied")]
    fn double_release_panics() {
        let pool: FixedSizePool<u64> = FixedSizePool::new(1);
        let idx = pool.acquire(1).unwrap();
        pool.release(idx);
        pool.release(idx);
    }

    #[test]
    fn capacity_invariant_holds_under_concurrency() {
        let capacity = 64;
        let pool = Arc::new(FixedSizePool::<u64>::new(capacity));
        let mut handles = Vec::new();

        for t in 0..8u64 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                let mut held = Vec::new();
                for i in 0..1000u64 {
                    if let Ok(idx) = pool.acquire(t * 1000 + i) {
                        held.push(idx);
                    }
                    if held.len() > 4 {
                        let idx = held.remove(0);
                        pool.release(idx);
                    }
                }
                for idx in held {
                    pool.release(idx);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(pool.free_len(), capacity);
    }
}
