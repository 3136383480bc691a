//! TCP ingress: a blocking-accept loop with a detached reader thread per
//! client connection. No async runtime, one OS thread per connection.

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::book::OrderBook;
use crate::engine::matching::Allocation;
use crate::handoff::HandoffQueue;
use crate::metrics::Counters;
use crate::snapshot;
use crate::wire::{Decoder, WireMessage, new_order_from_wire};

pub const READ_BUF_SIZE: usize = 65536;
pub const SNAPSHOT_EVERY: u64 = 250_000;

/// Where a network worker hands a decoded message off to, one of the two
/// `<threading>` CLI modes.
#[derive(Clone)]
pub enum Dispatch {
    /// Enqueue for the single matching thread to drain.
    Queue(Arc<HandoffQueue>),
    /// Apply directly, serialized by a mutex around the shared book.
    Sync {
        book: Arc<Mutex<OrderBook>>,
        alloc: Allocation,
        snapshot_dir: Arc<PathBuf>,
    },
}

/// Accept connections until `running` is cleared, spawning one detached
/// thread per client.
pub fn accept_loop(listener: TcpListener, running: Arc<AtomicBool>, counters: Arc<Counters>, dispatch: Dispatch) {
    for stream in listener.incoming() {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        match stream {
            Ok(stream) => {
                let running = Arc::clone(&running);
                let counters = Arc::clone(&counters);
                let dispatch = dispatch.clone();
                std::thread::spawn(move || handle_client(stream, running, counters, dispatch));
            }
            Err(err) => {
                tracing::warn!(?err, "accept error");
                continue;
            }
        }
    }
}

fn handle_client(mut stream: TcpStream, running: Arc<AtomicBool>, counters: Arc<Counters>, dispatch: Dispatch) {
    let peer = stream.peer_addr().ok();
    tracing::info!(?peer, "client connected");

    let mut decoder = Decoder::new();
    let mut buf = [0u8; READ_BUF_SIZE];

    while running.load(Ordering::Relaxed) {
        let n = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                tracing::warn!(?err, ?peer, "client read error");
                break;
            }
        };

        let messages = match decoder.push(&buf[..n]) {
            Ok(messages) => messages,
            Err(err) => {
                tracing::warn!(?err, ?peer, "protocol error, dropping connection");
                break;
            }
        };

        for message in messages {
            counters.network_received.fetch_add(1, Ordering::Relaxed);
            match &dispatch {
                Dispatch::Queue(queue) => queue.push_blocking(message),
                Dispatch::Sync { book, alloc, snapshot_dir } => {
                    apply_and_maybe_snapshot(message, book, alloc, &counters, snapshot_dir);
                }
            }
        }
    }

    tracing::info!(?peer, "client disconnected");
}

/// Apply one decoded wire message to the book. Unknown side bytes and
/// invalid order fields are client-protocol errors: logged and dropped,
/// never propagated.
pub fn apply_message(book: &mut OrderBook, alloc: &Allocation, message: WireMessage) {
    match message {
        WireMessage::New(msg) => {
            let Some(side) = msg.side() else {
                tracing::warn!(order_id = msg.order_id, "unknown side byte, dropping order");
                return;
            };
            match new_order_from_wire(&msg, side) {
                Ok(order) => {
                    if let Err(err) = book.add_order(order, alloc) {
                        tracing::debug!(?err, order_id = msg.order_id, "order rejected");
                    }
                }
                Err(err) => tracing::warn!(?err, order_id = msg.order_id, "invalid order fields"),
            }
        }
        WireMessage::Cancel(msg) => book.cancel(msg.order_id),
    }
}

fn apply_and_maybe_snapshot(
    message: WireMessage,
    book: &Mutex<OrderBook>,
    alloc: &Allocation,
    counters: &Counters,
    snapshot_dir: &Path,
) {
    {
        let mut book = book.lock().expect("order book mutex poisoned");
        apply_message(&mut book, alloc, message);
    }

    let prev = counters.engine_processed.fetch_add(1, Ordering::Relaxed);
    if (prev + 1) % SNAPSHOT_EVERY == 0 {
        let infos = book.lock().expect("order book mutex poisoned").order_infos();
        if let Err(err) = snapshot::write_snapshot(snapshot_dir, &infos) {
            tracing::warn!(?err, "failed to write book_state.json");
        }
    }
}

/// Queued-mode matching thread: drain the handoff queue and apply messages
/// one at a time, yielding the thread when the queue is momentarily empty.
pub fn run_engine_loop(
    book: &Mutex<OrderBook>,
    alloc: &Allocation,
    queue: &HandoffQueue,
    counters: &Counters,
    running: &AtomicBool,
    snapshot_dir: &Path,
) {
    while running.load(Ordering::Relaxed) {
        match queue.try_pop() {
            Some(message) => apply_and_maybe_snapshot(message, book, alloc, counters, snapshot_dir),
            None => std::thread::yield_now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::CancelOrderMsg;

    #[test]
    fn apply_message_inserts_a_new_order() {
        let mut book = OrderBook::new();
        let wire_order = crate::wire::NewOrderMsg {
            timestamp: 0,
            order_id: 1,
            price: 100,
            quantity: 10,
            side: 0,
            symbol: [0; 8],
        };
        apply_message(&mut book, &Allocation::Heap, WireMessage::New(wire_order));
        assert_eq!(book.size(), 1);
    }

    #[test]
    fn apply_message_cancels_an_order() {
        let mut book = OrderBook::new();
        let wire_order = crate::wire::NewOrderMsg {
            timestamp: 0,
            order_id: 1,
            price: 100,
            quantity: 10,
            side: 0,
            symbol: [0; 8],
        };
        apply_message(&mut book, &Allocation::Heap, WireMessage::New(wire_order));
        apply_message(&mut book, &Allocation::Heap, WireMessage::Cancel(CancelOrderMsg { order_id: 1 }));
        assert_eq!(book.size(), 0);
    }

    #[test]
    fn apply_message_drops_unknown_side_byte() {
        let mut book = OrderBook::new();
        let wire_order = crate::wire::NewOrderMsg {
            timestamp: 0,
            order_id: 1,
            price: 100,
            quantity: 10,
            side: 9,
            symbol: [0; 8],
        };
        apply_message(&mut book, &Allocation::Heap, WireMessage::New(wire_order));
        assert_eq!(book.size(), 0);
    }

    #[test]
    fn run_engine_loop_drains_queue_then_exits_when_running_clears() {
        let book = Mutex::new(OrderBook::new());
        let queue = HandoffQueue::new(8);
        let counters = Counters::default();
        let dir = tempfile::tempdir().unwrap();
        let running = AtomicBool::new(true);

        queue.try_push(WireMessage::New(crate::wire::NewOrderMsg {
            timestamp: 0,
            order_id: 1,
            price: 100,
            quantity: 10,
            side: 0,
            symbol: [0; 8],
        }))
        .unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                std::thread::sleep(std::time::Duration::from_millis(20));
                running.store(false, Ordering::Relaxed);
            });
            run_engine_loop(&book, &Allocation::Heap, &queue, &counters, &running, dir.path());
        });

        assert_eq!(book.lock().unwrap().size(), 1);
        assert_eq!(counters.engine_processed.load(Ordering::Relaxed), 1);
    }
}
