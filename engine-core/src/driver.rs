//! Top-level orchestration: pick an allocation strategy from the
//! `<memory>` flag, then either run the offline benchmark (`test` mode) or
//! bind TCP and serve (`live` mode), wiring up the engine/metrics threads
//! the chosen `<threading>` mode needs.

use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::cli::{Memory, Mode, RunConfig, Threading};
use crate::engine::book::OrderBook;
use crate::engine::matching::Allocation;
use crate::handoff::HandoffQueue;
use crate::metrics::{self, Counters};
use crate::net::{self, Dispatch};
use crate::pool::OrderPool;
use crate::wire::{NewOrderMsg, WireMessage};

pub const LIVE_PORT: u16 = 8080;
pub const BENCHMARK_ORDER_COUNT: u64 = 10_000_000;
pub const HANDOFF_QUEUE_CAPACITY: usize = 65_000;
pub const ORDER_POOL_CAPACITY: usize = 10_000_000;

pub fn run(config: RunConfig) -> i32 {
    tracing::info!(
        mode = ?config.mode,
        threading = ?config.threading,
        memory = ?config.memory,
        "booting"
    );

    let alloc = match config.memory {
        Memory::Mempool => Allocation::Pooled(Arc::new(OrderPool::new(ORDER_POOL_CAPACITY))),
        Memory::Os => Allocation::Heap,
    };

    match config.mode {
        Mode::Live => run_live(config.threading, alloc),
        Mode::Test => run_benchmark(config.threading, alloc),
    }
}

fn run_live(threading: Threading, alloc: Allocation) -> i32 {
    let running = Arc::new(AtomicBool::new(true));
    let counters = Arc::new(Counters::default());
    let book = Arc::new(Mutex::new(OrderBook::new()));
    let snapshot_dir = Arc::new(PathBuf::from("."));

    let listener = match TcpListener::bind(("0.0.0.0", LIVE_PORT)) {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(?err, port = LIVE_PORT, "failed to bind TCP listener");
            return 1;
        }
    };

    let mut engine_thread = None;
    let dispatch = match threading {
        Threading::Queue => {
            let queue = Arc::new(HandoffQueue::new(HANDOFF_QUEUE_CAPACITY));
            let engine_book = Arc::clone(&book);
            let engine_queue = Arc::clone(&queue);
            let engine_counters = Arc::clone(&counters);
            let engine_running = Arc::clone(&running);
            let engine_alloc = alloc.clone();
            let engine_dir = Arc::clone(&snapshot_dir);
            engine_thread = Some(std::thread::spawn(move || {
                net::run_engine_loop(
                    &engine_book,
                    &engine_alloc,
                    &engine_queue,
                    &engine_counters,
                    &engine_running,
                    &engine_dir,
                );
            }));
            Dispatch::Queue(queue)
        }
        Threading::Sync => Dispatch::Sync {
            book: Arc::clone(&book),
            alloc: alloc.clone(),
            snapshot_dir: Arc::clone(&snapshot_dir),
        },
    };

    let metrics_running = Arc::clone(&running);
    let metrics_counters = Arc::clone(&counters);
    let metrics_dir = Arc::clone(&snapshot_dir);
    let metrics_thread = std::thread::spawn(move || {
        metrics::run_metrics_loop(&metrics_dir, &metrics_counters, &metrics_running);
    });

    net::accept_loop(listener, Arc::clone(&running), Arc::clone(&counters), dispatch);

    running.store(false, Ordering::Relaxed);
    if let Some(handle) = engine_thread {
        let _ = handle.join();
    }
    let _ = metrics_thread.join();
    0
}

fn synthetic_messages(count: u64) -> Vec<WireMessage> {
    (0..count)
        .map(|i| {
            WireMessage::New(NewOrderMsg {
                timestamp: 0,
                order_id: i,
                price: 100 + (i % 10) as u32,
                quantity: 10,
                side: if i % 2 == 0 { 0 } else { 1 },
                symbol: [0; 8],
            })
        })
        .collect()
}

fn run_benchmark(threading: Threading, alloc: Allocation) -> i32 {
    tracing::info!(count = BENCHMARK_ORDER_COUNT, "generating synthetic orders");
    let messages = synthetic_messages(BENCHMARK_ORDER_COUNT);
    let book = Mutex::new(OrderBook::new());
    let snapshot_dir = PathBuf::from(".");
    let counters = Counters::default();

    let start = Instant::now();
    match threading {
        Threading::Queue => {
            let queue = HandoffQueue::new(HANDOFF_QUEUE_CAPACITY);
            let running = AtomicBool::new(true);

            std::thread::scope(|scope| {
                scope.spawn(|| {
                    net::run_engine_loop(&book, &alloc, &queue, &counters, &running, &snapshot_dir);
                });

                for message in messages {
                    queue.push_blocking(message);
                }
                while counters.engine_processed.load(Ordering::Relaxed) < BENCHMARK_ORDER_COUNT {
                    std::thread::yield_now();
                }
                running.store(false, Ordering::Relaxed);
            });
        }
        Threading::Sync => {
            let mut book = book.lock().expect("uncontended at startup");
            for message in messages {
                net::apply_message(&mut book, &alloc, message);
            }
        }
    }
    let elapsed = start.elapsed();

    tracing::info!(
        queue = matches!(threading, Threading::Queue),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        throughput_ops_per_sec = BENCHMARK_ORDER_COUNT as f64 / elapsed.as_secs_f64(),
        "benchmark complete"
    );
    0
}
