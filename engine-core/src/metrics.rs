//! Per-second throughput metrics writer. Once a second, computes the
//! ops/sec delta on each counter since the last tick and publishes it with
//! the same write-temp-then-rename discipline as the snapshot writer.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

pub const METRICS_FILE_NAME: &str = "metrics.json";
pub const METRICS_TMP_FILE_NAME: &str = "metrics.json.tmp";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Metrics {
    pub network_ops: u64,
    pub engine_ops: u64,
    pub total_network: u64,
    pub total_engine: u64,
}

pub fn write_metrics(dir: &Path, metrics: &Metrics) -> std::io::Result<()> {
    let tmp_path = dir.join(METRICS_TMP_FILE_NAME);
    let final_path = dir.join(METRICS_FILE_NAME);

    let json = serde_json::to_string(metrics).expect("Metrics always serializes");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, &final_path)?;
    Ok(())
}

/// Counters shared between network workers, the matching thread, and this
/// writer. Both counters are monotonically increasing totals; this module
/// only ever reads them and derives per-second deltas.
#[derive(Default)]
pub struct Counters {
    pub network_received: AtomicU64,
    pub engine_processed: AtomicU64,
}

/// Runs the 1Hz metrics loop until `running` is cleared. Intended to be
/// spawned on its own thread by `driver::run` in live mode.
pub fn run_metrics_loop(dir: &Path, counters: &Counters, running: &AtomicBool) {
    let mut last_network = 0u64;
    let mut last_engine = 0u64;

    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_secs(1));

        let total_network = counters.network_received.load(Ordering::Relaxed);
        let total_engine = counters.engine_processed.load(Ordering::Relaxed);

        let metrics = Metrics {
            network_ops: total_network.saturating_sub(last_network),
            engine_ops: total_engine.saturating_sub(last_engine),
            total_network,
            total_engine,
        };

        if let Err(err) = write_metrics(dir, &metrics) {
            tracing::warn!(?err, "failed to write metrics.json");
        }

        last_network = total_network;
        last_engine = total_engine;
    }
}
