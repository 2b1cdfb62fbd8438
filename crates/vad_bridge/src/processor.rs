//! VAD worker threads: the consumers of the shared MPMC ring.
//!
//! Each worker pops one raw message, parses it, runs the VAD kernel and
//! counts the result. Worker 0 also owns the periodic stats report, checked
//! every loop iteration so it fires even when the ring is idle.

use crate::shutdown::ShutdownFlag;
use crate::stats::{emit, Stats};
use sensorring::{Frame, MpmcRing};
use sensorwire::{vad, SensorPacket};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Everything one worker thread needs.
pub struct Worker {
    pub id: usize,
    pub ring: Arc<MpmcRing>,
    pub stats: Arc<Stats>,
    pub flag: ShutdownFlag,
    /// Zero disables reporting entirely.
    pub stats_interval: Duration,
    /// Label for the stats line, e.g. `UDP`.
    pub transport_label: &'static str,
}

/// Worker loop. Yields the scheduler on an empty ring rather than sleeping,
/// so a refilling ring is picked up immediately.
pub fn run(worker: &Worker) {
    tracing::info!(thread = worker.id, "VAD processor started");

    let stats_owner = worker.id == 0 && !worker.stats_interval.is_zero();
    let mut last_report = Instant::now();
    let mut frame = Frame::new();

    while worker.flag.is_running() {
        if stats_owner {
            let elapsed = last_report.elapsed();
            if elapsed >= worker.stats_interval {
                let snapshot = worker.stats.snapshot_and_reset();
                emit(&snapshot.processor_line(worker.transport_label, elapsed.as_secs_f64()));
                last_report = Instant::now();
            }
        }

        if !worker.ring.try_pop(&mut frame) {
            thread::yield_now();
            continue;
        }

        let packet = match SensorPacket::parse(frame.as_slice()) {
            Ok(packet) => packet,
            Err(_) => {
                worker.stats.record_parse_error();
                continue;
            }
        };

        let result = vad::process(&packet);
        worker.stats.record_processed(result.is_active());
    }

    tracing::info!(thread = worker.id, "VAD processor stopped");
}
