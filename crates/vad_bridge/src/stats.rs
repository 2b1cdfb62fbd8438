//! Aggregated pipeline counters.
//!
//! Every thread increments with Relaxed ordering on the hot path; exactness
//! under contention is not required, only that totals converge. The reporter
//! swaps each counter to zero individually, so a snapshot is a close but not
//! instantaneous view of the interval.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counters for one pipeline instance.
#[derive(Debug, Default)]
pub struct Stats {
    recv_packets: AtomicU64,
    recv_bytes: AtomicU64,
    processed: AtomicU64,
    vad_active: AtomicU64,
    parse_errors: AtomicU64,
    recv_errors: AtomicU64,
    channel_drops: AtomicU64,
    published: AtomicU64,
    publish_errors: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// One message arrived from the transport.
    #[inline]
    pub fn record_recv(&self, bytes: u64) {
        self.recv_packets.fetch_add(1, Ordering::Relaxed);
        self.recv_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// One packet made it through parse + VAD.
    #[inline]
    pub fn record_processed(&self, active: bool) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if active {
            self.vad_active.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_recv_error(&self) {
        self.recv_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A push was refused by a full ring and the message dropped.
    #[inline]
    pub fn record_channel_drop(&self) {
        self.channel_drops.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a failed publish and returns the running total, so the caller
    /// can log only the first few occurrences.
    #[inline]
    pub fn record_publish_error(&self) -> u64 {
        self.publish_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Swaps every counter to zero and returns the values read.
    ///
    /// The exchanges are per-counter, not jointly atomic; increments landing
    /// mid-snapshot surface in the next interval instead of being lost.
    pub fn snapshot_and_reset(&self) -> StatsSnapshot {
        StatsSnapshot {
            recv_packets: self.recv_packets.swap(0, Ordering::Relaxed),
            recv_bytes: self.recv_bytes.swap(0, Ordering::Relaxed),
            processed: self.processed.swap(0, Ordering::Relaxed),
            vad_active: self.vad_active.swap(0, Ordering::Relaxed),
            parse_errors: self.parse_errors.swap(0, Ordering::Relaxed),
            recv_errors: self.recv_errors.swap(0, Ordering::Relaxed),
            channel_drops: self.channel_drops.swap(0, Ordering::Relaxed),
            published: self.published.swap(0, Ordering::Relaxed),
            publish_errors: self.publish_errors.swap(0, Ordering::Relaxed),
        }
    }

    /// Non-destructive read of every counter, for tests and teardown logs.
    pub fn peek(&self) -> StatsSnapshot {
        StatsSnapshot {
            recv_packets: self.recv_packets.load(Ordering::Relaxed),
            recv_bytes: self.recv_bytes.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            vad_active: self.vad_active.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            recv_errors: self.recv_errors.load(Ordering::Relaxed),
            channel_drops: self.channel_drops.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
        }
    }
}

/// Plain values captured from [`Stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub recv_packets: u64,
    pub recv_bytes: u64,
    pub processed: u64,
    pub vad_active: u64,
    pub parse_errors: u64,
    pub recv_errors: u64,
    pub channel_drops: u64,
    pub published: u64,
    pub publish_errors: u64,
}

impl StatsSnapshot {
    /// Rate report for the processor topology.
    pub fn processor_line(&self, transport: &str, elapsed_secs: f64) -> String {
        let elapsed = elapsed_secs.max(0.001);
        format!(
            "[STATS] {}: {:.0} pps, {:.2} Mbps | VAD: {:.0} proc/s, {} active | errors: parse={} recv={} drops={}",
            transport,
            self.recv_packets as f64 / elapsed,
            (self.recv_bytes as f64 * 8.0) / (elapsed * 1e6),
            self.processed as f64 / elapsed,
            self.vad_active,
            self.parse_errors,
            self.recv_errors,
            self.channel_drops,
        )
    }

    /// Rate report for the bridge topology.
    pub fn bridge_line(&self, elapsed_secs: f64) -> String {
        let elapsed = elapsed_secs.max(0.001);
        format!(
            "[STATS] UDP: {:.0} pps, {:.2} Mbps | MQTT: {:.0} msg/s | errors: parse={} mqtt={} drops={}",
            self.recv_packets as f64 / elapsed,
            (self.recv_bytes as f64 * 8.0) / (elapsed * 1e6),
            self.published as f64 / elapsed,
            self.parse_errors,
            self.publish_errors,
            self.channel_drops,
        )
    }
}

/// Prints a report line to stdout and flushes so followers see it promptly.
pub fn emit(line: &str) {
    println!("{line}");
    let _ = std::io::stdout().flush();
}
