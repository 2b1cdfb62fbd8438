//! Transport receivers. Each receiver owns its socket (or subscription),
//! counts arrivals, and hands messages to a ring without ever blocking on
//! the ring. One-second receive timeouts keep every receiver responsive to
//! the shutdown flag.

pub mod mqtt;
pub mod tcp;
pub mod udp;

use crate::stats::Stats;
use sensorring::{MpmcRing, RingError};

/// Pushes a raw message into the shared ring, mapping failure to the right
/// counter: a full ring is backpressure (`channel_drops`), a message too big
/// for a slot is malformed input (`parse_errors`).
fn push_raw(ring: &MpmcRing, stats: &Stats, msg: &[u8]) {
    match ring.try_push(msg) {
        Ok(()) => {}
        Err(RingError::Full) => stats.record_channel_drop(),
        Err(RingError::Oversize { .. }) => stats.record_parse_error(),
    }
}
