//! Bridge dispatcher: the single consumer of every receiver's SPSC ring.
//!
//! Round-robin keeps one fast receiver from starving the others. Publish
//! failures are counted, sampled into the log, and never retried (QoS 0:
//! the next packet matters more than the last one).

use crate::shutdown::ShutdownFlag;
use crate::sink::MessageSink;
use crate::stats::Stats;
use sensorring::{Backoff, SpscRing, TopicFrame};
use std::sync::Arc;

/// How many publish failures get logged before going silent.
const PUBLISH_ERROR_LOG_LIMIT: u64 = 5;

/// Drains all rings into the sink until shutdown, then drains what remains
/// best-effort and exits.
pub fn run(rings: &[Arc<SpscRing>], sink: &dyn MessageSink, stats: &Stats, flag: &ShutdownFlag) {
    tracing::info!(rings = rings.len(), "publisher started");

    let mut frame = TopicFrame::new();
    let mut backoff = Backoff::new();

    loop {
        let mut drained = 0usize;

        for ring in rings {
            if !ring.try_pop(&mut frame) {
                continue;
            }
            drained += 1;

            let Ok(topic) = std::str::from_utf8(frame.topic()) else {
                stats.record_parse_error();
                continue;
            };

            match sink.try_publish(topic, frame.payload()) {
                Ok(()) => stats.record_published(),
                Err(e) => {
                    let total = stats.record_publish_error();
                    if total <= PUBLISH_ERROR_LOG_LIMIT {
                        tracing::warn!(error = %e, topic, "publish failed");
                    }
                }
            }
        }

        if drained > 0 {
            backoff.reset();
        } else if flag.is_running() {
            backoff.idle();
        } else {
            // Shutdown requested and every ring came up empty in a full scan.
            break;
        }
    }

    tracing::info!("publisher stopped");
}
