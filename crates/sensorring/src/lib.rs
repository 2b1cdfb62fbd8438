//! Bounded lock-free ring buffers for fixed-size sensor messages.
//!
//! Two variants share the same cursor discipline (64-bit monotonic `head`
//! written by producers, `tail` written by consumers, slot index `pos & mask`)
//! but differ in their concurrency contract:
//!
//! - [`SpscRing`]: one producer, one consumer. Cursor stores alone publish
//!   slot contents; no CAS anywhere. Used one-per-receiver in the bridge
//!   topology, carrying a packed (topic, payload) record per slot.
//! - [`MpmcRing`]: any number of producers and consumers. Producers reserve a
//!   slot by CAS on `head`, then publish it with a per-slot `ready` flag;
//!   consumers claim slots by CAS on `tail` and refuse to advance past an
//!   un-ready slot, so delivery stays in reservation order.
//!
//! Slot memory is allocated once at construction and reused in place. Pushing
//! copies the message into the slot; popping copies it back out into a
//! caller-provided frame. Both operations are O(message) with no allocation,
//! which bounds memory regardless of producer burst behaviour.

mod backoff;
mod invariants;
mod mpmc;
mod spsc;

pub use backoff::Backoff;
pub use mpmc::{Frame, MpmcRing, MAX_FRAME_LEN, POP_BATCH_MAX};
pub use spsc::{SpscRing, TopicFrame, MAX_RECORD_LEN};

use thiserror::Error;

/// Error types for ring push operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// All slots are occupied; the message was dropped by the caller's policy.
    #[error("ring is full")]
    Full,
    /// The message does not fit in a slot.
    #[error("message of {len} bytes exceeds slot capacity {max}")]
    Oversize {
        /// Length of the rejected message.
        len: usize,
        /// Slot data capacity.
        max: usize,
    },
}

/// Rounds a requested capacity up to the next power of two.
///
/// A zero request yields the minimum of 2 slots so the full/empty
/// distinction stays well defined.
pub(crate) fn round_capacity(requested: usize) -> usize {
    requested.max(2).next_power_of_two()
}
