use crate::invariants::{debug_assert_consumer_behind, debug_assert_monotonic, debug_assert_occupancy};
use crate::{round_capacity, RingError};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Maximum packed record (topic + payload) per slot, in bytes.
pub const MAX_RECORD_LEN: usize = 4096;

// =============================================================================
// MEMORY ORDERING PROTOCOL (single producer, single consumer)
// =============================================================================
//
// `head` is written only by the producer, `tail` only by the consumer. Both
// are unbounded u64 sequence numbers; the slot for position p is p & mask, so
// wrap-around of the index is free and wrap-around of the counter is
// unreachable in practice.
//
// Producer: load head Relaxed (own cursor), load tail Acquire (synchronizes
// with the consumer's Release), write the slot, store head+1 Release.
//
// Consumer: load tail Relaxed (own cursor), load head Acquire (synchronizes
// with the producer's Release, making the slot writes visible), copy the slot
// out, store tail+1 Release (hands the slot back to the producer).
//
// The slot array is plain memory behind UnsafeCell: every slot has exactly
// one writer at a time, enforced by the cursor protocol above.
// =============================================================================

struct Record {
    topic_len: u16,
    payload_len: u16,
    data: [u8; MAX_RECORD_LEN],
}

impl Record {
    const fn empty() -> Self {
        Self {
            topic_len: 0,
            payload_len: 0,
            data: [0u8; MAX_RECORD_LEN],
        }
    }
}

/// A (topic, payload) record copied out of the ring.
///
/// Reused across pops; 4 KiB inline, so keep one per consumer rather than one
/// per message.
pub struct TopicFrame {
    topic_len: u16,
    payload_len: u16,
    data: [u8; MAX_RECORD_LEN],
}

impl TopicFrame {
    /// Creates an empty frame for use as a pop target.
    pub fn new() -> Self {
        Self {
            topic_len: 0,
            payload_len: 0,
            data: [0u8; MAX_RECORD_LEN],
        }
    }

    /// Topic bytes of the last popped record.
    #[inline]
    pub fn topic(&self) -> &[u8] {
        &self.data[..self.topic_len as usize]
    }

    /// Payload bytes of the last popped record.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        let start = self.topic_len as usize;
        &self.data[start..start + self.payload_len as usize]
    }
}

impl Default for TopicFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-producer single-consumer ring of packed (topic, payload) records.
///
/// One ring per receiver thread in the bridge topology: the receiver is the
/// sole producer and the publisher thread the sole consumer, so neither side
/// ever needs a CAS. Pop order equals push order.
pub struct SpscRing {
    /// Producer cursor, on its own cache line.
    head: CachePadded<AtomicU64>,
    /// Consumer cursor, on its own cache line.
    tail: CachePadded<AtomicU64>,
    mask: u64,
    capacity: u64,
    slots: Box<[UnsafeCell<Record>]>,
}

// Safety: the single-producer / single-consumer protocol above guarantees
// each slot has at most one accessor at a time.
unsafe impl Send for SpscRing {}
unsafe impl Sync for SpscRing {}

impl SpscRing {
    /// Creates a ring with at least `capacity` slots, rounded up to the next
    /// power of two. Slot storage is allocated here and never resized.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = round_capacity(capacity);
        let slots: Box<[UnsafeCell<Record>]> =
            (0..cap).map(|_| UnsafeCell::new(Record::empty())).collect();

        Self {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            mask: (cap - 1) as u64,
            capacity: cap as u64,
            slots,
        }
    }

    /// Ring capacity in slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Current occupancy. Always in `[0, capacity]`.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail) as usize
    }

    /// Returns true if no records are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueues a (topic, payload) record. Sole-producer only.
    ///
    /// Returns [`RingError::Full`] without blocking when all slots are
    /// occupied, [`RingError::Oversize`] when the packed record does not fit
    /// in a slot.
    pub fn try_push(&self, topic: &[u8], payload: &[u8]) -> Result<(), RingError> {
        let record_len = topic.len() + payload.len();
        if record_len > MAX_RECORD_LEN {
            return Err(RingError::Oversize {
                len: record_len,
                max: MAX_RECORD_LEN,
            });
        }

        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) >= self.capacity {
            return Err(RingError::Full);
        }

        // SAFETY: [tail, head) slots belong to the consumer; slot `head` is
        // outside that range and the single producer is the only writer of it
        // until the Release store below publishes it.
        unsafe {
            let slot = &mut *self.slots[(head & self.mask) as usize].get();
            slot.topic_len = topic.len() as u16;
            slot.payload_len = payload.len() as u16;
            slot.data[..topic.len()].copy_from_slice(topic);
            slot.data[topic.len()..record_len].copy_from_slice(payload);
        }

        let new_head = head.wrapping_add(1);
        debug_assert_occupancy!(new_head, tail, self.capacity);
        debug_assert_monotonic!("head", head, new_head);
        self.head.store(new_head, Ordering::Release);
        Ok(())
    }

    /// Dequeues one record into `out`. Sole-consumer only.
    ///
    /// Returns false when the ring is empty.
    pub fn try_pop(&self, out: &mut TopicFrame) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail >= head {
            return false;
        }

        // SAFETY: the Acquire load of head made the producer's writes to this
        // slot visible, and the producer will not reuse it until tail passes.
        unsafe {
            let slot = &*self.slots[(tail & self.mask) as usize].get();
            let record_len = slot.topic_len as usize + slot.payload_len as usize;
            out.topic_len = slot.topic_len;
            out.payload_len = slot.payload_len;
            out.data[..record_len].copy_from_slice(&slot.data[..record_len]);
        }

        let new_tail = tail.wrapping_add(1);
        debug_assert_monotonic!("tail", tail, new_tail);
        debug_assert_consumer_behind!(new_tail, head);
        self.tail.store(new_tail, Ordering::Release);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_round_trips_topic_and_payload() {
        let ring = SpscRing::with_capacity(8);
        ring.try_push(b"vad/sensors/7", b"{\"seq\":1}").unwrap();
        assert_eq!(ring.len(), 1);

        let mut frame = TopicFrame::new();
        assert!(ring.try_pop(&mut frame));
        assert_eq!(frame.topic(), b"vad/sensors/7");
        assert_eq!(frame.payload(), b"{\"seq\":1}");
        assert!(ring.is_empty());
    }

    #[test]
    fn pop_order_equals_push_order() {
        let ring = SpscRing::with_capacity(16);
        for i in 0..10u8 {
            ring.try_push(b"t", &[i]).unwrap();
        }

        let mut frame = TopicFrame::new();
        for i in 0..10u8 {
            assert!(ring.try_pop(&mut frame));
            assert_eq!(frame.payload(), &[i]);
        }
        assert!(!ring.try_pop(&mut frame));
    }

    #[test]
    fn full_ring_rejects_without_blocking() {
        let ring = SpscRing::with_capacity(4);
        for _ in 0..4 {
            ring.try_push(b"t", b"p").unwrap();
        }
        assert_eq!(ring.try_push(b"t", b"p"), Err(RingError::Full));
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn oversize_record_is_rejected_before_cursor_moves() {
        let ring = SpscRing::with_capacity(4);
        let big = vec![0u8; MAX_RECORD_LEN];
        assert!(matches!(
            ring.try_push(b"topic", &big),
            Err(RingError::Oversize { .. })
        ));
        assert!(ring.is_empty());
    }

    #[test]
    fn wraps_around_slot_array() {
        let ring = SpscRing::with_capacity(4);
        let mut frame = TopicFrame::new();

        for round in 0..20u8 {
            ring.try_push(b"t", &[round]).unwrap();
            assert!(ring.try_pop(&mut frame));
            assert_eq!(frame.payload(), &[round]);
        }
    }
}
