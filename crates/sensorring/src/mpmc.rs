use crate::invariants::{debug_assert_consumer_behind, debug_assert_monotonic, debug_assert_occupancy};
use crate::{round_capacity, RingError};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Maximum message per slot, in bytes.
pub const MAX_FRAME_LEN: usize = 512;

/// Upper bound on frames returned by a single [`MpmcRing::pop_batch`] call.
pub const POP_BATCH_MAX: usize = 256;

// =============================================================================
// MEMORY ORDERING PROTOCOL (multiple producers, multiple consumers)
// =============================================================================
//
// Cursor advance and slot publication are split, because between a producer
// winning its CAS on `head` and finishing its slot writes, the slot is
// reserved but unreadable. The per-slot `ready` flag closes that gap:
//
// Producer:  1. full-check head-tail (both Relaxed; the CAS below re-orders)
//            2. CAS-weak head -> head+1, AcqRel (reservation; retry on loss)
//            3. write len + bytes into the owned slot
//            4. store ready = 1, Release   (publication)
//
// Consumer:  1. load tail Relaxed, head Acquire; empty when tail >= head
//            2. load slots[tail].ready Acquire; 0 means the head-most slot is
//               still mid-write -> report empty, never spin on the slot
//            3. CAS-weak tail -> tail+1, AcqRel (claim; retry on loss)
//            4. copy the slot out, store ready = 0, Release (recycle)
//
// ready=1 is observed only after the producer's payload writes, through the
// Release store in (4) and the Acquire load in (2). Delivery order is the
// reservation order of the head CASes; a consumer that meets an un-ready slot
// backs off rather than skipping it, so that order is never reordered.
// =============================================================================

struct Slot {
    /// 0 = free, 1 = written and visible.
    ready: AtomicU32,
    len: UnsafeCell<u16>,
    data: UnsafeCell<[u8; MAX_FRAME_LEN]>,
}

impl Slot {
    fn empty() -> Self {
        Self {
            ready: AtomicU32::new(0),
            len: UnsafeCell::new(0),
            data: UnsafeCell::new([0u8; MAX_FRAME_LEN]),
        }
    }
}

/// A raw message copied out of the ring.
pub struct Frame {
    len: u16,
    data: [u8; MAX_FRAME_LEN],
}

impl Frame {
    /// Creates an empty frame for use as a pop target.
    pub fn new() -> Self {
        Self {
            len: 0,
            data: [0u8; MAX_FRAME_LEN],
        }
    }

    /// Bytes of the last popped message.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Length of the last popped message.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns true if no message has been popped into this frame.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// Multi-producer multi-consumer ring of raw byte messages.
///
/// The shared handoff point of the processor topology: UDP/TCP/MQTT receivers
/// push whole datagrams, VAD worker threads pop them. Push never blocks; a
/// full ring reports [`RingError::Full`] in O(1) and the caller drops the
/// message.
pub struct MpmcRing {
    /// Producer cursor, contended by CAS, on its own cache line.
    head: CachePadded<AtomicU64>,
    /// Consumer cursor, contended by CAS, on its own cache line.
    tail: CachePadded<AtomicU64>,
    mask: u64,
    capacity: u64,
    slots: Box<[Slot]>,
}

// Safety: slot contents are only touched between a won cursor CAS and the
// matching ready transition, which serializes access per slot.
unsafe impl Send for MpmcRing {}
unsafe impl Sync for MpmcRing {}

impl MpmcRing {
    /// Creates a ring with at least `capacity` slots, rounded up to the next
    /// power of two. Slot storage is allocated here and never resized.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = round_capacity(capacity);
        let slots: Box<[Slot]> = (0..cap).map(|_| Slot::empty()).collect();

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

    /// Returns true if no messages are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueues a message. Safe to call from any number of threads.
    ///
    /// Reserves a slot by CAS on `head`, writes it, then raises the slot's
    /// ready flag. Returns [`RingError::Full`] in O(1) when occupancy is at
    /// capacity, [`RingError::Oversize`] for messages over [`MAX_FRAME_LEN`]
    /// (checked before any cursor is touched).
    pub fn try_push(&self, msg: &[u8]) -> Result<(), RingError> {
        if msg.len() > MAX_FRAME_LEN {
            return Err(RingError::Oversize {
                len: msg.len(),
                max: MAX_FRAME_LEN,
            });
        }

        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            let tail = self.tail.load(Ordering::Relaxed);
            if head.wrapping_sub(tail) >= self.capacity {
                return Err(RingError::Full);
            }

            let next = head.wrapping_add(1);
            debug_assert_monotonic!("head", head, next);
            match self
                .head
                .compare_exchange_weak(head, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => break,
                // Another producer won; retry from its published head.
                Err(current) => head = current,
            }
        }

        // SAFETY: winning the CAS grants this thread exclusive ownership of
        // slot `head & mask` until the Release store of ready below.
        let slot = &self.slots[(head & self.mask) as usize];
        unsafe {
            *slot.len.get() = msg.len() as u16;
            (&mut *slot.data.get())[..msg.len()].copy_from_slice(msg);
        }
        slot.ready.store(1, Ordering::Release);
        Ok(())
    }

    /// Dequeues one message into `out`. Safe to call from any number of
    /// threads.
    ///
    /// Returns false when the ring is empty, or when the head-most slot is
    /// reserved but not yet written; the caller retries later instead of
    /// spinning on the slot.
    pub fn try_pop(&self, out: &mut Frame) -> bool {
        loop {
            let tail = self.tail.load(Ordering::Relaxed);
            let head = self.head.load(Ordering::Acquire);
            if tail >= head {
                return false;
            }

            let slot = &self.slots[(tail & self.mask) as usize];
            if slot.ready.load(Ordering::Acquire) == 0 {
                // Reserved but mid-write. Deliberate back-off: the caller can
                // schedule other work and come back.
                return false;
            }

            let next = tail.wrapping_add(1);
            debug_assert_consumer_behind!(next, head);
            debug_assert_occupancy!(head, tail, self.capacity);
            if self
                .tail
                .compare_exchange_weak(tail, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                // SAFETY: the ready Acquire above synchronized with the
                // producer's Release, and winning the tail CAS makes this
                // thread the sole reader of the slot.
                unsafe {
                    let len = *slot.len.get() as usize;
                    out.len = len as u16;
                    out.data[..len].copy_from_slice(&(&*slot.data.get())[..len]);
                }
                slot.ready.store(0, Ordering::Release);
                return true;
            }
            // Another consumer claimed the slot; retry.
        }
    }

    /// Dequeues up to `out.len().min(POP_BATCH_MAX)` messages at once.
    /// Returns the number popped (0 if empty).
    pub fn pop_batch(&self, out: &mut [Frame]) -> usize {
        let max = out.len().min(POP_BATCH_MAX);
        let mut count = 0;
        while count < max {
            if !self.try_pop(&mut out[count]) {
                break;
            }
            count += 1;
        }
        count
    }
}
