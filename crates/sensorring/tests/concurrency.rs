//! Cross-thread contract tests: FIFO transfer on the SPSC ring, multiset
//! equality and per-producer ordering on the MPMC ring.

use sensorring::{Frame, MpmcRing, SpscRing, TopicFrame};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn spsc_transfers_one_million_records_in_order() {
    const TOTAL: u64 = 1_000_000;

    let ring = Arc::new(SpscRing::with_capacity(1024));

    let producer = {
        let ring = Arc::clone(&ring);
        thread::spawn(move || {
            for i in 0..TOTAL {
                let payload = i.to_le_bytes();
                while ring.try_push(b"t", &payload).is_err() {
                    std::hint::spin_loop();
                }
            }
        })
    };

    let mut frame = TopicFrame::new();
    let mut next = 0u64;
    while next < TOTAL {
        if ring.try_pop(&mut frame) {
            let got = u64::from_le_bytes(frame.payload().try_into().unwrap());
            assert_eq!(got, next, "record delivered out of order");
            next += 1;
        } else {
            std::hint::spin_loop();
        }
    }

    producer.join().unwrap();
    assert!(ring.is_empty());
}

#[test]
fn mpmc_delivers_each_message_exactly_once_with_per_producer_fifo() {
    const PRODUCERS: u8 = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: u64 = 50_000;
    const TOTAL: u64 = PRODUCERS as u64 * PER_PRODUCER;

    let ring = Arc::new(MpmcRing::with_capacity(1024));
    let popped = Arc::new(AtomicU64::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                let mut msg = [0u8; 9];
                msg[0] = id;
                for seq in 0..PER_PRODUCER {
                    msg[1..].copy_from_slice(&seq.to_le_bytes());
                    while ring.try_push(&msg).is_err() {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let ring = Arc::clone(&ring);
            let popped = Arc::clone(&popped);
            thread::spawn(move || {
                let mut seen: Vec<(u8, u64)> = Vec::new();
                let mut frame = Frame::new();
                while popped.load(Ordering::Relaxed) < TOTAL {
                    if ring.try_pop(&mut frame) {
                        let bytes = frame.as_slice();
                        let id = bytes[0];
                        let seq = u64::from_le_bytes(bytes[1..9].try_into().unwrap());
                        seen.push((id, seq));
                        popped.fetch_add(1, Ordering::Relaxed);
                    } else {
                        thread::yield_now();
                    }
                }
                seen
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    let mut all: Vec<(u8, u64)> = Vec::with_capacity(TOTAL as usize);
    for consumer in consumers {
        let seen = consumer.join().unwrap();

        // Each consumer claims slots in tail order, so its view of any single
        // producer must be a strictly increasing subsequence of that
        // producer's push order.
        let mut last_seq = [None::<u64>; PRODUCERS as usize];
        for &(id, seq) in &seen {
            if let Some(prev) = last_seq[id as usize] {
                assert!(prev < seq, "producer {id} reordered: {prev} then {seq}");
            }
            last_seq[id as usize] = Some(seq);
        }

        all.extend(seen);
    }

    // Multiset equality: every pushed message delivered exactly once.
    assert_eq!(all.len() as u64, TOTAL);
    all.sort_unstable();
    let mut expected: Vec<(u8, u64)> = Vec::with_capacity(TOTAL as usize);
    for id in 0..PRODUCERS {
        for seq in 0..PER_PRODUCER {
            expected.push((id, seq));
        }
    }
    expected.sort_unstable();
    assert_eq!(all, expected);
    assert!(ring.is_empty());
}

#[test]
fn mpmc_reports_full_under_sustained_push_only_load() {
    let ring = MpmcRing::with_capacity(1024);
    let capacity = ring.capacity();

    let mut accepted = 0usize;
    for i in 0..capacity * 2 {
        if ring.try_push(&(i as u64).to_le_bytes()).is_ok() {
            accepted += 1;
        }
    }

    // Once full, every further push fails immediately; nothing is overwritten.
    assert_eq!(accepted, capacity);
    assert_eq!(ring.len(), capacity);
}
