//! Debug assertion macros for ring cursor invariants.
//!
//! Active only in debug builds; release builds compile them away entirely.

/// Assert that occupancy never exceeds capacity.
///
/// Holds because producers check `head - tail < capacity` before advancing
/// `head`, and `tail` only ever moves toward `head`.
macro_rules! debug_assert_occupancy {
    ($head:expr, $tail:expr, $capacity:expr) => {
        debug_assert!(
            $head.wrapping_sub($tail) <= $capacity,
            "ring occupancy {} exceeds capacity {} (head={}, tail={})",
            $head.wrapping_sub($tail),
            $capacity,
            $head,
            $tail
        )
    };
}

/// Assert that a cursor only moves forward.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "{} cursor moved backwards: {} -> {}",
            $name,
            $old,
            $new
        )
    };
}

/// Assert that the consumer never advances past the producer.
macro_rules! debug_assert_consumer_behind {
    ($new_tail:expr, $head:expr) => {
        debug_assert!(
            $new_tail <= $head,
            "tail {} advanced past head {}",
            $new_tail,
            $head
        )
    };
}

pub(crate) use debug_assert_consumer_behind;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_occupancy;
