//! Arrival stamps for received packets.
//!
//! The two transports stamp packets with quantities that only look alike:
//!
//! - A TCP stream already delivers bytes in send order, so the receiver simply
//!   numbers packets as they come off the stream with a local
//!   [`SequenceCounter`].  These numbers are strictly increasing.
//! - A UDP datagram carries the *sender's* wall-clock timestamp in its trailer.
//!   Datagrams can arrive reordered or duplicated, so this value is **not**
//!   monotonic and must never be used to order packets against each other.
//!
//! [`Arrival`] keeps the two apart at the type level so a consumer cannot
//! accidentally compare a local sequence number with a remote timestamp.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// How a received packet was stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arrival {
    /// Local arrival number on the reliable transport.
    Sequenced(u64),
    /// Sender-supplied timestamp (µs since Unix epoch) from a datagram trailer.
    SenderStamped(u64),
}

impl Arrival {
    /// Local sequence number, if this packet came off the reliable stream.
    pub fn sequence(self) -> Option<u64> {
        match self {
            Arrival::Sequenced(n) => Some(n),
            Arrival::SenderStamped(_) => None,
        }
    }

    /// Sender timestamp, if this packet arrived as a datagram.
    pub fn sender_timestamp_us(self) -> Option<u64> {
        match self {
            Arrival::SenderStamped(ts) => Some(ts),
            Arrival::Sequenced(_) => None,
        }
    }
}

/// Monotonic arrival counter for the reliable transport.
///
/// Starts at 0 and wraps at `u64::MAX` without panicking.  `Relaxed` ordering
/// is enough: the counter numbers packets, it does not publish memory.
///
/// # Examples
///
/// ```rust
/// use floorsync_core::protocol::sequence::{Arrival, SequenceCounter};
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.stamp(), Arrival::Sequenced(0));
/// assert_eq!(counter.stamp(), Arrival::Sequenced(1));
/// ```
#[derive(Debug, Default)]
pub struct SequenceCounter {
    next: AtomicU64,
}

impl SequenceCounter {
    /// Creates a counter whose first stamp is 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next sequence number and advances the counter.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// [`SequenceCounter::next`] wrapped as an [`Arrival`].
    pub fn stamp(&self) -> Arrival {
        Arrival::Sequenced(self.next())
    }

    /// Number of packets stamped so far (modulo wrap).
    pub fn stamped(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
