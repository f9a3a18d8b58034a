//! Signal channel: "gameplay wants a batch now".
//!
//! The gameplay thread pulls updates on its own cadence.  Before each pull it
//! bumps a 64-bit counter here; the receive worker wakes up, sees how many
//! requests are outstanding, and answers each one with a batch on the inbound
//! pipe.
//!
//! The counter only ever grows.  The worker remembers how far it has answered
//! (`answered`), so the number of outstanding requests is
//! `issued - answered` and a burst of signals that arrives while the worker
//! is busy is never lost.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;

/// Counter plus wakeup shared between the gameplay thread and the receive worker.
#[derive(Debug, Default)]
pub struct SignalChannel {
    issued: AtomicU64,
    answered: AtomicU64,
    notify: Notify,
}

impl SignalChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one data request and wakes the receive worker.
    ///
    /// Returns the new value of the request counter.
    pub fn signal(&self) -> u64 {
        let issued = self.issued.fetch_add(1, Ordering::AcqRel) + 1;
        self.notify.notify_one();
        issued
    }

    /// Wakes the worker without recording a request (used on shutdown).
    pub fn wake(&self) {
        self.notify.notify_one();
    }

    /// Waits for the next [`SignalChannel::signal`] or [`SignalChannel::wake`].
    ///
    /// A wakeup issued while nobody was waiting is stored, so this returns
    /// immediately if one is pending.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Marks every outstanding request as answered and returns how many there were.
    pub fn take(&self) -> u64 {
        let issued = self.issued.load(Ordering::Acquire);
        let answered = self.answered.swap(issued, Ordering::AcqRel);
        issued.wrapping_sub(answered)
    }

    /// Total requests issued so far.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }
}
