//! Network infrastructure: the two socket workers and the router that owns them.
//!
//! ```text
//!                    ┌──────────── Router ────────────┐
//!   TCP ───────────▶ │ receive worker ──inbound pipe──┼──▶ gameplay (pull_and_apply)
//!   UDP ───────────▶ │      ▲                         │
//!                    │      └── signal channel ◀──────┼─── gameplay (request batch)
//!   TCP/UDP ◀─────── │ send worker ◀──outbound pipe───┼─── gameplay (send)
//!                    └────────────────────────────────┘
//! ```
//!
//! - **`socket_service`** – the receive worker (multiplexed wait over both
//!   sockets, frame decoding, batch answering) and the send worker (drains the
//!   outbound pipe onto the right transport).
//! - **`router`** – resolves the server, opens the sockets, spawns both
//!   workers on dedicated threads, and turns fatal conditions into a shutdown
//!   notification for the gameplay thread.

pub mod router;
pub mod socket_service;

use std::sync::atomic::{AtomicU8, Ordering};

use floorsync_core::protocol::{ProtocolError, Transport};
use thiserror::Error;

use crate::infrastructure::pipe::PipeError;

pub use router::Router;

/// Every failure the network layer can report.
///
/// Only [`NetError::is_fatal`] conditions stop a worker.  Corruption is handled
/// where it is detected (the packet is skipped) and never escalated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetError {
    /// A socket read failed for a reason other than "no data yet".
    #[error("receive failed on {transport:?} transport: {reason}")]
    TransportReceiveFailed { transport: Transport, reason: String },

    /// The server closed the reliable stream.
    #[error("connection closed by server")]
    ConnectionClosed,

    /// Bytes on the wire did not form a valid packet.
    #[error("corrupted packet: {0}")]
    CorruptedPacket(ProtocolError),

    /// A socket write failed.
    #[error("send failed on {transport:?} transport: {reason}")]
    TransportSendFailed { transport: Transport, reason: String },

    /// The server host name did not resolve to any address.
    #[error("could not resolve host {host}: {reason}")]
    HostUnresolved { host: String, reason: String },

    /// A packet buffer could not be allocated.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// The gameplay side of a pipe is gone.
    #[error("failed to write to pipe: {0}")]
    PipeWriteFailed(PipeError),

    /// The shared error cell was busy, so this error was not recorded.
    #[error("error cell busy; error not recorded")]
    SynchronizationUnavailable,

    /// The runtime that multiplexes the sockets could not be built.
    #[error("failed to allocate socket set: {0}")]
    SocketSetAllocationFailed(String),

    /// Sockets or worker threads could not be set up.
    #[error("router initialisation failed: {0}")]
    RouterInitFailed(String),
}

impl NetError {
    /// True when the worker that hit this error must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NetError::TransportReceiveFailed { .. }
                | NetError::ConnectionClosed
                | NetError::OutOfMemory(_)
                | NetError::PipeWriteFailed(_)
        )
    }
}

impl From<ProtocolError> for NetError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::OutOfMemory(_) => NetError::OutOfMemory(err.to_string()),
            other => NetError::CorruptedPacket(other),
        }
    }
}

impl From<PipeError> for NetError {
    fn from(err: PipeError) -> Self {
        NetError::PipeWriteFailed(err)
    }
}

// ── Service state ─────────────────────────────────────────────────────────────

/// Lifecycle of the receive worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceState {
    /// No sockets yet.
    Idle = 0,
    /// Waiting on both sockets and the signal channel.
    Polling = 1,
    /// One transport had data; its partner is being checked once without waiting.
    DrainingOne = 2,
    /// The worker has exited.  Terminal.
    Stopped = 3,
}

/// [`ServiceState`] shared between the worker and the router.
#[derive(Debug)]
pub struct ServiceStateCell(AtomicU8);

impl ServiceStateCell {
    pub fn new(state: ServiceState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> ServiceState {
        match self.0.load(Ordering::Acquire) {
            0 => ServiceState::Idle,
            1 => ServiceState::Polling,
            2 => ServiceState::DrainingOne,
            _ => ServiceState::Stopped,
        }
    }

    /// Moves to `state` unless the worker already stopped.
    pub fn set(&self, state: ServiceState) {
        let _ = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            (current != ServiceState::Stopped as u8).then_some(state as u8)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_memory_is_not_reported_as_corruption() {
        let err = NetError::from(ProtocolError::OutOfMemory(264));
        assert!(matches!(err, NetError::OutOfMemory(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_corruption_is_never_fatal() {
        let err = NetError::from(ProtocolError::InvalidType(0));
        assert_eq!(err, NetError::CorruptedPacket(ProtocolError::InvalidType(0)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_send_failures_do_not_stop_the_worker() {
        let err = NetError::TransportSendFailed {
            transport: Transport::Unreliable,
            reason: "boom".into(),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_stopped_state_is_terminal() {
        let cell = ServiceStateCell::new(ServiceState::Idle);
        cell.set(ServiceState::Polling);
        assert_eq!(cell.get(), ServiceState::Polling);
        cell.set(ServiceState::Stopped);
        cell.set(ServiceState::Polling);
        assert_eq!(cell.get(), ServiceState::Stopped);
    }
}
