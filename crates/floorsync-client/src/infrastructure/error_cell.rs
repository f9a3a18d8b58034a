//! Shared "last network error" slot.
//!
//! Worker threads record failures here without ever blocking: if the cell is
//! busy they give up and report [`NetError::SynchronizationUnavailable`] to
//! their own log instead.  The single reader (the router, on behalf of the
//! gameplay thread) takes the value when it renders the final message.

use std::sync::{Mutex, TryLockError};

use tracing::warn;

use super::network::NetError;

/// Last recorded network error, shared between threads.
#[derive(Debug, Default)]
pub struct ErrorCell {
    slot: Mutex<Option<NetError>>,
}

impl ErrorCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `err`, replacing any earlier value.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::SynchronizationUnavailable`] when another thread
    /// holds the cell.  The error is not stored in that case.
    pub fn record(&self, err: NetError) -> Result<(), NetError> {
        match self.slot.try_lock() {
            Ok(mut slot) => {
                *slot = Some(err);
                Ok(())
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                warn!("error cell was poisoned; recovering");
                *poisoned.into_inner() = Some(err);
                Ok(())
            }
            Err(TryLockError::WouldBlock) => Err(NetError::SynchronizationUnavailable),
        }
    }

    /// Removes and returns the stored error.
    pub fn take(&self) -> Option<NetError> {
        match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// Returns a copy of the stored error, leaving it in place.
    pub fn peek(&self) -> Option<NetError> {
        match self.slot.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
