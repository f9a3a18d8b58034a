//! Infrastructure layer for the floorsync client.
//!
//! Contains the thread- and OS-facing adapters: pipes, the signal channel,
//! the shared error cell, TCP/UDP network I/O, configuration storage, and a
//! headless world implementation.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `floorsync_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`pipe`** – blocking byte pipes between the I/O workers and the
//!   gameplay thread.
//!
//! - **`signal`** – the "gameplay wants a batch" counter and wakeup.
//!
//! - **`error_cell`** – the single shared "last network error" slot.
//!
//! - **`network`** – the receive and send workers plus the router that owns
//!   them and implements `PacketSource` for the update system.
//!
//! - **`storage`** – TOML configuration file persistence.
//!
//! - **`world`** – `World` implementations.

pub mod error_cell;
pub mod network;
pub mod pipe;
pub mod signal;
pub mod storage;
pub mod world;
