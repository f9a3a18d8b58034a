//! # floorsync-core
//!
//! Shared protocol definitions for the floorsync game client and server.
//!
//! This crate has no sockets, no threads, and no OS dependencies.  It answers
//! three questions both ends of a connection must agree on:
//!
//! - **Which packets exist, and how big are they?**  [`protocol::types`] holds
//!   the closed packet catalogue, the fixed payload size table, and the
//!   reliable/unreliable classification of every type.
//!
//! - **How do bytes become packets?**  [`protocol::codec`] frames payloads for
//!   each transport and decodes them back, validating the type word before it
//!   is ever used as a table index.  [`protocol::messages`] gives every payload
//!   a typed struct so nothing downstream reinterprets raw bytes.
//!
//! - **How are received packets ordered?**  [`protocol::sequence`] separates
//!   locally assigned stream sequence numbers from sender-supplied datagram
//!   timestamps.

pub mod protocol;

pub use protocol::codec::{decode_type_and_payload, frame_for_transport, ProtocolError};
pub use protocol::messages::Message;
pub use protocol::sequence::Arrival;
pub use protocol::types::{PacketType, Transport};
