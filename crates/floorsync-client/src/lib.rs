//! floorsync-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does floorsync-client do? (for beginners)
//!
//! The game server is authoritative: it decides who is on which team, where
//! every other player stands, and which objectives have been tagged.  This
//! crate is the client side of that conversation.
//!
//! 1. The **router** connects one TCP stream (session, status, chat,
//!    objectives) and one UDP socket (positions, floor moves, tags) to the
//!    server and runs a receive worker and a send worker on their own threads.
//! 2. The receive worker decodes packets from both sockets and holds them
//!    until the gameplay thread asks for a batch.
//! 3. Once per tick the gameplay thread calls
//!    `ClientUpdateSystem::pull_and_apply`, which reads that batch off a pipe
//!    and reconciles it into the local world through two synchronization
//!    tables (server player id → entity, objective id → entity).
//! 4. Outbound requests (position reports, floor moves, lobby choices) go
//!    the other way through a second pipe to the send worker.

/// Application layer: update system, sync tables, and the world abstraction.
pub mod application;

/// Infrastructure layer: pipes, network workers, config, and world adapters.
pub mod infrastructure;
