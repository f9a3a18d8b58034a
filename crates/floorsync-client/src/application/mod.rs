//! Application layer for the floorsync client.
//!
//! # What lives here?
//!
//! - **`world`** – the [`world::World`] trait the update system drives, plus
//!   the small value types it speaks in (entity handles, roles, appearances,
//!   facing).  The entity system that implements it is plugged in from the
//!   infrastructure layer.
//!
//! - **`sync_table`** – fixed-size tables mapping server ids to local entity
//!   handles, with the bookkeeping that keeps each id bound to at most one
//!   live entity.
//!
//! - **`session`** – the per-connection state owned by the gameplay thread.
//!
//! - **`update`** – the Client Update System: pulls one batch per tick from a
//!   [`update::PacketSource`] and reconciles it into the world.
//!
//! **Dependency rule**: nothing in this layer imports `infrastructure`.

pub mod session;
pub mod sync_table;
pub mod update;
pub mod world;
