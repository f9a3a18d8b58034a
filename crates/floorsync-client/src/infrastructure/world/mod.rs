//! World adapters.
//!
//! - **`memory`** – a headless entity store used by the binary and by tests.

pub mod memory;
