//! Storage layer for the Tally live counter.
//!
//! The service tracks exactly one signed integer. This crate owns every way
//! of persisting it and exposes them through one facade, [`CounterStore`],
//! with three operations: `read`, `apply_delta` and `reset`.
//!
//! # Atomicity
//!
//! Each backend performs a write as a single indivisible step against its
//! medium and returns the committed [`StateChange`]:
//!
//! ```text
//! apply_delta(d)
//!     |
//!     +-- memory    --> mutex-guarded add
//!     +-- file      --> mutex-guarded add + temp-file/rename
//!     +-- dragonfly --> MULTI { HINCRBY value d; HINCRBY revision 1 }
//!     +-- postgres  --> UPDATE ... SET value = value + d ... RETURNING
//! ```
//!
//! No backend reads the value to the client and writes it back, so
//! concurrent increments are never lost.
//!
//! # Modules
//!
//! - [`change`] -- the committed `(value, revision)` pair
//! - [`store`] -- the [`CounterStore`] dispatch enum
//! - [`memory`] -- in-process backend
//! - [`file`] -- JSON file backend
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) backend
//! - [`postgres`] -- `PostgreSQL` backend
//! - [`error`] -- Shared error types

pub mod change;
pub mod dragonfly;
pub mod error;
pub mod file;
pub mod memory;
pub mod postgres;
pub mod store;

// Re-export primary types for convenience.
pub use change::StateChange;
pub use dragonfly::DragonflyStore;
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use postgres::{CounterRow, PostgresConfig, PostgresStore};
pub use store::CounterStore;
