//! SQLite backend for the Mayday stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. The single serialized
//! connection doubles as the per-event write lock: every read-modify-write
//! of an alert row executes inside one closure on that thread, so two
//! concurrent delivery outcomes for the same event can never aggregate
//! from a stale record pair.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
