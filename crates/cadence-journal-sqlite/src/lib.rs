//! SQLite backend for the Cadence event journal.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Only committed registry events are
//! ever appended here; the in-memory `EventLog` owns the revert window, so a
//! journal row is proof the operation it records fully completed.

mod encode;
mod journal;
mod schema;

pub mod error;

pub use error::{Error, Result};
pub use journal::SqliteJournal;

#[cfg(test)]
mod tests;
