//! Core types and registry logic for Cadence.
//!
//! This crate models, in-process, the externally-documented behavior of two
//! on-chain registries: recurring payments (subscription lifecycle, grace
//! windows, charge execution) and the automation layer (fee-gated
//! registration and a capability-delegated execution handshake). It is
//! deliberately free of HTTP and database dependencies; those live in the
//! `cadence-journal-sqlite` and `cadence-api` crates.

pub mod automation;
pub mod clock;
pub mod error;
pub mod event;
pub mod identity;
pub mod journal;
pub mod ledger;
pub mod subscription;

pub use error::{Error, Result};

/// Registry-assigned record key. Allocated monotonically from 1 and never
/// reused, not even after cancellation.
pub type AccountNumber = u64;

/// Absolute unix timestamp, in seconds.
pub type Timestamp = u64;
