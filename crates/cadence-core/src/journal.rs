//! The `EventJournal` trait and its entry type.
//!
//! A journal is the durable, finalized log an off-chain node or indexer
//! scans. Registries only hand a journal events that survived their
//! operation's revert window, so a journal never contains a rolled-back
//! event. Implemented by `cadence-journal-sqlite`.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountNumber, event::Event};

/// A persisted event plus its journal metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
  /// Journal-assigned sequence number, strictly increasing.
  pub seq:         u64,
  pub recorded_at: DateTime<Utc>,
  pub event:       Event,
}

/// Abstraction over an append-only store of committed registry events.
pub trait EventJournal: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `events` in order, atomically.
  fn append<'a>(
    &'a self,
    events: &'a [Event],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Every entry, in sequence order.
  fn entries(
    &self,
  ) -> impl Future<Output = Result<Vec<JournalEntry>, Self::Error>> + Send + '_;

  /// Entries whose event concerns `account_number`.
  fn entries_for_account(
    &self,
    account_number: AccountNumber,
  ) -> impl Future<Output = Result<Vec<JournalEntry>, Self::Error>> + Send + '_;

  /// How many entries carry the given `kind` discriminant.
  fn count_by_kind<'a>(
    &'a self,
    kind: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;
}
