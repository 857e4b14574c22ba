//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; events as compact JSON of the
//! full tagged [`Event`](cadence_core::event::Event) value.

use cadence_core::journal::JournalEntry;
use chrono::{DateTime, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `events` row.
pub struct RawEntry {
  pub seq:         i64,
  pub payload:     String,
  pub recorded_at: String,
}

impl RawEntry {
  pub fn into_entry(self) -> Result<JournalEntry> {
    Ok(JournalEntry {
      seq:         self.seq as u64,
      recorded_at: decode_dt(&self.recorded_at)?,
      event:       serde_json::from_str(&self.payload)?,
    })
  }
}
