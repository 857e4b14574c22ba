//! [`SqliteJournal`] — the SQLite implementation of [`EventJournal`].

use std::path::Path;

use chrono::Utc;

use cadence_core::{
  AccountNumber,
  event::Event,
  journal::{EventJournal, JournalEntry},
};

use crate::{
  Error, Result,
  encode::{RawEntry, encode_dt},
  schema::SCHEMA,
};

/// An event journal backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteJournal {
  conn: tokio_rusqlite::Connection,
}

impl SqliteJournal {
  /// Open (or create) a journal at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let journal = Self { conn };
    journal.init_schema().await?;
    Ok(journal)
  }

  /// Open an in-memory journal — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let journal = Self { conn };
    journal.init_schema().await?;
    Ok(journal)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a query returning `(seq, payload, recorded_at)` rows and decode
  /// them into entries.
  async fn select_entries(
    &self,
    sql: &'static str,
    account_number: Option<AccountNumber>,
  ) -> Result<Vec<JournalEntry>> {
    let raws: Vec<RawEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = if let Some(n) = account_number {
          stmt
            .query_map(rusqlite::params![n as i64], |row| {
              Ok(RawEntry {
                seq:         row.get(0)?,
                payload:     row.get(1)?,
                recorded_at: row.get(2)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          stmt
            .query_map([], |row| {
              Ok(RawEntry {
                seq:         row.get(0)?,
                payload:     row.get(1)?,
                recorded_at: row.get(2)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntry::into_entry).collect()
  }
}

// ─── EventJournal impl ───────────────────────────────────────────────────────

impl EventJournal for SqliteJournal {
  type Error = Error;

  async fn append(&self, events: &[Event]) -> Result<()> {
    if events.is_empty() {
      return Ok(());
    }

    let recorded_at = encode_dt(Utc::now());
    let rows: Vec<(String, Option<i64>, String, String)> = events
      .iter()
      .map(|event| {
        Ok((
          event.discriminant().to_owned(),
          event.account_number().map(|n| n as i64),
          serde_json::to_string(event)?,
          recorded_at.clone(),
        ))
      })
      .collect::<Result<_>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (kind, account_number, payload, recorded_at) in &rows {
          tx.execute(
            "INSERT INTO events (kind, account_number, payload, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![kind, account_number, payload, recorded_at],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn entries(&self) -> Result<Vec<JournalEntry>> {
    self
      .select_entries(
        "SELECT seq, payload, recorded_at FROM events ORDER BY seq",
        None,
      )
      .await
  }

  async fn entries_for_account(
    &self,
    account_number: AccountNumber,
  ) -> Result<Vec<JournalEntry>> {
    self
      .select_entries(
        "SELECT seq, payload, recorded_at FROM events
         WHERE account_number = ?1 ORDER BY seq",
        Some(account_number),
      )
      .await
  }

  async fn count_by_kind(&self, kind: &str) -> Result<u64> {
    let kind = kind.to_owned();
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM events WHERE kind = ?1",
          rusqlite::params![kind],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }
}
