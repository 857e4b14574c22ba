//! SQL schema for the Cadence event journal.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- The journal is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS events (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    kind           TEXT NOT NULL,    -- discriminant of the Event variant
    account_number INTEGER,          -- NULL for events that carry none
    payload        TEXT NOT NULL,    -- full JSON-encoded Event
    recorded_at    TEXT NOT NULL     -- ISO 8601 UTC; journal-assigned
);

CREATE INDEX IF NOT EXISTS events_kind_idx    ON events(kind);
CREATE INDEX IF NOT EXISTS events_account_idx ON events(account_number);

PRAGMA user_version = 1;
";
