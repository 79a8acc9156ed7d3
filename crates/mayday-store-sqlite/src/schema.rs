//! SQL schema for the Mayday SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per user; the contact pair is replaced wholesale on every save.
CREATE TABLE IF NOT EXISTS emergency_contacts (
    user_id       TEXT PRIMARY KEY,
    contacts_json TEXT NOT NULL,   -- JSON array of exactly two contacts
    updated_at    TEXT NOT NULL    -- ISO 8601 UTC
);

-- One row per SOS trigger. The two delivery records are embedded in
-- deliveries_json; they have no identity outside their owning event.
CREATE TABLE IF NOT EXISTS alert_events (
    alert_id        TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    latitude        REAL NOT NULL,
    longitude       REAL NOT NULL,
    address         TEXT,
    map_link        TEXT NOT NULL,
    triggered_at    TEXT NOT NULL,  -- ISO 8601 UTC; server-assigned
    resolved_at     TEXT,
    resolved_by     TEXT,
    status          TEXT NOT NULL,  -- 'SENT' | 'PARTIAL_FAILED' | 'FAILED' | 'RESOLVED'
    deliveries_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS alert_events_user_idx      ON alert_events(user_id);
CREATE INDEX IF NOT EXISTS alert_events_status_idx    ON alert_events(status);
CREATE INDEX IF NOT EXISTS alert_events_triggered_idx ON alert_events(triggered_at);

PRAGMA user_version = 1;
";
