//! SQL schema for the Curb SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS reports (
    report_id               TEXT PRIMARY KEY,
    tracking_id             TEXT NOT NULL UNIQUE,
    category                TEXT NOT NULL,   -- closed set, see curb_core::report::Category
    state                   TEXT NOT NULL,
    lga                     TEXT NOT NULL,
    address                 TEXT NOT NULL,
    description             TEXT,
    images                  TEXT NOT NULL DEFAULT '[]',  -- JSON array of opaque URIs
    contact_name            TEXT NOT NULL,   -- reporter snapshot, frozen at creation
    contact_phone           TEXT,
    contact_email           TEXT,
    priority                TEXT NOT NULL DEFAULT 'LOW',
    status                  TEXT NOT NULL DEFAULT 'PENDING',
    created_by              TEXT NOT NULL,
    assigned_to             TEXT,            -- staff actor, set at most once
    notification_preference TEXT NOT NULL DEFAULT 'EMAIL',
    created_at              TEXT NOT NULL,   -- ISO 8601 UTC; store-assigned
    updated_at              TEXT NOT NULL    -- bumped on every mutation
);

-- Accounts are owned by the external identity system; this table carries
-- the read-only slice the lifecycle needs.
CREATE TABLE IF NOT EXISTS actors (
    actor_id                TEXT PRIMARY KEY,
    name                    TEXT NOT NULL,
    email                   TEXT UNIQUE,
    phone                   TEXT,
    capability              TEXT NOT NULL,   -- 'resident' | 'staff' | 'admin'
    notification_preference TEXT             -- NULL falls back to EMAIL
);

CREATE INDEX IF NOT EXISTS reports_created_by_idx  ON reports(created_by);
CREATE INDEX IF NOT EXISTS reports_assigned_to_idx ON reports(assigned_to);
CREATE INDEX IF NOT EXISTS reports_status_idx      ON reports(status);
CREATE INDEX IF NOT EXISTS reports_created_at_idx  ON reports(created_at);

PRAGMA user_version = 1;
";
