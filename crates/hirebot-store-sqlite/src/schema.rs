//! SQL schema for the hirebot SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS companies (
    company_id    TEXT PRIMARY KEY,
    company_name  TEXT NOT NULL UNIQUE,
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL
);

-- Only the SHA-256 digest of a key is stored.
CREATE TABLE IF NOT EXISTS api_keys (
    key_id      TEXT PRIMARY KEY,
    company_id  TEXT NOT NULL REFERENCES companies(company_id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    prefix      TEXT NOT NULL,
    key_hash    TEXT NOT NULL UNIQUE,
    revoked     INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS staff_users (
    user_id        TEXT PRIMARY KEY,
    company_id     TEXT NOT NULL REFERENCES companies(company_id) ON DELETE CASCADE,
    email          TEXT NOT NULL UNIQUE,
    name           TEXT NOT NULL,
    password_hash  TEXT NOT NULL,
    is_active      INTEGER NOT NULL DEFAULT 1,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS resources (
    resource_id  TEXT PRIMARY KEY,
    company_id   TEXT NOT NULL REFERENCES companies(company_id) ON DELETE CASCADE,
    kind         TEXT NOT NULL,   -- Kind segment, e.g. 'job'
    active       INTEGER,         -- NULL for kinds without a publish flag
    body_json    TEXT NOT NULL,   -- JSON payload (inner value only)
    created_by   TEXT REFERENCES staff_users(user_id) ON DELETE SET NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

-- Events are strictly append-only.
-- No UPDATE is ever issued against this table; rows leave only by cascade.
CREATE TABLE IF NOT EXISTS events (
    event_id         TEXT PRIMARY KEY,
    company_id       TEXT NOT NULL REFERENCES companies(company_id) ON DELETE CASCADE,
    kind             TEXT NOT NULL,
    chatbot_user_id  TEXT NOT NULL,
    date_time        TEXT NOT NULL,
    body_json        TEXT NOT NULL,
    recorded_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS api_keys_company_idx  ON api_keys(company_id);
CREATE INDEX IF NOT EXISTS resources_tenant_idx  ON resources(company_id, kind);
CREATE INDEX IF NOT EXISTS events_tenant_idx     ON events(company_id, kind);

PRAGMA user_version = 1;
";
