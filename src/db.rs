//! SQLite pool setup and schema bootstrap.
//!
//! The schema ships inside the crate and is applied with
//! `CREATE TABLE IF NOT EXISTS`, so opening a database is idempotent.
//! Foreign keys are enforced on every pooled connection.
//!
//! Reference data (contacts, services, chains) is administrator-mutated and
//! low-frequency, so all writes go directly through the pool; message state
//! transitions serialize per-row via a compare-and-set on the current state
//! (see [`crate::relay::message::transition`]).

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

// ── SQL Schema ──────────────────────────────────────────────────

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS organizations (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    phone      TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id),
    email           TEXT NOT NULL UNIQUE,
    created_at      TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS servicechains (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS services (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    name           TEXT NOT NULL,
    directory_name TEXT NOT NULL,
    initialized    INTEGER NOT NULL DEFAULT 0
);

-- No UNIQUE on (servicechain_id, priority): duplicate priorities are a
-- data-integrity condition surfaced when ordering is requested, so the
-- schema must be able to hold them.
CREATE TABLE IF NOT EXISTS services_in_sc (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    servicechain_id INTEGER NOT NULL REFERENCES servicechains(id),
    service_id      INTEGER NOT NULL REFERENCES services(id),
    priority        INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_services_in_sc_chain ON services_in_sc(servicechain_id);

CREATE TABLE IF NOT EXISTS contacts (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name              TEXT NOT NULL,
    surname                 TEXT NOT NULL,
    email                   TEXT NOT NULL,
    phone                   TEXT NOT NULL,
    default_servicechain_id INTEGER REFERENCES servicechains(id),
    created_at              TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS blasts (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY,
    body            TEXT NOT NULL,
    servicechain_id INTEGER NOT NULL REFERENCES servicechains(id),
    contact_id      INTEGER NOT NULL REFERENCES contacts(id),
    blast_id        INTEGER REFERENCES blasts(id),
    is_reply_to     TEXT REFERENCES messages(id),
    direction       TEXT NOT NULL,
    state           TEXT NOT NULL,
    sent_time       TEXT,
    created_at      TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_messages_contact ON messages(contact_id);
CREATE INDEX IF NOT EXISTS idx_messages_blast ON messages(blast_id);
CREATE INDEX IF NOT EXISTS idx_messages_state ON messages(state);
"#;

// ── Pool helpers ────────────────────────────────────────────────

/// Open (creating if missing) a file-backed relay database and apply the schema.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the pool cannot connect or the schema fails to apply.
pub async fn connect(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    let opts = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(opts).await?;
    bootstrap(&pool).await?;
    Ok(pool)
}

/// Open an in-memory relay database and apply the schema.
///
/// The pool is pinned to a single connection; each SQLite `:memory:`
/// connection is otherwise its own separate database.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the pool cannot connect or the schema fails to apply.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let opts = SqliteConnectOptions::new()
        .filename(":memory:")
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await?;
    bootstrap(&pool).await?;
    Ok(pool)
}

/// Apply the schema to an already-open pool.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if any statement fails.
pub async fn bootstrap(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
